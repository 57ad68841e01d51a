use std::time::Duration;
use crate::config::*;

// ============================================
//              Sink / Tone Settings
// ============================================
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    sample_rate: u32,
    block_size: u32,
    channels: u16,
    queue_seconds: f64,
    frequency: f64,
    duration: f64,
    amplitude: f64,
}

impl Settings {
    pub fn get_default_settings() -> Self {
        Settings {
            sample_rate: SAMPLE_RATE,
            block_size: BLOCK_SIZE,
            channels: CHANNELS,
            queue_seconds: QUEUE_SECONDS,
            frequency: FREQUENCY,
            duration: DURATION,
            amplitude: AMPLITUDE,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_queue_seconds(mut self, queue_seconds: f64) -> Self {
        self.queue_seconds = queue_seconds;
        self
    }

    pub fn with_tone(mut self, frequency: f64, duration: f64, amplitude: f64) -> Self {
        self.frequency = frequency;
        self.duration = duration;
        self.amplitude = amplitude;
        self
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn get_buffer_size(&self) -> u32 {
        self.block_size
    }

    pub fn get_channels(&self) -> u16 {
        self.channels
    }

    pub fn get_frequency(&self) -> f64 {
        self.frequency
    }

    pub fn get_duration(&self) -> f64 {
        self.duration
    }

    pub fn get_amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Capacity of the playback queue in bytes, always a whole number of
    /// 16-bit samples and never smaller than one sample.
    pub fn get_queue_capacity(&self) -> usize {
        let samples = (self.sample_rate as f64 * self.queue_seconds).round();
        let samples = if samples.is_finite() && samples >= 1.0 { samples as usize } else { 1 };
        samples * 2
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::get_default_settings()
    }
}

// ============================================
//              Round Settings
// ============================================
// Values are clamped into their ranges the way the sliders bounded them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSettings {
    tenths_per_number: u32,
    digits: u32,
    count: usize,
}

impl RoundSettings {
    pub fn new(tenths_per_number: u32, digits: u32, count: usize) -> Self {
        RoundSettings {
            tenths_per_number: tenths_per_number.clamp(MIN_TENTHS_PER_NUMBER, MAX_TENTHS_PER_NUMBER),
            digits: digits.clamp(MIN_DIGITS_PER_NUMBER, MAX_DIGITS_PER_NUMBER),
            count: count.clamp(MIN_NUMBERS_PER_ROUND, MAX_NUMBERS_PER_ROUND),
        }
    }

    /// Builds settings from seconds, rounded to the nearest tenth.
    pub fn from_seconds(seconds_per_number: f64, digits: u32, count: usize) -> Self {
        let tenths = (seconds_per_number * 10.0).round();
        let tenths = if tenths.is_nan() || tenths < 0.0 {
            0
        } else if tenths > u32::MAX as f64 {
            u32::MAX
        } else {
            tenths as u32
        };
        Self::new(tenths, digits, count)
    }

    pub fn get_seconds_per_number(&self) -> f64 {
        self.tenths_per_number as f64 / 10.0
    }

    pub fn get_interval(&self) -> Duration {
        Duration::from_millis(self.tenths_per_number as u64 * 100)
    }

    pub fn get_digits(&self) -> u32 {
        self.digits
    }

    pub fn get_count(&self) -> usize {
        self.count
    }

    /// Applies a between-rounds command: `s <seconds>`, `d <digits>` or
    /// `c <count>`. Values are clamped like any other input. Returns
    /// `None` when `command` is not a settings command.
    pub fn with_command(&self, command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let key = parts.next()?;
        let value = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        match key {
            "s" => {
                let seconds: f64 = value.parse().ok()?;
                Some(Self::from_seconds(seconds, self.digits, self.count))
            }
            "d" => Some(Self::new(self.tenths_per_number, value.parse().ok()?, self.count)),
            "c" => Some(Self::new(self.tenths_per_number, self.digits, value.parse().ok()?)),
            _ => None,
        }
    }
}

impl Default for RoundSettings {
    fn default() -> Self {
        RoundSettings::new(TENTHS_PER_NUMBER, DIGITS_PER_NUMBER, NUMBERS_PER_ROUND)
    }
}
