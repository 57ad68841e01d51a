use std::sync::Arc;
use std::time::Duration;
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use crate::error::SynthError;
use crate::settings::Settings;

// ============================================
//                    Tone
// ============================================
// Mono 16-bit little-endian PCM. Clones share the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tone {
    bytes: Arc<[u8]>,
    sample_rate: u32,
}

impl Tone {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn sample_count(&self) -> usize {
        self.bytes.len() / 2
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.sample_count() as f64 / self.sample_rate as f64)
    }

    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.bytes.chunks_exact(2).map(LittleEndian::read_i16)
    }
}

// ============================================
//            Triangle Wave Synthesis
// ============================================
pub fn synthesize(
    frequency: f64,
    duration: f64,
    sample_rate: u32,
    amplitude: f64,
    ) -> Result<Tone, SynthError> {

    if sample_rate == 0 {
        return Err(SynthError::InvalidArgument("sample rate must be positive".into()));
    }
    if !(duration.is_finite() && duration > 0.0) {
        return Err(SynthError::InvalidArgument(format!("duration must be positive, got {duration}")));
    }
    if !(amplitude.is_finite() && amplitude > 0.0 && amplitude <= 1.0) {
        return Err(SynthError::InvalidArgument(format!("amplitude must be in (0, 1], got {amplitude}")));
    }
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(SynthError::InvalidArgument(format!("frequency must be positive, got {frequency}")));
    }

    let n = (sample_rate as f64 * duration).round();
    if !(n >= 1.0 && n <= (usize::MAX / 2) as f64) {
        return Err(SynthError::InvalidArgument(format!(
            "{duration} s at {sample_rate} Hz does not yield a playable sample count")));
    }
    let n = n as usize;

    let samples: Vec<i16> = (0..n)
        .map(|i| {
            let x = i as f64 / n as f64 * duration;
            let phase = (x * frequency).rem_euclid(1.0);
            let value = (amplitude * (2.0 * (2.0 * phase - 1.0).abs() - 1.0))
                .clamp(-amplitude, amplitude);
            (value * i16::MAX as f64).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect();

    let mut bytes = vec![0u8; n * 2];
    LittleEndian::write_i16_into(&samples, &mut bytes);
    debug!("TONE: Synthesized {} Hz triangle, {} samples at {} Hz", frequency, n, sample_rate);

    Ok(Tone {
        bytes: bytes.into(),
        sample_rate,
    })
}

/// The beep tone described by `settings`, at the settings' sample rate.
pub fn beep_from_settings(settings: &Settings) -> Result<Tone, SynthError> {
    synthesize(
        settings.get_frequency(),
        settings.get_duration(),
        settings.get_sample_rate(),
        settings.get_amplitude(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_is_deterministic() {
        let a = synthesize(440.0, 0.05, 9680, 0.3).unwrap();
        let b = synthesize(440.0, 0.05, 9680, 0.3).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn trainer_tone_is_968_bytes() {
        let tone = synthesize(440.0, 0.05, 9680, 0.3).unwrap();
        assert_eq!(tone.len_bytes(), 968);
        assert_eq!(tone.sample_count(), 484);
        assert_eq!(tone.duration(), Duration::from_millis(50));
    }

    #[test]
    fn samples_stay_within_quantized_amplitude() {
        for amplitude in [0.05, 0.3, 0.77, 1.0] {
            let tone = synthesize(523.25, 0.1, 44_100, amplitude).unwrap();
            let bound = (amplitude * 32767.0).round() as i16;
            assert!(tone.samples().all(|s| (-bound..=bound).contains(&s)), "amplitude {amplitude}");
        }
    }

    #[test]
    fn triangle_starts_at_peak_and_reaches_trough_mid_period() {
        // 440 Hz at 9680 Hz is exactly 22 samples per period.
        let tone = synthesize(440.0, 0.05, 9680, 0.3).unwrap();
        let samples: Vec<i16> = tone.samples().collect();
        assert_eq!(samples[0], 9830);
        assert_eq!(samples[11], -9830);
        assert_eq!(samples[22], 9830);
        assert!(samples[0] > samples[5] && samples[5] > samples[10]);
    }

    #[test]
    fn bytes_are_little_endian() {
        let tone = synthesize(440.0, 0.05, 9680, 0.3).unwrap();
        // 9830 == 0x2666
        assert_eq!(&tone.as_bytes()[..2], &[0x66, 0x26]);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let cases = [
            (440.0, 0.05, 0, 0.3),
            (440.0, 0.0, 9680, 0.3),
            (440.0, -1.0, 9680, 0.3),
            (440.0, 0.05, 9680, 0.0),
            (440.0, 0.05, 9680, 1.5),
            (0.0, 0.05, 9680, 0.3),
            (f64::NAN, 0.05, 9680, 0.3),
            (440.0, 0.00001, 9680, 0.3),
        ];
        for (frequency, duration, sample_rate, amplitude) in cases {
            let result = synthesize(frequency, duration, sample_rate, amplitude);
            assert!(matches!(result, Err(SynthError::InvalidArgument(_))),
                "{frequency} {duration} {sample_rate} {amplitude}");
        }
    }

    #[test]
    fn beep_follows_settings() {
        let settings = Settings::get_default_settings().with_sample_rate(48_000);
        let tone = beep_from_settings(&settings).unwrap();
        assert_eq!(tone.sample_rate(), 48_000);
        assert_eq!(tone.sample_count(), 2400);
    }
}
