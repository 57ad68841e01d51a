// Output stream
pub const SAMPLE_RATE: u32 = 9680;
pub const BLOCK_SIZE: u32 = 64;
pub const CHANNELS: u16 = 1;
// Seconds of audio the playback queue may hold before tones are dropped
pub const QUEUE_SECONDS: f64 = 1.0;
//BEEP TONE
pub const FREQUENCY: f64 = 440.0;
pub const DURATION: f64 = 0.05;
pub const AMPLITUDE: f64 = 0.3;
//ROUND
pub const TENTHS_PER_NUMBER: u32 = 50;
pub const MIN_TENTHS_PER_NUMBER: u32 = 1;
pub const MAX_TENTHS_PER_NUMBER: u32 = 100;
pub const DIGITS_PER_NUMBER: u32 = 1;
pub const MIN_DIGITS_PER_NUMBER: u32 = 1;
pub const MAX_DIGITS_PER_NUMBER: u32 = 10;
pub const NUMBERS_PER_ROUND: usize = 10;
pub const MIN_NUMBERS_PER_ROUND: usize = 2;
pub const MAX_NUMBERS_PER_ROUND: usize = 50;
pub const COUNTDOWN_STEPS: u32 = 3;
pub const COUNTDOWN_STEP_MS: u64 = 1000;
pub const STOP_POLL_MS: u64 = 10;
