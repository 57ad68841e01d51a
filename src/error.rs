use thiserror::Error;

/// Rejected waveform parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// A thread panicked while holding the queue lock.
    #[error("Playback queue lock poisoned")]
    Poisoned,

    /// A drain returned an odd number of bytes, splitting a sample.
    #[error("Playback queue misaligned: {0} bytes drained")]
    Misaligned(usize),
}

/// Fault latched by the realtime side of a stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamFault {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Backend stream error: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    /// No output device could be opened.
    #[error("Audio device not available: {0}")]
    DeviceUnavailable(String),

    #[error("Audio sink already closed")]
    AlreadyClosed,

    #[error("Tone sampled at {tone} Hz cannot play on a {sink} Hz sink")]
    ToneRateMismatch { tone: u32, sink: u32 },

    #[error("Audio stream faulted: {0}")]
    StreamFault(StreamFault),

    #[error("Failed to stop audio stream: {0}")]
    Stop(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
