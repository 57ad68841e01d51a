use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use log::{debug, info, warn, error};
use crate::audio::CpalBackend;
use crate::error::{SinkError, StreamFault};
use crate::queue::{BlockFiller, Enqueued, FaultLatch, PlaybackQueue, QueueStats};
use crate::settings::Settings;
use crate::tone::Tone;

// ============================================
//              Backend Seam
// ============================================

/// A started output stream.
pub trait RunningStream {
    /// Stops the driver callback. When this returns the filler is no
    /// longer running on any thread.
    fn stop(&mut self) -> Result<(), SinkError>;
}

/// Something that can start an output stream driven by a [`BlockFiller`].
pub trait AudioBackend {
    fn open_stream(
        &self,
        settings: &Settings,
        filler: BlockFiller,
    ) -> Result<Box<dyn RunningStream>, SinkError>;
}

// ============================================
//              Sink Handle
// ============================================
// Producer side of the sink; cheap to clone and safe to send to other threads.
#[derive(Clone)]
pub struct SinkHandle {
    queue: Arc<PlaybackQueue>,
    closed: Arc<AtomicBool>,
    sample_rate: u32,
}

impl SinkHandle {
    /// Queues one full copy of `tone` and returns without waiting on the
    /// audio callback.
    pub fn play_once(&self, tone: &Tone) -> Result<Enqueued, SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::AlreadyClosed);
        }
        if tone.sample_rate() != self.sample_rate {
            return Err(SinkError::ToneRateMismatch {
                tone: tone.sample_rate(),
                sink: self.sample_rate,
            });
        }
        let outcome = self.queue.append(tone.as_bytes())?;
        if outcome == Enqueued::Dropped {
            warn!("SINK: Playback queue full, dropped a {} byte tone", tone.len_bytes());
        }
        Ok(outcome)
    }
}

// ============================================
//              Audio Sink
// ============================================
pub struct AudioSink {
    handle: SinkHandle,
    fault: FaultLatch,
    stream: Option<Box<dyn RunningStream>>,
}

impl AudioSink {
    /// Opens the default output device.
    pub fn open(settings: &Settings) -> Result<Self, SinkError> {
        Self::open_with(&CpalBackend, settings)
    }

    pub fn open_with(backend: &dyn AudioBackend, settings: &Settings) -> Result<Self, SinkError> {
        let sample_rate = settings.get_sample_rate();
        let block_size = settings.get_buffer_size();
        if sample_rate == 0 || block_size == 0 {
            return Err(SinkError::DeviceUnavailable(format!(
                "invalid stream config: {} Hz, {} frames", sample_rate, block_size)));
        }

        let queue = Arc::new(PlaybackQueue::new(settings.get_queue_capacity()));
        let fault = FaultLatch::new();
        let filler = BlockFiller::new(Arc::clone(&queue), block_size as usize, fault.clone());
        debug!("SINK: Queue capacity {} bytes", settings.get_queue_capacity());

        let stream = backend.open_stream(settings, filler)?;
        info!("SINK: Output stream running at {} Hz, {} frames per block", sample_rate, block_size);

        Ok(AudioSink {
            handle: SinkHandle {
                queue,
                closed: Arc::new(AtomicBool::new(false)),
                sample_rate,
            },
            fault,
            stream: Some(stream),
        })
    }

    pub fn play_once(&self, tone: &Tone) -> Result<Enqueued, SinkError> {
        self.handle.play_once(tone)
    }

    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.handle.sample_rate
    }

    /// Bytes the playback queue can hold.
    pub fn queue_capacity(&self) -> Result<usize, SinkError> {
        Ok(self.handle.queue.capacity()?)
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stats(&self) -> Result<QueueStats, SinkError> {
        Ok(self.handle.queue.stats()?)
    }

    /// Fault latched by the realtime side, if any.
    pub fn fault(&self) -> Option<StreamFault> {
        self.fault.get()
    }

    /// Stops the stream, then releases it. A realtime fault recorded while
    /// the stream ran is reported here.
    pub fn close(&mut self) -> Result<(), SinkError> {
        let mut stream = self.stream.take().ok_or(SinkError::AlreadyClosed)?;
        self.handle.closed.store(true, Ordering::Release);

        let stopped = stream.stop();
        drop(stream);
        info!("SINK: Output stream closed");

        if let Some(fault) = self.fault.get() {
            error!("SINK: Stream had faulted: {}", fault);
            return Err(SinkError::StreamFault(fault));
        }
        stopped
    }
}

impl Drop for AudioSink {
    fn drop(&mut self) {
        if self.stream.is_some() {
            if let Err(err) = self.close() {
                warn!("SINK: Error while closing on drop: {}", err);
            }
        }
    }
}
