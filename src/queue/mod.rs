use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
#[cfg(test)]
use std::sync::MutexGuard;
use byteorder::{ByteOrder, LittleEndian};
use cpal::{FromSample, Sample};
use ringbuf::{
    traits::{Consumer, Observer, Producer},
    HeapRb,
};
use crate::error::{QueueError, StreamFault};

// ============================================
//              Playback Queue
// Bytes not yet delivered to the output device.
// One lock guards append and drain; neither side
// allocates or does I/O while holding it.
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// Not enough room for the whole buffer; nothing was appended.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub appended: u64,
    pub drained: u64,
    pub dropped: u64,
    pub pending: u64,
}

pub struct PlaybackQueue {
    ring: Mutex<HeapRb<u8>>,
    appended: AtomicU64,
    drained: AtomicU64,
    dropped: AtomicU64,
}

impl PlaybackQueue {
    pub fn new(capacity: usize) -> Self {
        PlaybackQueue {
            ring: Mutex::new(HeapRb::<u8>::new(capacity.max(2))),
            appended: AtomicU64::new(0),
            drained: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> Result<usize, QueueError> {
        let ring = self.ring.lock().map_err(|_| QueueError::Poisoned)?;
        Ok(ring.capacity().get())
    }

    pub fn len(&self) -> Result<usize, QueueError> {
        let ring = self.ring.lock().map_err(|_| QueueError::Poisoned)?;
        Ok(ring.occupied_len())
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len()? == 0)
    }

    /// Appends all of `bytes` or none of it.
    pub fn append(&self, bytes: &[u8]) -> Result<Enqueued, QueueError> {
        let mut ring = self.ring.lock().map_err(|_| QueueError::Poisoned)?;
        if ring.vacant_len() < bytes.len() {
            self.dropped.fetch_add(bytes.len() as u64, Ordering::Relaxed);
            return Ok(Enqueued::Dropped);
        }
        let pushed = ring.push_slice(bytes);
        self.appended.fetch_add(pushed as u64, Ordering::Relaxed);
        Ok(Enqueued::Queued)
    }

    /// Moves up to `out.len()` bytes from the front of the queue into `out`
    /// and zero-fills the rest. Returns the number of queued bytes copied.
    pub fn drain_into(&self, out: &mut [u8]) -> Result<usize, QueueError> {
        let copied = {
            let mut ring = self.ring.lock().map_err(|_| QueueError::Poisoned)?;
            let copied = ring.pop_slice(out);
            self.drained.fetch_add(copied as u64, Ordering::Relaxed);
            copied
        };
        out[copied..].fill(0);
        if copied % 2 != 0 {
            return Err(QueueError::Misaligned(copied));
        }
        Ok(copied)
    }

    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        let ring = self.ring.lock().map_err(|_| QueueError::Poisoned)?;
        Ok(QueueStats {
            appended: self.appended.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pending: ring.occupied_len() as u64,
        })
    }

    /// Holds the ring lock the way a driver callback does mid-drain.
    #[cfg(test)]
    pub(crate) fn lock_ring(&self) -> MutexGuard<'_, HeapRb<u8>> {
        match self.ring.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ============================================
//                Fault Latch
// ============================================
// Holds the first fault seen by the realtime side until the owner asks.
#[derive(Clone, Default)]
pub struct FaultLatch {
    slot: Arc<OnceLock<StreamFault>>,
}

impl FaultLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when this call recorded the fault.
    pub fn record(&self, fault: StreamFault) -> bool {
        self.slot.set(fault).is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn get(&self) -> Option<StreamFault> {
        self.slot.get().cloned()
    }
}

// ============================================
//                Block Filler
// Realtime side of the queue. The driver calls
// it with the number of frames it wants.
// ============================================
pub struct BlockFiller {
    queue: Arc<PlaybackQueue>,
    scratch: Vec<u8>,
    fault: FaultLatch,
}

impl BlockFiller {
    pub fn new(queue: Arc<PlaybackQueue>, block_size: usize, fault: FaultLatch) -> Self {
        BlockFiller {
            queue,
            scratch: vec![0; block_size * 2],
            fault,
        }
    }

    pub fn fault_latch(&self) -> FaultLatch {
        self.fault.clone()
    }

    /// Fills one block of `requested_frames` mono 16-bit frames. Queued
    /// bytes come first, silence pads the rest. Once a fault is latched
    /// the filler stops consuming and only produces silence.
    pub fn fill_block(&mut self, requested_frames: usize) -> &[u8] {
        let needed = requested_frames * 2;
        // Only grows when the driver asks for more than the configured block.
        if self.scratch.len() < needed {
            self.scratch.resize(needed, 0);
        }
        let block = &mut self.scratch[..needed];

        if self.fault.is_set() {
            block.fill(0);
        } else if let Err(err) = self.queue.drain_into(block) {
            block.fill(0);
            self.fault.record(StreamFault::Queue(err));
        }
        &self.scratch[..needed]
    }

    /// Fills an interleaved device buffer, copying each mono sample into
    /// every channel of its frame.
    pub fn fill_samples<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: Sample + FromSample<i16>,
    {
        let channels = channels.max(1);
        let frames = data.len() / channels;
        let (whole, partial) = data.split_at_mut(frames * channels);
        for sample in partial.iter_mut() {
            *sample = T::EQUILIBRIUM;
        }

        let bytes = self.fill_block(frames);
        for (frame, pair) in whole.chunks_exact_mut(channels).zip(bytes.chunks_exact(2)) {
            let value = <T as FromSample<i16>>::from_sample_(LittleEndian::read_i16(pair));
            for sample in frame.iter_mut() {
                *sample = value;
            }
        }
    }
}
