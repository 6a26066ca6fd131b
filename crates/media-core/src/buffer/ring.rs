//! Circular Audio Buffer
//!
//! A fixed-capacity sample FIFO that never blocks or rejects a writer. When
//! full, each write evicts the oldest samples and counts them as dropped, so
//! a stalled consumer costs latency-bounded audio loss instead of memory.

use crate::error::{Error, Result};
use parking_lot::Mutex;

#[derive(Debug)]
struct RingState {
    samples: Box<[i16]>,
    read_pos: usize,
    write_pos: usize,
    len: usize,
    dropped: u64,
}

/// Lossy sample ring buffer shared between the receive thread and readers
#[derive(Debug)]
pub struct AudioRingBuffer {
    state: Mutex<RingState>,
    capacity: usize,
}

impl AudioRingBuffer {
    /// Create a buffer holding up to `capacity` samples
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig("ring buffer capacity must be non-zero".into()));
        }
        Ok(Self {
            state: Mutex::new(RingState {
                samples: vec![0i16; capacity].into_boxed_slice(),
                read_pos: 0,
                write_pos: 0,
                len: 0,
                dropped: 0,
            }),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples currently buffered
    pub fn len(&self) -> usize {
        self.state.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total samples evicted since creation or the last [`clear`](Self::clear)
    pub fn dropped_count(&self) -> u64 {
        self.state.lock().dropped
    }

    /// Append every sample of `input`, evicting the oldest as needed.
    /// Always returns `input.len()`.
    pub fn write(&self, input: &[i16]) -> usize {
        if input.is_empty() {
            return 0;
        }
        let cap = self.capacity;
        let mut state = self.state.lock();

        if input.len() >= cap {
            // Only the newest `cap` samples survive.
            let discarded = state.len + (input.len() - cap);
            state.dropped += discarded as u64;
            state.samples.copy_from_slice(&input[input.len() - cap..]);
            state.read_pos = 0;
            state.write_pos = 0;
            state.len = cap;
            return input.len();
        }

        let overflow = (state.len + input.len()).saturating_sub(cap);
        if overflow > 0 {
            state.read_pos = (state.read_pos + overflow) % cap;
            state.len -= overflow;
            state.dropped += overflow as u64;
        }

        let start = state.write_pos;
        let first = input.len().min(cap - start);
        state.samples[start..start + first].copy_from_slice(&input[..first]);
        let rest = input.len() - first;
        if rest > 0 {
            state.samples[..rest].copy_from_slice(&input[first..]);
        }
        state.write_pos = (start + input.len()) % cap;
        state.len += input.len();
        input.len()
    }

    /// Move up to `out.len()` of the oldest samples into `out`; returns how
    /// many were read. Short reads are normal.
    pub fn read(&self, out: &mut [i16]) -> usize {
        let cap = self.capacity;
        let mut state = self.state.lock();
        let count = out.len().min(state.len);
        if count == 0 {
            return 0;
        }

        let start = state.read_pos;
        let first = count.min(cap - start);
        out[..first].copy_from_slice(&state.samples[start..start + first]);
        let rest = count - first;
        if rest > 0 {
            out[first..count].copy_from_slice(&state.samples[..rest]);
        }
        state.read_pos = (start + count) % cap;
        state.len -= count;
        count
    }

    /// Reset to empty and zero the drop counter
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.read_pos = 0;
        state.write_pos = 0;
        state.len = 0;
        state.dropped = 0;
    }
}
