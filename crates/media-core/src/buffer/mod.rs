//! Buffers between the real-time media threads and everything else

pub mod queue;
pub mod ring;

pub use queue::DropOldestQueue;
pub use ring::AudioRingBuffer;
