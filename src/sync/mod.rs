//! Async synchronization primitives.

pub mod fifo;

pub use fifo::{FifoMutex, FifoMutexGuard};
