//! The circular byte buffer sitting between the capture thread and the
//! sample consumer.
//!
//! A single writer (the capture callback) appends UDP payloads, a single
//! reader (the demultiplexer) peeks and consumes decoded bytes. The ring
//! never blocks the writer: a payload that doesn't fit is dropped whole
//! and counted as an overflow.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

/// The buffer was full, the entire write was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circular sample buffer full")]
pub struct Overflow;

/// Ring cursor/count state plus backing storage. Not synchronized;
/// [`SampleFifo`] wraps this in a mutex for cross-thread use.
#[derive(Debug)]
pub struct FifoState {
    buf: Box<[u8]>,
    read: usize,
    write: usize,
    count: usize,
}

impl FifoState {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "fifo capacity must be non-zero");
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            read: 0,
            write: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Unread bytes currently held.
    pub fn available(&self) -> usize {
        self.count
    }

    /// Append `bytes`, all or nothing. A span that doesn't fit in the
    /// remaining space leaves the cursors and count untouched.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), Overflow> {
        if self.count + bytes.len() > self.buf.len() {
            return Err(Overflow);
        }
        let tail = self.buf.len() - self.write;
        if bytes.len() <= tail {
            // Fits without wrapping, single copy
            self.buf[self.write..self.write + bytes.len()].copy_from_slice(bytes);
            self.write = (self.write + bytes.len()) % self.buf.len();
        } else {
            // Two-step wrap write
            let (head, rest) = bytes.split_at(tail);
            self.buf[self.write..].copy_from_slice(head);
            self.buf[..rest.len()].copy_from_slice(rest);
            self.write = rest.len();
        }
        self.count += bytes.len();
        Ok(())
    }

    /// Byte at `offset` past the read cursor, wrapping at capacity.
    /// Caller must stay within `available()`.
    pub fn peek(&self, offset: usize) -> u8 {
        debug_assert!(offset < self.count);
        self.buf[(self.read + offset) % self.buf.len()]
    }

    /// Advance the read cursor past `n` bytes previously decoded via
    /// [`peek`](Self::peek).
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.count);
        self.read = (self.read + n) % self.buf.len();
        self.count -= n;
    }
}

/// Shared handle over the ring: one mutex scoped to each operation, plus
/// a running overflow counter for diagnostics.
#[derive(Debug)]
pub struct SampleFifo {
    state: Mutex<FifoState>,
    overflows: AtomicU64,
}

impl SampleFifo {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(FifoState::new(capacity)),
            overflows: AtomicU64::new(0),
        }
    }

    /// Append a payload from the capture thread. Failures are counted and
    /// reported to the caller; the payload is dropped, never retried.
    pub fn write(&self, bytes: &[u8]) -> Result<(), Overflow> {
        let result = self.state.lock().unwrap().write(bytes);
        if result.is_err() {
            self.overflows.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Unread byte count at this instant.
    pub fn available(&self) -> usize {
        self.state.lock().unwrap().available()
    }

    /// Lock the ring for one demultiplex pass. The guard is held for the
    /// duration of the decode, so hold time is proportional to the bytes
    /// decoded, never to any I/O wait.
    pub fn lock(&self) -> MutexGuard<'_, FifoState> {
        self.state.lock().unwrap()
    }

    /// Payloads dropped because the buffer was full.
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(fifo: &mut FifoState) -> Vec<u8> {
        let n = fifo.available();
        let bytes = (0..n).map(|i| fifo.peek(i)).collect();
        fifo.consume(n);
        bytes
    }

    #[test]
    fn fifo_order_preserved() {
        let mut fifo = FifoState::new(16);
        fifo.write(&[1, 2, 3, 4, 5]).unwrap();
        fifo.write(&[6, 7, 8]).unwrap();
        assert_eq!(drain(&mut fifo), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(fifo.available(), 0);
    }

    #[test]
    fn fifo_order_preserved_across_wrap() {
        let mut fifo = FifoState::new(8);
        fifo.write(&[1, 2, 3, 4, 5, 6]).unwrap();
        fifo.consume(5);
        // Write cursor is at 6, this span wraps
        fifo.write(&[7, 8, 9, 10, 11]).unwrap();
        assert_eq!(drain(&mut fifo), vec![6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn overflow_drops_whole_write() {
        let mut fifo = FifoState::new(16);
        fifo.write(&[0; 10]).unwrap();
        assert_eq!(fifo.write(&[1; 10]), Err(Overflow));
        // The first ten bytes are still there, nothing partial got in
        assert_eq!(fifo.available(), 10);
        assert_eq!(drain(&mut fifo), vec![0; 10]);
    }

    #[test]
    fn write_of_exact_capacity_fits() {
        let mut fifo = FifoState::new(8);
        fifo.write(&[42; 8]).unwrap();
        assert_eq!(fifo.write(&[0]), Err(Overflow));
        assert_eq!(drain(&mut fifo), vec![42; 8]);
    }

    #[test]
    fn shared_handle_counts_overflows() {
        let fifo = SampleFifo::new(4);
        fifo.write(&[1, 2, 3]).unwrap();
        assert!(fifo.write(&[4, 5]).is_err());
        assert!(fifo.write(&[6, 7, 8, 9]).is_err());
        assert_eq!(fifo.overflow_count(), 2);
        assert_eq!(fifo.available(), 3);
    }
}
