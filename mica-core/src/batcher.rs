//! Size-or-time batching over a bounded channel.
//!
//! Every pipeline stage drains its input through a [`Batcher`]: a batch is
//! emitted as soon as `size` items are buffered, or when `interval` has
//! elapsed since the first item of the batch arrived. The iterator ends
//! when the channel disconnects and the buffer is empty, which is how the
//! stages drain on shutdown.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

pub(crate) struct Batcher<T> {
    rx: Receiver<T>,
    size: usize,
    interval: Duration,
}

impl<T> Batcher<T> {
    pub(crate) fn new(rx: Receiver<T>, size: usize, interval: Duration) -> Self {
        Self { rx, size, interval }
    }
}

impl<T> Iterator for Batcher<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        // Block indefinitely for the first item; the interval clock only
        // starts once a batch has something in it.
        let first = match self.rx.recv() {
            Ok(item) => item,
            Err(_) => return None,
        };

        let mut batch = Vec::with_capacity(self.size);
        batch.push(first);
        let deadline = Instant::now() + self.interval;

        while batch.len() < self.size {
            match self.rx.recv_deadline(deadline) {
                Ok(item) => batch.push(item),
                Err(RecvTimeoutError::Timeout) => break,
                // Disconnected: emit what we have; the next call returns None.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Some(batch)
    }
}
