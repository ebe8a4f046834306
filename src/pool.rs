//! Scratch-buffer reuse for event rendering.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// Buffers retained by a pool.
const MAX_POOLED: usize = 32;
/// Buffers that grew beyond this capacity are dropped instead of retained.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// A bounded pool of byte buffers used while rendering events.
///
/// Buffers are cleared before re-entering the pool so no log content survives
/// a checkout.
#[derive(Debug, Default)]
pub(crate) struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Check out a buffer; it returns to the pool when the guard drops.
    pub(crate) fn acquire(&self) -> PooledBuf<'_> {
        let buf = self.buffers.lock().pop().unwrap_or_default();
        PooledBuf { pool: self, buf }
    }

    fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.clear();
        let mut buffers = self.buffers.lock();
        if buffers.len() < MAX_POOLED {
            buffers.push(buf);
        }
    }

    #[cfg(test)]
    fn pooled(&self) -> usize {
        self.buffers.lock().len()
    }
}

/// RAII checkout from a [`BufferPool`].
pub(crate) struct PooledBuf<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuf<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuf<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuf<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_are_reused() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.acquire();
            buf.extend_from_slice(b"hello");
        }
        assert_eq!(pool.pooled(), 1);

        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 5);
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn test_oversized_buffers_are_dropped() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.acquire();
            buf.reserve(MAX_RETAINED_CAPACITY + 1);
        }
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = BufferPool::new();
        let guards: Vec<_> = (0..MAX_POOLED + 8).map(|_| pool.acquire()).collect();
        drop(guards);
        assert_eq!(pool.pooled(), MAX_POOLED);
    }
}
