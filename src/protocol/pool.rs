//! Body buffer pool for outbound and parsed frames.
//!
//! Frame bodies are borrowed from a pool of reusable `BytesMut` buffers and
//! handed back when the owning frame is dropped.
//!
//! # Design
//!
//! - One process-wide pool ([`global`]) shared by every frame in flight
//! - A `Mutex<Vec<BytesMut>>` free list, safe for concurrent borrow/release
//! - [`PooledBuffer`] is the only way to hold a borrowed buffer; its `Drop`
//!   returns the buffer exactly once, on every exit path
//! - Oversized buffers are dropped instead of retained, so one 16 MiB body
//!   does not pin memory forever
//!
//! # Usage
//!
//! ```
//! use rsocket_framing::protocol::pool;
//!
//! let mut buf = pool::global().borrow();
//! buf.extend_from_slice(b"body");
//! assert_eq!(&buf[..], b"body");
//! // returned to the pool here
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use bytes::BytesMut;

/// Default capacity of a freshly allocated buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Default number of idle buffers kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// Default largest capacity a released buffer may have and still be kept.
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// Configuration for a [`BufferPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Capacity of newly allocated buffers.
    pub buffer_capacity: usize,
    /// Maximum idle buffers kept in the free list.
    pub max_idle: usize,
    /// Released buffers with a larger capacity are dropped.
    pub max_retained_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_idle: DEFAULT_MAX_IDLE,
            max_retained_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
        }
    }
}

struct Inner {
    free: Mutex<Vec<BytesMut>>,
    config: PoolConfig,
    outstanding: AtomicUsize,
}

/// A shared pool of body buffers.
///
/// Cheap to clone; clones refer to the same free list.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

impl BufferPool {
    /// Create a pool with default settings.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool with custom settings.
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                free: Mutex::new(Vec::new()),
                config,
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    /// Borrow an empty buffer.
    ///
    /// The buffer goes back to this pool when the returned guard drops.
    pub fn borrow(&self) -> PooledBuffer {
        let reused = self.lock_free().pop();
        let buf =
            reused.unwrap_or_else(|| BytesMut::with_capacity(self.inner.config.buffer_capacity));
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        PooledBuffer {
            buf,
            pool: self.clone(),
        }
    }

    /// Number of buffers currently borrowed and not yet released.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Number of idle buffers ready for reuse.
    pub fn idle(&self) -> usize {
        self.lock_free().len()
    }

    fn release(&self, mut buf: BytesMut) {
        self.inner.outstanding.fetch_sub(1, Ordering::AcqRel);
        if buf.capacity() > self.inner.config.max_retained_capacity {
            return;
        }
        buf.clear();
        let mut free = self.lock_free();
        if free.len() < self.inner.config.max_idle {
            free.push(buf);
        }
    }

    fn lock_free(&self) -> std::sync::MutexGuard<'_, Vec<BytesMut>> {
        // A panic while holding the lock cannot leave the Vec inconsistent.
        self.inner.free.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("outstanding", &self.outstanding())
            .field("idle", &self.idle())
            .finish()
    }
}

static GLOBAL_POOL: OnceLock<BufferPool> = OnceLock::new();

/// The process-wide pool used by frame constructors and parsers.
pub fn global() -> &'static BufferPool {
    GLOBAL_POOL.get_or_init(BufferPool::new)
}

/// A buffer borrowed from a [`BufferPool`].
///
/// Dereferences to `BytesMut`. Dropping it releases the buffer.
pub struct PooledBuffer {
    buf: BytesMut,
    pool: BufferPool,
}

impl PooledBuffer {
    /// Borrow a buffer from the same pool and copy this one into it.
    pub fn duplicate(&self) -> PooledBuffer {
        let mut copy = self.pool.borrow();
        copy.extend_from_slice(self);
        copy
    }
}

impl Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.len())
            .finish()
    }
}
