//! Fixed-length byte buffers and the handles that carry them
//!
//! A [`ByteBuf`] is allocated once at the exact capacity of its bucket and
//! never grows. Callers reach its bytes through a [`BufferHandle`], which also
//! remembers which bucket the buffer has to be returned to.

use core::fmt;
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

/// Identifies the bucket that issued a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketId {
    pool_id: u64,
    index: usize,
}

impl BucketId {
    pub(crate) const fn new(pool_id: u64, index: usize) -> Self {
        Self { pool_id, index }
    }

    /// Id of the owning pool
    #[must_use]
    pub const fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Position of the bucket in the pool's sorted bucket list
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool {} bucket {}", self.pool_id, self.index)
    }
}

/// Byte region of a fixed length
///
/// Access to the bytes is serialized by a mutex: the bucket cache may hand
/// the same buffer to several holders at once.
pub struct ByteBuf {
    data: Mutex<Box<[u8]>>,
    capacity: usize,
}

impl ByteBuf {
    /// Allocate a zero-filled buffer of exactly `capacity` bytes
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Mutex::new(vec![0u8; capacity].into_boxed_slice()),
            capacity,
        }
    }

    /// Length of the buffer in bytes
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lock the buffer for reading or writing
    pub fn lock(&self) -> MappedMutexGuard<'_, [u8]> {
        MutexGuard::map(self.data.lock(), |bytes| &mut **bytes)
    }

    /// Lock the buffer if no other holder is using it
    pub fn try_lock(&self) -> Option<MappedMutexGuard<'_, [u8]>> {
        self.data
            .try_lock()
            .map(|guard| MutexGuard::map(guard, |bytes| &mut **bytes))
    }
}

impl fmt::Debug for ByteBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuf")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Checked-out buffer tagged with its issuing bucket
///
/// Handles are cheap to clone and compare equal when they refer to the same
/// underlying buffer. A handle must only be returned to the pool that issued
/// it.
#[derive(Clone)]
pub struct BufferHandle {
    buf: Arc<ByteBuf>,
    bucket: BucketId,
}

impl BufferHandle {
    pub(crate) fn new(buf: Arc<ByteBuf>, bucket: BucketId) -> Self {
        Self { buf, bucket }
    }

    /// Length of the buffer in bytes, equal to the issuing bucket's capacity
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Bucket the buffer belongs to
    #[inline]
    #[must_use]
    pub fn bucket(&self) -> BucketId {
        self.bucket
    }

    /// Lock the buffer for reading or writing
    pub fn lock(&self) -> MappedMutexGuard<'_, [u8]> {
        self.buf.lock()
    }

    /// Lock the buffer if no other holder is using it
    pub fn try_lock(&self) -> Option<MappedMutexGuard<'_, [u8]>> {
        self.buf.try_lock()
    }

    /// Whether both handles refer to the same underlying buffer
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buf, &other.buf)
    }

    /// Shared reference to the underlying buffer
    #[must_use]
    pub fn buffer(&self) -> &Arc<ByteBuf> {
        &self.buf
    }
}

impl PartialEq for BufferHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) && self.bucket == other.bucket
    }
}

impl Eq for BufferHandle {}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferHandle")
            .field("bucket", &self.bucket)
            .field("capacity", &self.capacity())
            .field("ptr", &Arc::as_ptr(&self.buf))
            .finish()
    }
}
