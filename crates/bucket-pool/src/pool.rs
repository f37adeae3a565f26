//! Size-class buffer pool
//!
//! A [`Pool`] owns a fixed, ascending list of [`SizeBucket`]s. Requests are
//! routed to the smallest bucket that can hold them; requests larger than
//! every bucket are served by the largest bucket, which means the caller
//! receives a buffer *shorter* than requested and has to cope with that.
//!
//! Returned handles are routed back by the bucket id they carry. A handle
//! from another pool is a caller contract violation: [`Pool::put`] ignores
//! it and [`Pool::try_put`] reports it.

use core::fmt;
use core::ops::Deref;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

use crate::bucket::{BucketStats, BufferRecycler, SizeBucket};
use crate::buffer::{BucketId, BufferHandle, ByteBuf};
use crate::config::{BucketConfig, PoolConfig};
use crate::error::{PoolError, PoolResult};
use crate::recycler::FreeList;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Fixed-bucket byte-buffer pool
///
/// # Example
/// ```
/// use bucket_pool::Pool;
///
/// let pool = Pool::from_capacities([1024, 64, 256])?;
///
/// let buf = pool.get(100);
/// assert_eq!(buf.capacity(), 256);
/// buf.lock()[..5].copy_from_slice(b"hello");
///
/// pool.put(Some(buf));
/// # Ok::<(), bucket_pool::PoolError>(())
/// ```
pub struct Pool {
    id: u64,
    buckets: Box<[SizeBucket]>,
}

impl Pool {
    /// Build a pool whose buckets use the default [`FreeList`] recycler
    pub fn new(config: PoolConfig) -> PoolResult<Self> {
        let max_retained = config.max_retained;
        Self::with_recycler(config, move |_| {
            Box::new(FreeList::<Arc<ByteBuf>>::new(max_retained))
        })
    }

    /// Build a pool from bare capacities with default settings
    pub fn from_capacities<I>(capacities: I) -> PoolResult<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        Self::new(PoolConfig::from_capacities(capacities))
    }

    /// Build a pool with a caller-supplied recycler per bucket
    ///
    /// `make` is called once per configured bucket, in ascending capacity
    /// order, and the recycler it returns is owned by that bucket alone.
    pub fn with_recycler<F>(config: PoolConfig, mut make: F) -> PoolResult<Self>
    where
        F: FnMut(&BucketConfig) -> Box<BufferRecycler>,
    {
        config.validate()?;

        let mut classes = config.buckets;
        classes.sort_by_key(|class| class.capacity);

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let buckets: Box<[SizeBucket]> = classes
            .iter()
            .enumerate()
            .map(|(index, class)| {
                SizeBucket::new(BucketId::new(id, index), class.capacity, make(class))
            })
            .collect();

        #[cfg(feature = "logging")]
        debug!(
            pool = id,
            capacities = ?classes.iter().map(|c| c.capacity).collect::<Vec<_>>(),
            "bucket pool created"
        );

        Ok(Self { id, buckets })
    }

    /// Process-unique id stamped on every handle this pool issues
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Check out a buffer of at least `size` bytes when possible
    ///
    /// Picks the smallest bucket whose capacity is `>= size`. When `size`
    /// exceeds every bucket the largest bucket is used and the returned
    /// buffer is shorter than `size`.
    pub fn get(&self, size: usize) -> BufferHandle {
        self.bucket_for(size).checkout()
    }

    /// Return a buffer to the bucket that issued it
    ///
    /// `None` is accepted and ignored. Handles from another pool are
    /// ignored as well; use [`Pool::try_put`] to detect them.
    pub fn put(&self, handle: Option<BufferHandle>) {
        if let Some(handle) = handle {
            // Foreign handles are logged by the error constructor.
            let _ = self.try_put(handle);
        }
    }

    /// Return a buffer, rejecting handles issued by another pool
    pub fn try_put(&self, handle: BufferHandle) -> PoolResult<()> {
        let owner = handle.bucket();
        if owner.pool_id() != self.id {
            return Err(PoolError::foreign_buffer(self.id, owner));
        }

        match self.buckets.get(owner.index()) {
            Some(bucket) => {
                bucket.release();
                Ok(())
            }
            None => Err(PoolError::foreign_buffer(self.id, owner)),
        }
    }

    /// Check out a buffer that goes back to the pool when dropped
    pub fn lease(&self, size: usize) -> PooledBuffer<'_> {
        PooledBuffer {
            handle: Some(self.get(size)),
            pool: self,
        }
    }

    /// Bucket that serves requests of `size` bytes
    pub fn bucket_for(&self, size: usize) -> &SizeBucket {
        let index = self.buckets.partition_point(|bucket| bucket.capacity() < size);
        match self.buckets.get(index) {
            Some(bucket) => bucket,
            None => {
                let largest = &self.buckets[self.buckets.len() - 1];

                #[cfg(feature = "logging")]
                debug!(
                    pool = self.id,
                    size,
                    capacity = largest.capacity(),
                    "request exceeds every bucket, serving largest"
                );

                largest
            }
        }
    }

    /// Buckets in ascending capacity order
    #[must_use]
    pub fn buckets(&self) -> &[SizeBucket] {
        &self.buckets
    }

    /// Bucket capacities in ascending order
    pub fn capacities(&self) -> Vec<usize> {
        self.buckets.iter().map(SizeBucket::capacity).collect()
    }

    /// Number of buckets (never zero)
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always `false`; a pool cannot be built without buckets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Capacity of the smallest bucket
    #[must_use]
    pub fn min_capacity(&self) -> usize {
        self.buckets[0].capacity()
    }

    /// Capacity of the largest bucket
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.buckets[self.buckets.len() - 1].capacity()
    }

    /// Per-bucket statistics in ascending capacity order
    pub fn stats(&self) -> Vec<BucketStats> {
        self.buckets.iter().map(SizeBucket::stats).collect()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("capacities", &self.capacities())
            .finish()
    }
}

/// RAII lease that returns its buffer to the pool on drop
pub struct PooledBuffer<'a> {
    handle: Option<BufferHandle>,
    pool: &'a Pool,
}

impl PooledBuffer<'_> {
    /// Take the handle out; the pool is not notified on drop
    pub fn detach(mut self) -> BufferHandle {
        match self.handle.take() {
            Some(handle) => handle,
            None => unreachable!("lease handle is only taken once"),
        }
    }

    /// Pool the lease belongs to
    #[must_use]
    pub fn pool(&self) -> &Pool {
        self.pool
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = BufferHandle;

    fn deref(&self) -> &Self::Target {
        match &self.handle {
            Some(handle) => handle,
            None => unreachable!("lease handle is only taken by detach"),
        }
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.put(self.handle.take());
    }
}

impl fmt::Debug for PooledBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("handle", &self.handle)
            .field("pool", &self.pool.id)
            .finish()
    }
}
