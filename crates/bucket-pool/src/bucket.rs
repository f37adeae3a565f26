//! Single size class with a one-slot front cache
//!
//! # Concurrency
//!
//! A bucket caches at most one buffer. While the slot is populated every
//! [`SizeBucket::checkout`] returns that same buffer, so concurrent holders
//! share it; the buffer's own mutex serializes access to the bytes. The
//! recycler is only consulted when the slot is empty.
//!
//! The slot itself is an [`ArcSwapOption`], which makes the populated fast
//! path lock-free. Populating and clearing happen under `transition`, with a
//! second look at the slot once the lock is held: another thread may have
//! filled or cleared it in between.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

#[cfg(feature = "logging")]
use tracing::trace;

use crate::buffer::{BucketId, BufferHandle, ByteBuf};
use crate::recycler::Recycler;

/// Reuse primitive a bucket delegates to
pub type BufferRecycler = dyn Recycler<Arc<ByteBuf>>;

/// One size class of a [`Pool`](crate::Pool)
pub struct SizeBucket {
    id: BucketId,
    capacity: usize,
    recycler: Box<BufferRecycler>,
    current: ArcSwapOption<ByteBuf>,
    transition: Mutex<()>,
    counters: Counters,
}

impl SizeBucket {
    pub(crate) fn new(id: BucketId, capacity: usize, recycler: Box<BufferRecycler>) -> Self {
        Self {
            id,
            capacity,
            recycler,
            current: ArcSwapOption::empty(),
            transition: Mutex::new(()),
            counters: Counters::default(),
        }
    }

    /// Buffer length handed out by this bucket
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Identifier stamped on every handle from this bucket
    #[inline]
    #[must_use]
    pub fn id(&self) -> BucketId {
        self.id
    }

    /// Whether a buffer is currently cached in the slot
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.current.load().is_some()
    }

    /// Check out the cached buffer, filling the slot first if it is empty
    ///
    /// Calls made while the slot is populated return the same buffer.
    pub fn checkout(&self) -> BufferHandle {
        self.counters.checkouts.fetch_add(1, Ordering::Relaxed);

        if let Some(buf) = self.current.load_full() {
            self.counters.slot_hits.fetch_add(1, Ordering::Relaxed);
            return BufferHandle::new(buf, self.id);
        }

        let _guard = self.transition.lock();
        if let Some(buf) = self.current.load_full() {
            self.counters.slot_hits.fetch_add(1, Ordering::Relaxed);
            return BufferHandle::new(buf, self.id);
        }

        let capacity = self.capacity;
        let buf = self
            .recycler
            .acquire(&|| Arc::new(ByteBuf::new(capacity)));
        debug_assert_eq!(buf.capacity(), capacity, "recycler returned a foreign buffer");

        self.current.store(Some(Arc::clone(&buf)));
        self.counters.slot_fills.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "logging")]
        trace!(bucket = %self.id, capacity, "bucket slot filled");

        BufferHandle::new(buf, self.id)
    }

    /// Return the cached buffer to the recycler and clear the slot
    ///
    /// Releasing an empty slot does nothing, so a double release is harmless.
    pub fn release(&self) {
        let _guard = self.transition.lock();
        match self.current.swap(None) {
            Some(buf) => {
                self.recycler.release(buf);
                self.counters.releases.fetch_add(1, Ordering::Relaxed);

                #[cfg(feature = "logging")]
                trace!(bucket = %self.id, capacity = self.capacity, "bucket slot released");
            }
            None => {
                self.counters.empty_releases.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get bucket statistics
    pub fn stats(&self) -> BucketStats {
        BucketStats {
            capacity: self.capacity,
            populated: self.is_populated(),
            checkouts: self.counters.checkouts.load(Ordering::Relaxed),
            slot_hits: self.counters.slot_hits.load(Ordering::Relaxed),
            slot_fills: self.counters.slot_fills.load(Ordering::Relaxed),
            releases: self.counters.releases.load(Ordering::Relaxed),
            empty_releases: self.counters.empty_releases.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for SizeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeBucket")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("populated", &self.is_populated())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Counters {
    checkouts: AtomicU64,
    slot_hits: AtomicU64,
    slot_fills: AtomicU64,
    releases: AtomicU64,
    empty_releases: AtomicU64,
}

/// Snapshot of a bucket's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    /// Buffer length of the bucket
    pub capacity: usize,
    /// Whether the slot held a buffer when the snapshot was taken
    pub populated: bool,
    /// Total checkouts
    pub checkouts: u64,
    /// Checkouts served from the populated slot
    pub slot_hits: u64,
    /// Checkouts that filled the slot from the recycler
    pub slot_fills: u64,
    /// Releases that returned a buffer to the recycler
    pub releases: u64,
    /// Releases of an already empty slot
    pub empty_releases: u64,
}

impl BucketStats {
    /// Share of checkouts served by the slot (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.checkouts == 0 {
            0.0
        } else {
            self.slot_hits as f64 / self.checkouts as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recycler::FreeList;
    use std::sync::atomic::AtomicUsize;

    fn bucket(capacity: usize) -> SizeBucket {
        SizeBucket::new(BucketId::new(0, 0), capacity, Box::new(FreeList::new(4)))
    }

    /// Recycler that counts fabricated buffers and keeps nothing
    #[derive(Default)]
    struct Counting {
        made: AtomicUsize,
        released: AtomicUsize,
    }

    impl Recycler<Arc<ByteBuf>> for Arc<Counting> {
        fn acquire(&self, make: &dyn Fn() -> Arc<ByteBuf>) -> Arc<ByteBuf> {
            self.made.fetch_add(1, Ordering::SeqCst);
            make()
        }

        fn release(&self, _value: Arc<ByteBuf>) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_checkout_fills_slot_lazily() {
        let bucket = bucket(64);
        assert!(!bucket.is_populated());

        let handle = bucket.checkout();
        assert_eq!(handle.capacity(), 64);
        assert!(bucket.is_populated());

        let stats = bucket.stats();
        assert_eq!(stats.slot_fills, 1);
        assert_eq!(stats.slot_hits, 0);
    }

    #[test]
    fn test_repeated_checkout_returns_same_buffer() {
        let counting = Arc::new(Counting::default());
        let bucket = SizeBucket::new(BucketId::new(0, 0), 32, Box::new(Arc::clone(&counting)));

        let first = bucket.checkout();
        let second = bucket.checkout();
        assert!(first.ptr_eq(&second));
        assert_eq!(counting.made.load(Ordering::SeqCst), 1);
        assert_eq!(bucket.stats().slot_hits, 1);
    }

    #[test]
    fn test_release_clears_slot_and_returns_buffer() {
        let counting = Arc::new(Counting::default());
        let bucket = SizeBucket::new(BucketId::new(0, 0), 32, Box::new(Arc::clone(&counting)));

        let _handle = bucket.checkout();
        bucket.release();
        assert!(!bucket.is_populated());
        assert_eq!(counting.released.load(Ordering::SeqCst), 1);

        let _again = bucket.checkout();
        assert_eq!(counting.made.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_double_release_is_noop() {
        let counting = Arc::new(Counting::default());
        let bucket = SizeBucket::new(BucketId::new(0, 0), 32, Box::new(Arc::clone(&counting)));

        bucket.release();
        let _handle = bucket.checkout();
        bucket.release();
        bucket.release();

        assert_eq!(counting.released.load(Ordering::SeqCst), 1);
        let stats = bucket.stats();
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.empty_releases, 2);
    }

    #[test]
    fn test_reuse_through_free_list() {
        let bucket = bucket(16);
        let first = bucket.checkout();
        bucket.release();

        let second = bucket.checkout();
        assert!(first.ptr_eq(&second));
        assert_eq!(second.capacity(), 16);
    }

    #[test]
    fn test_concurrent_checkout_shares_buffer() {
        let counting = Arc::new(Counting::default());
        let bucket = SizeBucket::new(BucketId::new(0, 0), 128, Box::new(Arc::clone(&counting)));

        let handles: Vec<BufferHandle> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8).map(|_| s.spawn(|| bucket.checkout())).collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(counting.made.load(Ordering::SeqCst), 1);
        assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(bucket.stats().checkouts, 8);
    }

    #[test]
    fn test_stats_hit_rate() {
        let bucket = bucket(8);
        for _ in 0..4 {
            let _ = bucket.checkout();
        }
        let stats = bucket.stats();
        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
        assert!(BucketStats::default().hit_rate().abs() < f64::EPSILON);
    }
}
