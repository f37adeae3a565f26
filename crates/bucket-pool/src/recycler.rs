//! Object-reuse primitives that buckets delegate to
//!
//! A bucket never allocates buffers itself. It asks its [`Recycler`] for an
//! instance, passing a factory that produces a buffer of the bucket's exact
//! capacity, and hands instances back when the caller is done with them.
//!
//! [`FreeList`] is the default recycler: a bounded lock-free queue of idle
//! instances that fabricates a new one when empty and drops returned
//! instances once it is full.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::ArrayQueue;

/// Concurrent object-reuse capability
///
/// Implementations must be safe to call from many threads at once. They give
/// no ordering guarantees and are free to drop released instances instead of
/// keeping them.
///
/// # Example
/// ```
/// use bucket_pool::recycler::Recycler;
///
/// // A recycler that never keeps anything.
/// struct AlwaysFresh;
///
/// impl Recycler<Vec<u8>> for AlwaysFresh {
///     fn acquire(&self, make: &dyn Fn() -> Vec<u8>) -> Vec<u8> {
///         make()
///     }
///
///     fn release(&self, _value: Vec<u8>) {}
/// }
///
/// let buf = AlwaysFresh.acquire(&|| vec![0; 16]);
/// assert_eq!(buf.len(), 16);
/// ```
pub trait Recycler<T>: Send + Sync {
    /// Return an idle instance, or build one with `make` when none is idle
    fn acquire(&self, make: &dyn Fn() -> T) -> T;

    /// Hand an instance back for future reuse
    fn release(&self, value: T);
}

/// Bounded lock-free free list
///
/// # Example
/// ```
/// use bucket_pool::recycler::{FreeList, Recycler};
///
/// let list: FreeList<Vec<u8>> = FreeList::new(4);
/// let first = list.acquire(&|| vec![0u8; 32]);
/// list.release(first);
///
/// let again = list.acquire(&|| vec![1u8; 32]);
/// assert_eq!(again, vec![0u8; 32]);
/// assert_eq!(list.stats().hits, 1);
/// ```
pub struct FreeList<T> {
    idle: ArrayQueue<T>,
    hits: AtomicU64,
    misses: AtomicU64,
    returns: AtomicU64,
    drops: AtomicU64,
}

impl<T> FreeList<T> {
    /// Create a free list keeping at most `max_retained` idle instances
    ///
    /// A zero limit is raised to one.
    #[must_use]
    pub fn new(max_retained: usize) -> Self {
        Self {
            idle: ArrayQueue::new(max_retained.max(1)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            returns: AtomicU64::new(0),
            drops: AtomicU64::new(0),
        }
    }

    /// Number of idle instances currently held
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.idle.len()
    }

    /// Whether no idle instance is held
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.idle.is_empty()
    }

    /// Maximum number of idle instances kept
    #[inline]
    #[must_use]
    pub fn max_retained(&self) -> usize {
        self.idle.capacity()
    }

    /// Get free list statistics
    pub fn stats(&self) -> RecyclerStats {
        RecyclerStats {
            idle: self.idle.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

impl<T: Send> Recycler<T> for FreeList<T> {
    #[inline]
    fn acquire(&self, make: &dyn Fn() -> T) -> T {
        if let Some(value) = self.idle.pop() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            value
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            make()
        }
    }

    #[inline]
    fn release(&self, value: T) {
        if self.idle.push(value).is_ok() {
            self.returns.fetch_add(1, Ordering::Relaxed);
        } else {
            self.drops.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl<T> fmt::Debug for FreeList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeList")
            .field("idle", &self.idle.len())
            .field("max_retained", &self.idle.capacity())
            .finish()
    }
}

/// Free list statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecyclerStats {
    /// Idle instances currently held
    pub idle: usize,
    /// Acquisitions served from the idle queue
    pub hits: u64,
    /// Acquisitions that fabricated a new instance
    pub misses: u64,
    /// Releases kept for reuse
    pub returns: u64,
    /// Releases dropped because the queue was full
    pub drops: u64,
}

impl RecyclerStats {
    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_fabricates_when_empty() {
        let list: FreeList<Vec<u8>> = FreeList::new(2);
        let buf = list.acquire(&|| vec![1; 8]);
        assert_eq!(buf, vec![1; 8]);

        let stats = list.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_release_then_reuse() {
        let list: FreeList<Vec<u8>> = FreeList::new(2);
        let buf = list.acquire(&|| vec![0u8; 8]);
        let ptr = buf.as_ptr();
        list.release(buf);
        assert_eq!(list.len(), 1);

        let again = list.acquire(&|| vec![0u8; 8]);
        assert_eq!(again.as_ptr(), ptr);
        assert!(list.is_empty());
    }

    #[test]
    fn test_full_list_drops() {
        let list = FreeList::new(1);
        list.release(1u32);
        list.release(2u32);

        let stats = list.stats();
        assert_eq!(stats.returns, 1);
        assert_eq!(stats.drops, 1);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn test_zero_limit_raised() {
        let list: FreeList<u8> = FreeList::new(0);
        assert_eq!(list.max_retained(), 1);
    }

    #[test]
    fn test_hit_rate() {
        let stats = RecyclerStats {
            idle: 0,
            hits: 75,
            misses: 25,
            returns: 70,
            drops: 5,
        };
        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
        assert!(RecyclerStats::default().hit_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let list = Arc::new(FreeList::<Vec<u8>>::new(8));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let list = Arc::clone(&list);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let buf = list.acquire(&|| vec![0u8; 16]);
                        assert_eq!(buf.len(), 16);
                        list.release(buf);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let stats = list.stats();
        assert_eq!(stats.hits + stats.misses, 400);
        assert_eq!(stats.returns + stats.drops, 400);
        assert!(stats.idle <= 8);
    }
}
