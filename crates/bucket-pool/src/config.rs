//! Pool layout configuration
//!
//! A [`PoolConfig`] lists the size classes a [`Pool`](crate::Pool) is built
//! from. Entries need not be sorted and may repeat; the pool sorts them at
//! construction.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Default number of idle buffers the default free list keeps per bucket.
pub const DEFAULT_MAX_RETAINED: usize = 64;

/// Descriptor for a single size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BucketConfig {
    /// Buffer length in bytes for every buffer this bucket hands out
    pub capacity: usize,
}

impl BucketConfig {
    /// Create a size class descriptor
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl From<usize> for BucketConfig {
    fn from(capacity: usize) -> Self {
        Self::new(capacity)
    }
}

/// Configuration for a bucket pool
///
/// # Example
/// ```
/// use bucket_pool::PoolConfig;
///
/// let config = PoolConfig::new()
///     .with_bucket(1024)
///     .with_bucket(64)
///     .with_bucket(256)
///     .with_max_retained(16);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Size classes in caller order
    pub buckets: Vec<BucketConfig>,

    /// Idle buffers retained per bucket by the default free list
    pub max_retained: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
            max_retained: DEFAULT_MAX_RETAINED,
        }
    }
}

impl PoolConfig {
    /// Create an empty configuration
    ///
    /// At least one bucket has to be added before it validates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from a list of capacities
    pub fn from_capacities<I>(capacities: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        Self::new().with_buckets(capacities)
    }

    /// Add one size class
    pub fn with_bucket(mut self, capacity: usize) -> Self {
        self.buckets.push(BucketConfig::new(capacity));
        self
    }

    /// Add several size classes
    pub fn with_buckets<I>(mut self, capacities: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        self.buckets
            .extend(capacities.into_iter().map(BucketConfig::new));
        self
    }

    /// Set the idle-buffer limit of the default free list
    pub fn with_max_retained(mut self, max_retained: usize) -> Self {
        self.max_retained = max_retained;
        self
    }

    /// Number of configured size classes
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no size class is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Check the configuration can build a pool
    pub fn validate(&self) -> PoolResult<()> {
        if self.buckets.is_empty() {
            return Err(PoolError::invalid_config(
                "at least one bucket is required",
            ));
        }

        if let Some(position) = self.buckets.iter().position(|b| b.capacity == 0) {
            return Err(PoolError::InvalidConfig {
                reason: format!("bucket #{position} has zero capacity"),
            });
        }

        if self.max_retained == 0 {
            return Err(PoolError::invalid_config(
                "max_retained must be greater than zero",
            ));
        }

        Ok(())
    }
}

impl FromIterator<usize> for PoolConfig {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_capacities(iter)
    }
}
