//! # bucket-pool
//!
//! Fixed-bucket byte-buffer pool for hot I/O, serialization and framing
//! paths that keep needing short-lived buffers of boundable sizes.
//!
//! A [`Pool`] is built once from a [`PoolConfig`] listing its size classes.
//! [`Pool::get`] returns a buffer from the smallest class that fits the
//! request and [`Pool::put`] hands it back to the class that issued it.
//!
//! ## Quick Start
//!
//! ```rust
//! use bucket_pool::prelude::*;
//!
//! let pool = Pool::new(PoolConfig::from_capacities([64, 256, 1024]))?;
//!
//! let frame = pool.get(100);
//! assert_eq!(frame.capacity(), 256);
//! pool.put(Some(frame));
//!
//! // Or let a lease return the buffer on drop
//! {
//!     let lease = pool.lease(32);
//!     lease.lock()[0] = 0xFF;
//! }
//! # Ok::<(), PoolError>(())
//! ```
//!
//! ## Caveats
//!
//! - Requests larger than the largest class are served by the largest class:
//!   the buffer is then **shorter than requested**.
//! - Each class caches a single buffer. While it is cached, every `get` for
//!   that class returns the same buffer, so concurrent callers share it and
//!   must coordinate through [`BufferHandle::lock`].
//! - A handle must go back to the pool that issued it. [`Pool::put`] ignores
//!   foreign handles; [`Pool::try_put`] reports them.
//!
//! ## Features
//!
//! - `logging` (default): structured events via `tracing`
//! - `serde`: `Serialize`/`Deserialize` for [`PoolConfig`] and [`BucketConfig`]

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rust_2018_idioms)]

// Error types
pub mod error;

// Core modules
pub mod bucket;
pub mod buffer;
pub mod config;
pub mod pool;
pub mod recycler;

pub use crate::bucket::{BucketStats, BufferRecycler, SizeBucket};
pub use crate::buffer::{BucketId, BufferHandle, ByteBuf};
pub use crate::config::{BucketConfig, DEFAULT_MAX_RETAINED, PoolConfig};
pub use crate::error::{PoolError, PoolResult, Result};
pub use crate::pool::{Pool, PooledBuffer};
pub use crate::recycler::{FreeList, Recycler, RecyclerStats};

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::buffer::{BufferHandle, ByteBuf};
    pub use crate::config::{BucketConfig, PoolConfig};
    pub use crate::error::{PoolError, PoolResult};
    pub use crate::pool::{Pool, PooledBuffer};
    pub use crate::recycler::Recycler;
}
