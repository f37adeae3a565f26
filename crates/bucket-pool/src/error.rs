//! Standalone error types for bucket-pool
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::warn;

use crate::buffer::BucketId;

// ============================================================================
// Main Error Types
// ============================================================================

/// Bucket pool errors
///
/// Only construction and the checked return path can fail. Oversized
/// requests, `put(None)` and double releases are not errors.
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    // --- Configuration Errors ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // --- Ownership Errors ---
    #[error("Buffer from {found} returned to pool {expected}")]
    ForeignBuffer { expected: u64, found: BucketId },
}

impl PoolError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "POOL:CONFIG:INVALID",
            Self::ForeignBuffer { .. } => "POOL:BUFFER:FOREIGN",
        }
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }

    /// Create foreign buffer error
    pub fn foreign_buffer(expected: u64, found: BucketId) -> Self {
        #[cfg(feature = "logging")]
        warn!(pool = expected, %found, "buffer returned to the wrong pool");

        Self::ForeignBuffer { expected, found }
    }

    /// Check if this is a configuration error
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for pool operations
pub type PoolResult<T> = core::result::Result<T, PoolError>;

/// Generic result type alias
pub type Result<T> = PoolResult<T>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let error = PoolError::invalid_config("at least one bucket is required");
        assert!(error.is_config_error());
        assert!(error.to_string().contains("at least one bucket"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PoolError::invalid_config("x").code(),
            "POOL:CONFIG:INVALID"
        );
        let foreign = PoolError::foreign_buffer(7, BucketId::new(3, 1));
        assert_eq!(foreign.code(), "POOL:BUFFER:FOREIGN");
        assert!(!foreign.is_config_error());
    }

    #[test]
    fn test_foreign_buffer_display_names_both_pools() {
        let error = PoolError::foreign_buffer(7, BucketId::new(3, 1));
        let text = error.to_string();
        assert!(text.contains("pool 7"));
        assert!(text.contains("pool 3"));
    }
}
