//! Error types for the cache library.

use thiserror::Error;

/// Errors returned to callers of the cache.
///
/// Every variant describes an invalid request, and none of them are
/// transient, so there is nothing to retry. Broken internal bookkeeping is
/// deliberately not represented here: it panics instead (see the partition
/// docs), so hosts can tell "this request was invalid" apart from "the
/// cache's accounting is defective".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    /// A partition with this name is already registered.
    #[error("partition '{0}' already exists")]
    DuplicateName(String),

    /// No partition is registered under this name.
    #[error("partition '{0}' is not registered")]
    PartitionNotFound(String),

    /// Width or height was supplied to a store on a partition created
    /// without size awareness.
    #[error("partition '{0}' is not size-aware, store must omit width and height")]
    ConfigurationMismatch(String),

    /// A supplied width or height was negative (or NaN).
    #[error("width and height must be non-negative, got width={width:?} height={height:?}")]
    InvalidDimension {
        width: Option<f64>,
        height: Option<f64>,
    },

    /// Exactly one of width/height was supplied; a size variant is addressed
    /// by both dimensions or by neither.
    #[error("width and height must be supplied together, got width={width:?} height={height:?}")]
    InvalidRequest {
        width: Option<f64>,
        height: Option<f64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_partition() {
        let err = CacheError::PartitionNotFound("avatars".to_string());
        assert_eq!(err.to_string(), "partition 'avatars' is not registered");
    }

    #[test]
    fn test_display_includes_offending_dimensions() {
        let err = CacheError::InvalidDimension {
            width: Some(-3.0),
            height: Some(10.0),
        };
        assert!(err.to_string().contains("-3.0"));
    }

    #[test]
    fn test_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<CacheError>();
    }
}
