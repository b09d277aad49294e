//! Structured composite keys for cache entries.
//!
//! A stored payload is addressed by its logical key plus an optional size
//! qualifier. Keeping the qualifier as a typed field (instead of encoding it
//! into the key string) means variant scans and renames compare fields, with
//! no separator to collide with key content.

use std::hash::{Hash, Hasher};

use crate::error::CacheError;

/// Requested rendering dimensions of an image variant.
///
/// Compared and hashed bitwise so it can key a map: two requests address the
/// same variant only when their bit patterns agree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dimensions {
    width: f64,
    height: f64,
}

impl Dimensions {
    /// Validate a width/height pair from the public call surface.
    ///
    /// Negative or NaN values are invalid dimensions. Supplying only one of
    /// the pair is an invalid request: a variant is addressed by both
    /// dimensions or by neither.
    pub(crate) fn resolve(
        width: Option<f64>,
        height: Option<f64>,
    ) -> Result<Option<Self>, CacheError> {
        for value in [width, height].into_iter().flatten() {
            if !(value >= 0.0) {
                return Err(CacheError::InvalidDimension { width, height });
            }
        }

        match (width, height) {
            (Some(width), Some(height)) => Ok(Some(Self { width, height })),
            (None, None) => Ok(None),
            _ => Err(CacheError::InvalidRequest { width, height }),
        }
    }
}

impl PartialEq for Dimensions {
    fn eq(&self, other: &Self) -> bool {
        self.width.to_bits() == other.width.to_bits()
            && self.height.to_bits() == other.height.to_bits()
    }
}

impl Eq for Dimensions {}

impl Hash for Dimensions {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.to_bits().hash(state);
        self.height.to_bits().hash(state);
    }
}

/// Composite key: a logical image key plus the optional size qualifier.
///
/// Entries stored without dimensions live under `dims: None`; on a partition
/// that is not size-aware, every entry lives there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EntryKey {
    logical: String,
    dims: Option<Dimensions>,
}

impl EntryKey {
    pub(crate) fn new(logical: &str, dims: Option<Dimensions>) -> Self {
        Self {
            logical: logical.to_string(),
            dims,
        }
    }

    pub(crate) fn logical(&self) -> &str {
        &self.logical
    }

    /// The same size qualifier under a different logical key.
    pub(crate) fn with_logical(&self, logical: &str) -> Self {
        Self {
            logical: logical.to_string(),
            dims: self.dims,
        }
    }
}
