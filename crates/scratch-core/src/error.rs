//! Error types for scratch-core

use thiserror::Error;

/// Scratch error type
#[derive(Error, Debug)]
pub enum Error {
    /// The two operands cannot be combined with `+`
    #[error("Arithmetic error: cannot add {right} to {left}")]
    Arithmetic {
        left: &'static str,
        right: &'static str,
    },

    /// Integer addition left the `i64` range
    #[error("Arithmetic error: {left} + {right} overflows a 64-bit integer")]
    IntegerOverflow { left: i64, right: i64 },

    /// A map-only operation hit a non-map value, or the other way round
    #[error("Type mismatch for key {key:?}: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl Error {
    /// True for errors raised while adding two values
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Error::Arithmetic { .. } | Error::IntegerOverflow { .. })
    }

    /// True for map/non-map shape conflicts
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. })
    }

    pub(crate) fn type_mismatch(key: &str, expected: &'static str, found: &'static str) -> Self {
        Error::TypeMismatch {
            key: key.to_string(),
            expected,
            found,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// Errors cross thread boundaries together with the store.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
