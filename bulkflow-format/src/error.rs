//! Error types for bulkflow

use std::fmt;
use std::panic::Location;

use thiserror::Error;

use crate::types::ValueType;
use crate::value::Integer;

/// Source location of the call that released a buffer.
///
/// Captured with `#[track_caller]` at the winning release so a later
/// double release can point back at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseSite(&'static Location<'static>);

impl ReleaseSite {
    /// Capture the location of the caller.
    #[track_caller]
    pub fn caller() -> Self {
        ReleaseSite(Location::caller())
    }

    /// Wrap an already captured location.
    pub fn from_location(location: &'static Location<'static>) -> Self {
        ReleaseSite(location)
    }

    /// File containing the release call.
    pub fn file(&self) -> &'static str {
        self.0.file()
    }

    /// Line of the release call.
    pub fn line(&self) -> u32 {
        self.0.line()
    }
}

impl fmt::Display for ReleaseSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.0.file(), self.0.line(), self.0.column())
    }
}

/// bulkflow error types
#[derive(Debug, Error)]
pub enum FlowError {
    /// Backing memory could not supply a region of the requested size.
    #[error("Out of memory: could not allocate {requested} bytes")]
    OutOfMemory {
        /// Size class that could not be reserved.
        requested: usize,
    },
    /// A buffer handle was released more than once.
    #[error("Buffer released twice; first released at {first_release}")]
    DoubleRelease {
        /// Where the buffer was released the first time.
        first_release: ReleaseSite,
    },
    /// A buffer handle was accessed after it was released.
    #[error("Buffer used after release; released at {first_release}")]
    UseAfterRelease {
        /// Where the buffer was released.
        first_release: ReleaseSite,
    },
    /// A shared buffer region is already borrowed by a conflicting read or write.
    #[error("Buffer busy: region is borrowed by a conflicting read or write")]
    BufferBusy,
    /// A checked narrowing conversion found the value out of range.
    #[error("Integer overflow: {0} does not fit in the requested type")]
    IntegerOverflow(Integer),
    /// A variant accessor was called on a value of another variant.
    #[error("Wrong variant: expected {expected}, found {actual}")]
    WrongVariant {
        /// Variant the accessor requires.
        expected: ValueType,
        /// Variant the value actually holds.
        actual: ValueType,
    },
    /// Wire bytes do not form a valid value.
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),
    /// Encountered unexpected end of input.
    #[error("Unexpected end of input")]
    UnexpectedEof,
    /// A configured limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    /// Destination does not have room for the bytes being written.
    #[error("Capacity exceeded: need {needed} bytes, {available} available")]
    CapacityExceeded {
        /// Bytes required by the write.
        needed: usize,
        /// Bytes the destination can still take.
        available: usize,
    },
    /// Configuration value is out of its valid domain.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// No registered plugin source knows the requested plugin.
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),
    /// I/O operation failed while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    /// True for failures caused by bytes that are not a valid encoding.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            FlowError::MalformedEncoding(_) | FlowError::UnexpectedEof
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_site_display() {
        let site = ReleaseSite::caller();
        let rendered = site.to_string();
        assert!(rendered.starts_with(site.file()));
        assert!(rendered.contains(&format!(":{}:", site.line())));
    }

    #[test]
    fn test_error_messages() {
        let err = FlowError::IntegerOverflow(Integer::from(128i64));
        assert_eq!(
            err.to_string(),
            "Integer overflow: 128 does not fit in the requested type"
        );

        let err = FlowError::WrongVariant {
            expected: ValueType::String,
            actual: ValueType::Integer,
        };
        assert_eq!(err.to_string(), "Wrong variant: expected string, found integer");

        assert!(FlowError::BufferBusy.to_string().starts_with("Buffer busy"));
    }

    #[test]
    fn test_is_malformed() {
        assert!(FlowError::UnexpectedEof.is_malformed());
        assert!(FlowError::MalformedEncoding("tag 0xc1".to_string()).is_malformed());
        assert!(!FlowError::LimitExceeded("depth".to_string()).is_malformed());
    }
}
