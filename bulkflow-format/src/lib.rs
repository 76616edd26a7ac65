//! bulkflow Format - Core primitives for record interchange
//!
//! This crate provides the typed value model shared by every plugin of a
//! bulk-transfer pipeline, with no I/O dependencies. It includes:
//!
//! - Wire tag constants of the MessagePack encoding
//! - Error types
//! - Decode limits
//! - Value type tags
//! - The immutable [`Value`] sum type, [`Integer`], [`ExtensionValue`]
//! - A JSON bridge for tooling

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod limits;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use error::{FlowError, ReleaseSite, Result};
pub use limits::Limits;
pub use types::ValueType;
pub use value::{ExtensionValue, Integer, Value};
