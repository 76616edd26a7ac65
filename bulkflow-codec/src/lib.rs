//! bulkflow codec - MessagePack encoder/decoder for typed values
//!
//! This crate moves [`Value`] trees to and from their wire form:
//!
//! - Smallest-encoding writer over any [`bytes::BufMut`]
//! - Bounded, streaming reader over byte slices
//! - Exact encoded-size computation for pre-sizing pooled buffers

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod decoder;
pub mod encoder;

// Re-export commonly used types
pub use bulkflow_format::{FlowError, Limits, Result, Value, ValueType};

// Re-export our own types
pub use decoder::{decode, decode_all, Decoder};
pub use encoder::{encode, encode_to_slice, encode_to_vec, encoded_len};
