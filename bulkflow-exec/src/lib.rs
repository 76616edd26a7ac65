//! bulkflow Exec - Execution-time resources for pipeline plugins
//!
//! This crate provides the process-scoped services plugins draw on while a
//! transfer runs:
//!
//! - Size-classed buffer pool with exclusive [`Buffer`] handles
//! - [`SharedBuffer`] for hand-off with runtime double-release detection
//! - Per-run temporary directories
//! - Plugin lookup through ordered sources

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod config;
pub mod plugin;
pub mod pool;
pub mod temp_space;

// Re-export commonly used types
pub use bulkflow_format::{FlowError, ReleaseSite, Result};

// Re-export our own types
pub use buffer::{Buffer, SharedBuffer};
pub use config::PoolConfig;
pub use plugin::{PluginId, PluginKind, PluginRegistry, PluginSource, StaticPluginSource};
pub use pool::{BufferPool, PoolStats};
pub use temp_space::{TempSpace, TempSpaceAllocator};
