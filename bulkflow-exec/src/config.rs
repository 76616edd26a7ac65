//! Buffer pool configuration

use bulkflow_format::{FlowError, Result};
use serde::{Deserialize, Serialize};

/// Default page size (32 KiB)
pub const DEFAULT_PAGE_SIZE: usize = 32 * 1024;

/// Default number of free regions retained per size class
pub const DEFAULT_MAX_FREE_PER_CLASS: usize = 256;

/// Options for a [`BufferPool`](crate::BufferPool)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Smallest size class in bytes; every class is `page_size * 2^k`
    pub page_size: usize,
    /// Free regions kept per class before released regions are dropped
    pub max_free_per_class: usize,
    /// Upper bound on bytes held by the pool and its holders (default: none)
    pub memory_limit: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_free_per_class: DEFAULT_MAX_FREE_PER_CLASS,
            memory_limit: None,
        }
    }
}

impl PoolConfig {
    /// Default configuration with a different page size.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Check the options describe a usable pool.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(FlowError::InvalidConfig(
                "page_size must be greater than zero".to_string(),
            ));
        }
        if self.max_free_per_class == 0 {
            return Err(FlowError::InvalidConfig(
                "max_free_per_class must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
