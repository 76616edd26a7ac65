//! Decode limits and configuration

/// Limits applied while decoding untrusted wire bytes
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum nesting depth of arrays, maps (default: 512)
    pub max_depth: usize,
    /// Maximum element count of one array (default: 16 Mi)
    pub max_array_len: usize,
    /// Maximum entry count of one map (default: 16 Mi)
    pub max_map_len: usize,
    /// Maximum byte length of one string (default: 64 MiB)
    pub max_string_len: usize,
    /// Maximum byte length of one binary (default: 64 MiB)
    pub max_binary_len: usize,
    /// Maximum payload length of one extension (default: 64 MiB)
    pub max_extension_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_array_len: 16 * 1024 * 1024,
            max_map_len: 16 * 1024 * 1024,
            max_string_len: 64 * 1024 * 1024,
            max_binary_len: 64 * 1024 * 1024,
            max_extension_len: 64 * 1024 * 1024,
        }
    }
}
