//! Extension values

/// Application-defined value: a signed type code plus opaque payload.
///
/// Negative type codes are reserved by the wire format for predefined
/// types such as timestamps; they are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionValue {
    /// Type code
    pub type_code: i8,
    /// Payload bytes
    pub data: Vec<u8>,
}

impl ExtensionValue {
    /// Create an extension value.
    pub fn new(type_code: i8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            type_code,
            data: data.into(),
        }
    }

    /// Payload rendered as lowercase hex.
    pub fn data_hex(&self) -> String {
        super::json::to_hex(&self.data)
    }
}
