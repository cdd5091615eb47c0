//! Error types for the netbridge SDK

/// Result type for SDK conversions
pub type SdkResult<T> = Result<T, SdkError>;

/// Errors raised while decoding ABI values or descriptors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// A byte did not name a known value category
    #[error("Unknown value type: {0}")]
    UnknownValueType(u8),

    /// A category name did not parse
    #[error("Unknown value type name: '{0}'")]
    UnknownTypeName(String),

    /// An enum discriminant received from the managed side was out of range
    #[error("Invalid {kind} discriminant: {value}")]
    InvalidDiscriminant {
        /// Enum name
        kind: &'static str,
        /// Raw value received
        value: i32,
    },

    /// A descriptor was structurally invalid
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Generic ABI failure
    #[error("{0}")]
    AbiError(String),
}

impl From<String> for SdkError {
    fn from(s: String) -> Self {
        SdkError::AbiError(s)
    }
}

impl From<&str> for SdkError {
    fn from(s: &str) -> Self {
        SdkError::AbiError(s.to_string())
    }
}
