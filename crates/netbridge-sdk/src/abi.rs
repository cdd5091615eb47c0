//! Handle-carrying structs and enums exchanged with the managed runtime
//!
//! Every type here mirrors a managed-side declaration byte for byte. The
//! layouts are pinned by compile-time assertions at the bottom of the file.

use std::ffi::{c_char, c_void};
use std::fmt;

use crate::error::SdkError;
use crate::value_type::ValueType;

/// Opaque identifier of a managed entity (type, method, field, property, attribute)
pub type ManagedHandle = i64;

/// 32-bit boolean as marshaled by the managed runtime
pub type Bool32 = u32;

/// Convert a Rust bool to [`Bool32`]
pub fn bool32(value: bool) -> Bool32 {
    value as Bool32
}

// ============================================================================
// ManagedType
// ============================================================================

/// Value category plus by-reference flag, as reported by the managed runtime
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ManagedType {
    value_type: u8,
    is_ref: u8,
}

impl ManagedType {
    /// Build a descriptor
    pub fn new(value_type: ValueType, is_ref: bool) -> Self {
        ManagedType {
            value_type: value_type as u8,
            is_ref: is_ref as u8,
        }
    }

    /// Value category, `Invalid` if the raw byte is out of range
    pub fn value_type(&self) -> ValueType {
        ValueType::from_u8(self.value_type).unwrap_or(ValueType::Invalid)
    }

    /// Whether the value is passed by reference
    pub fn is_ref(&self) -> bool {
        self.is_ref != 0
    }
}

// ============================================================================
// ManagedGuid
// ============================================================================

/// 128-bit assembly identifier
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ManagedGuid {
    /// Low 64 bits
    pub low: u64,
    /// High 64 bits
    pub high: u64,
}

impl ManagedGuid {
    /// The empty identifier, returned by failed loads
    pub const EMPTY: ManagedGuid = ManagedGuid { low: 0, high: 0 };

    /// Build from halves
    pub const fn new(low: u64, high: u64) -> Self {
        ManagedGuid { low, high }
    }

    /// Non-empty identifiers name a loaded assembly
    pub fn is_valid(&self) -> bool {
        self.low != 0 || self.high != 0
    }
}

impl fmt::Display for ManagedGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.high, self.low)
    }
}

// ============================================================================
// InternalCall
// ============================================================================

/// One (qualified name, native pointer) binding pushed to the managed runtime
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InternalCall {
    /// NUL-terminated `"{class}@{member}, {assembly}"`
    pub name: *const c_char,
    /// Native entry point
    pub native_function: *mut c_void,
}

// ============================================================================
// Enums received as raw integers
// ============================================================================

macro_rules! abi_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:expr),* $(,)? }
    ) => {
        $(#[$meta])*
        #[repr(i32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),*
        }

        impl TryFrom<i32> for $name {
            type Error = SdkError;

            fn try_from(value: i32) -> Result<Self, SdkError> {
                match value {
                    $(v if v == $value => Ok($name::$variant),)*
                    _ => Err(SdkError::InvalidDiscriminant {
                        kind: stringify!($name),
                        value,
                    }),
                }
            }
        }
    };
}

abi_enum! {
    /// Outcome of the last assembly load request
    AssemblyLoadStatus {
        /// Loaded
        Success = 0,
        /// No file at the path
        FileNotFound = 1,
        /// File exists but could not be read
        FileLoadFailure = 2,
        /// Path was empty or malformed
        InvalidFilePath = 3,
        /// File is not a managed assembly
        InvalidAssembly = 4,
        /// Anything else
        UnknownError = 5,
    }
}

abi_enum! {
    /// Severity flags of managed log messages
    MessageLevel {
        /// Informational
        Info = 1,
        /// Warning
        Warning = 2,
        /// Error
        Error = 4,
        /// Every level
        All = 7,
    }
}

abi_enum! {
    /// Member visibility reported by reflection
    TypeAccessibility {
        /// public
        Public = 0,
        /// private
        Private = 1,
        /// protected
        Protected = 2,
        /// internal
        Internal = 3,
        /// protected internal
        ProtectedPublic = 4,
        /// private protected
        PrivateProtected = 5,
    }
}

abi_enum! {
    /// Garbage collection mode
    GcCollectionMode {
        /// Runtime default
        Default = 0,
        /// Force a collection
        Forced = 1,
        /// Let the runtime decide
        Optimized = 2,
        /// Collect as much as possible
        Aggressive = 3,
    }
}

const _: () = assert!(std::mem::size_of::<ManagedType>() == 2);
const _: () = assert!(std::mem::size_of::<ManagedGuid>() == 16);
const _: () = assert!(std::mem::size_of::<InternalCall>() == 2 * std::mem::size_of::<usize>());
const _: () = assert!(std::mem::size_of::<AssemblyLoadStatus>() == 4);
