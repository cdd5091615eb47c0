//! Netbridge SDK - ABI vocabulary for the native/managed bridge
//!
//! This crate holds the types whose byte layout is shared with the managed
//! runtime: value categories, handle-carrying structs, native strings,
//! numeric vectors, the variant container and the method descriptors that
//! plugins publish. It has no dependency on the code generator or on the
//! runtime function table, so host integrations can link against it alone.
//!
//! # Example
//!
//! ```ignore
//! use netbridge_sdk::{MethodDescriptor, ParamDescriptor, ValueType};
//!
//! let add = MethodDescriptor::new("Add", "Math.Add")
//!     .with_param(ParamDescriptor::new(ValueType::Int32))
//!     .with_param(ParamDescriptor::new(ValueType::Int32))
//!     .with_return(ParamDescriptor::new(ValueType::Int32));
//! assert_eq!(add.param_count(), 2);
//! ```

#![warn(missing_docs)]

pub mod abi;
pub mod descriptor;
pub mod error;
pub mod memory;
pub mod numerics;
pub mod raw;
pub mod string;
pub mod value_type;
pub mod variant;

pub use abi::{
    AssemblyLoadStatus, Bool32, GcCollectionMode, InternalCall, ManagedGuid, ManagedHandle,
    ManagedType, MessageLevel, TypeAccessibility,
};
pub use descriptor::{MethodDescriptor, ParamDescriptor};
pub use error::{SdkError, SdkResult};
pub use numerics::{Matrix4x4, Vector2, Vector3, Vector4};
pub use raw::{RawString, RawVector};
pub use string::NativeString;
pub use value_type::ValueType;
pub use variant::Variant;
