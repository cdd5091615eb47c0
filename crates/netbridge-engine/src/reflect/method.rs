use std::ffi::c_void;
use std::fmt;

use netbridge_sdk::{ManagedHandle, TypeAccessibility};
use once_cell::sync::OnceCell;

use super::{out_handle, size_then_fill, take_string, wrap_all, Attribute, Type};
use crate::runtime::Runtime;

/// Proxy for a managed `System.Reflection.MethodInfo`
pub struct MethodInfo {
    runtime: Runtime,
    handle: ManagedHandle,
    return_type: OnceCell<Type>,
    parameter_types: OnceCell<Vec<Type>>,
}

impl MethodInfo {
    pub(crate) fn new(runtime: Runtime, handle: ManagedHandle) -> Self {
        MethodInfo {
            runtime,
            handle,
            return_type: OnceCell::new(),
            parameter_types: OnceCell::new(),
        }
    }

    /// Raw handle
    pub fn handle(&self) -> ManagedHandle {
        self.handle
    }

    /// `false` for the null handle
    pub fn is_valid(&self) -> bool {
        self.handle != 0
    }

    /// Method name
    pub fn name(&self) -> String {
        take_string(unsafe { (self.runtime.get_method_info_name)(self.handle) })
    }

    /// Native-callable entry point of the method
    pub fn function_address(&self) -> *mut c_void {
        unsafe { (self.runtime.get_method_info_function_address)(self.handle) }
    }

    /// Return type, resolved once
    pub fn return_type(&self) -> &Type {
        self.return_type.get_or_init(|| {
            let handle = out_handle(|out| unsafe {
                (self.runtime.get_method_info_return_type)(self.handle, out)
            });
            Type::new(self.runtime.clone(), handle)
        })
    }

    /// Parameter types in declaration order, resolved once
    pub fn parameter_types(&self) -> &[Type] {
        self.parameter_types.get_or_init(|| {
            let handles = size_then_fill(|buffer, count| unsafe {
                (self.runtime.get_method_info_parameter_types)(self.handle, buffer, count)
            });
            wrap_all(&self.runtime, handles, Type::new)
        })
    }

    /// Declared visibility; `None` if the runtime reports an unknown value
    pub fn accessibility(&self) -> Option<TypeAccessibility> {
        let raw = unsafe { (self.runtime.get_method_info_accessibility)(self.handle) };
        TypeAccessibility::try_from(raw).ok()
    }

    /// Attributes applied to the method
    pub fn attributes(&self) -> Vec<Attribute> {
        let handles = size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_method_info_attributes)(self.handle, buffer, count)
        });
        wrap_all(&self.runtime, handles, Attribute::new)
    }

    /// Attributes applied to parameter `index`
    pub fn parameter_attributes(&self, index: i32) -> Vec<Attribute> {
        let handles = size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_method_info_parameter_attributes)(self.handle, index, buffer, count)
        });
        wrap_all(&self.runtime, handles, Attribute::new)
    }

    /// Attributes applied to the return value
    pub fn return_attributes(&self) -> Vec<Attribute> {
        let handles = size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_method_info_return_attributes)(self.handle, buffer, count)
        });
        wrap_all(&self.runtime, handles, Attribute::new)
    }
}

impl Clone for MethodInfo {
    fn clone(&self) -> Self {
        MethodInfo::new(self.runtime.clone(), self.handle)
    }
}

impl PartialEq for MethodInfo {
    fn eq(&self, other: &MethodInfo) -> bool {
        self.handle == other.handle
    }
}

impl Eq for MethodInfo {}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MethodInfo").field(&self.handle).finish()
    }
}
