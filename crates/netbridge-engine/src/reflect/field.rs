use std::fmt;

use netbridge_sdk::{ManagedHandle, TypeAccessibility};

use super::{out_handle, size_then_fill, take_string, wrap_all, Attribute, Type};
use crate::runtime::Runtime;

/// Proxy for a managed `System.Reflection.FieldInfo`
#[derive(Clone)]
pub struct FieldInfo {
    runtime: Runtime,
    handle: ManagedHandle,
}

impl FieldInfo {
    pub(crate) fn new(runtime: Runtime, handle: ManagedHandle) -> Self {
        FieldInfo { runtime, handle }
    }

    /// Raw handle
    pub fn handle(&self) -> ManagedHandle {
        self.handle
    }

    /// `false` for the null handle
    pub fn is_valid(&self) -> bool {
        self.handle != 0
    }

    /// Field name
    pub fn name(&self) -> String {
        take_string(unsafe { (self.runtime.get_field_info_name)(self.handle) })
    }

    /// Declared field type
    pub fn field_type(&self) -> Type {
        let handle = out_handle(|out| unsafe { (self.runtime.get_field_info_type)(self.handle, out) });
        Type::new(self.runtime.clone(), handle)
    }

    /// Declared visibility; `None` if the runtime reports an unknown value
    pub fn accessibility(&self) -> Option<TypeAccessibility> {
        let raw = unsafe { (self.runtime.get_field_info_accessibility)(self.handle) };
        TypeAccessibility::try_from(raw).ok()
    }

    /// Attributes applied to the field
    pub fn attributes(&self) -> Vec<Attribute> {
        let handles = size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_field_info_attributes)(self.handle, buffer, count)
        });
        wrap_all(&self.runtime, handles, Attribute::new)
    }
}

impl PartialEq for FieldInfo {
    fn eq(&self, other: &FieldInfo) -> bool {
        self.handle == other.handle
    }
}

impl Eq for FieldInfo {}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldInfo").field(&self.handle).finish()
    }
}
