use std::fmt;

use netbridge_sdk::ManagedHandle;

use super::{out_handle, size_then_fill, take_string, wrap_all, Attribute, Type};
use crate::runtime::Runtime;

/// Proxy for a managed `System.Reflection.PropertyInfo`
#[derive(Clone)]
pub struct PropertyInfo {
    runtime: Runtime,
    handle: ManagedHandle,
}

impl PropertyInfo {
    pub(crate) fn new(runtime: Runtime, handle: ManagedHandle) -> Self {
        PropertyInfo { runtime, handle }
    }

    /// Raw handle
    pub fn handle(&self) -> ManagedHandle {
        self.handle
    }

    /// `false` for the null handle
    pub fn is_valid(&self) -> bool {
        self.handle != 0
    }

    /// Property name
    pub fn name(&self) -> String {
        take_string(unsafe { (self.runtime.get_property_info_name)(self.handle) })
    }

    /// Declared property type
    pub fn property_type(&self) -> Type {
        let handle =
            out_handle(|out| unsafe { (self.runtime.get_property_info_type)(self.handle, out) });
        Type::new(self.runtime.clone(), handle)
    }

    /// Attributes applied to the property
    pub fn attributes(&self) -> Vec<Attribute> {
        let handles = size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_property_info_attributes)(self.handle, buffer, count)
        });
        wrap_all(&self.runtime, handles, Attribute::new)
    }
}

impl PartialEq for PropertyInfo {
    fn eq(&self, other: &PropertyInfo) -> bool {
        self.handle == other.handle
    }
}

impl Eq for PropertyInfo {}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyInfo").field(&self.handle).finish()
    }
}
