use std::ffi::c_void;
use std::fmt;

use netbridge_sdk::string::ScopedString;
use netbridge_sdk::ManagedHandle;

use super::{out_handle, Type};
use crate::runtime::Runtime;

/// Proxy for an applied custom attribute instance
#[derive(Clone)]
pub struct Attribute {
    runtime: Runtime,
    handle: ManagedHandle,
}

impl Attribute {
    pub(crate) fn new(runtime: Runtime, handle: ManagedHandle) -> Self {
        Attribute { runtime, handle }
    }

    /// Raw handle
    pub fn handle(&self) -> ManagedHandle {
        self.handle
    }

    /// `false` for the null handle
    pub fn is_valid(&self) -> bool {
        self.handle != 0
    }

    /// Attribute class
    pub fn attribute_type(&self) -> Type {
        let handle = out_handle(|out| unsafe { (self.runtime.get_attribute_type)(self.handle, out) });
        Type::new(self.runtime.clone(), handle)
    }

    /// Read a field of the attribute instance.
    ///
    /// The runtime writes the field's value over a default `T`; `T` must have
    /// the layout of the field's marshaled form.
    pub fn field_value<T: Copy + Default>(&self, name: &str) -> T {
        let mut value = T::default();
        let name = ScopedString::new(name);
        unsafe {
            (self.runtime.get_attribute_field_value)(
                self.handle,
                name.get(),
                &mut value as *mut T as *mut c_void,
            )
        };
        value
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Attribute) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Attribute {}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Attribute").field(&self.handle).finish()
    }
}
