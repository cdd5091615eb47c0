use std::ffi::c_void;
use std::fmt;
use std::ptr;

use netbridge_sdk::string::ScopedString;
use netbridge_sdk::ManagedHandle;

use super::{MethodInfo, Type};
use crate::runtime::Runtime;

/// A live managed instance created through the bridge.
///
/// The instance is pinned by the runtime until [`ManagedObject::destroy`] is
/// called. Destroying twice is a no-op; every call on a destroyed object is
/// skipped.
pub struct ManagedObject {
    ty: Type,
    handle: *mut c_void,
}

// Safety: the handle is an opaque GC handle owned by this value; the runtime
// accepts it from any thread.
unsafe impl Send for ManagedObject {}
unsafe impl Sync for ManagedObject {}

impl ManagedObject {
    pub(crate) fn new(ty: Type, handle: *mut c_void) -> Self {
        ManagedObject { ty, handle }
    }

    /// Raw GC handle
    pub fn handle(&self) -> *mut c_void {
        self.handle
    }

    /// `false` once destroyed or if creation failed
    pub fn is_valid(&self) -> bool {
        !self.handle.is_null()
    }

    /// Class of the instance
    pub fn object_type(&self) -> &Type {
        &self.ty
    }

    fn runtime(&self) -> &Runtime {
        self.ty.runtime()
    }

    /// Invoke an instance method by name. Returns `false` if there is no such method.
    pub fn invoke_method(&self, name: &str, args: &[*const c_void]) -> bool {
        let method = self.ty.method(name);
        if !method.is_valid() {
            return false;
        }
        self.invoke_method_info(&method, args);
        true
    }

    /// Invoke an instance method by name, writing its result into `ret`
    pub fn invoke_method_ret(&self, name: &str, args: &[*const c_void], ret: *mut c_void) -> bool {
        let method = self.ty.method(name);
        if !method.is_valid() {
            return false;
        }
        self.invoke_method_info_ret(&method, args, ret);
        true
    }

    /// Invoke a resolved instance method
    pub fn invoke_method_info(&self, method: &MethodInfo, args: &[*const c_void]) {
        if !self.is_valid() {
            return;
        }
        unsafe {
            (self.runtime().invoke_method)(
                self.handle,
                method.handle(),
                args.as_ptr(),
                args.len() as i32,
            )
        }
    }

    /// Invoke a resolved instance method, writing its result into `ret`
    pub fn invoke_method_info_ret(&self, method: &MethodInfo, args: &[*const c_void], ret: *mut c_void) {
        if !self.is_valid() {
            return;
        }
        unsafe {
            (self.runtime().invoke_method_ret)(
                self.handle,
                method.handle(),
                args.as_ptr(),
                args.len() as i32,
                ret,
            )
        }
    }

    /// Store `value` into a field. `T` must match the field's marshaled layout.
    pub fn set_field_value<T>(&self, name: &str, value: &T) {
        if !self.is_valid() {
            return;
        }
        let name = ScopedString::new(name);
        unsafe {
            (self.runtime().set_field_value)(self.handle, name.get(), value as *const T as *mut c_void)
        }
    }

    /// Read a field over a default `T`
    pub fn field_value<T: Copy + Default>(&self, name: &str) -> T {
        let mut value = T::default();
        if self.is_valid() {
            let name = ScopedString::new(name);
            unsafe {
                (self.runtime().get_field_value)(
                    self.handle,
                    name.get(),
                    &mut value as *mut T as *mut c_void,
                )
            }
        }
        value
    }

    /// Address of a field inside the pinned instance; null if unknown
    pub fn field_pointer(&self, name: &str) -> *mut c_void {
        let mut address = ptr::null_mut();
        if self.is_valid() {
            let name = ScopedString::new(name);
            unsafe { (self.runtime().get_field_pointer)(self.handle, name.get(), &mut address) }
        }
        address
    }

    /// Assign a property. `T` must match the property's marshaled layout.
    pub fn set_property_value<T>(&self, name: &str, value: &T) {
        if !self.is_valid() {
            return;
        }
        let name = ScopedString::new(name);
        unsafe {
            (self.runtime().set_property_value)(
                self.handle,
                name.get(),
                value as *const T as *mut c_void,
            )
        }
    }

    /// Read a property over a default `T`
    pub fn property_value<T: Copy + Default>(&self, name: &str) -> T {
        let mut value = T::default();
        if self.is_valid() {
            let name = ScopedString::new(name);
            unsafe {
                (self.runtime().get_property_value)(
                    self.handle,
                    name.get(),
                    &mut value as *mut T as *mut c_void,
                )
            }
        }
        value
    }

    /// Release the instance. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.handle.is_null() {
            return;
        }
        unsafe { (self.runtime().destroy_object)(self.handle) };
        self.handle = ptr::null_mut();
    }
}

/// Invoke a managed delegate by handle, discarding its result
pub fn invoke_delegate(runtime: &Runtime, delegate: ManagedHandle, args: &[*const c_void]) {
    unsafe { (runtime.invoke_delegate)(delegate, args.as_ptr(), args.len() as i32) }
}

/// Invoke a managed delegate by handle, writing its result into `ret`
pub fn invoke_delegate_ret(
    runtime: &Runtime,
    delegate: ManagedHandle,
    args: &[*const c_void],
    ret: *mut c_void,
) {
    unsafe { (runtime.invoke_delegate_ret)(delegate, args.as_ptr(), args.len() as i32, ret) }
}

impl fmt::Debug for ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedObject")
            .field("type", &self.ty)
            .field("handle", &self.handle)
            .finish()
    }
}
