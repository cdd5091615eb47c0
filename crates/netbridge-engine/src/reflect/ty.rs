use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};

use netbridge_sdk::abi::bool32;
use netbridge_sdk::{ManagedHandle, ManagedType, NativeString};
use once_cell::sync::OnceCell;

use super::{
    lookup_by_name, out_handle, size_then_fill, take_string, wrap_all, Attribute, FieldInfo,
    ManagedObject, MethodInfo, PropertyInfo,
};
use crate::runtime::Runtime;

/// Proxy for a managed `System.Type`
pub struct Type {
    runtime: Runtime,
    handle: ManagedHandle,
    base_type: OnceCell<Box<Type>>,
    element_type: OnceCell<Box<Type>>,
    managed_type: OnceCell<ManagedType>,
}

impl Type {
    pub(crate) fn new(runtime: Runtime, handle: ManagedHandle) -> Self {
        Type {
            runtime,
            handle,
            base_type: OnceCell::new(),
            element_type: OnceCell::new(),
            managed_type: OnceCell::new(),
        }
    }

    /// An invalid proxy bound to `runtime`
    pub fn invalid(runtime: Runtime) -> Self {
        Type::new(runtime, 0)
    }

    /// Look a type up by (assembly-qualified) name; invalid if unknown
    pub fn find(runtime: &Runtime, name: &str) -> Self {
        let handle = lookup_by_name(name, |name, out| unsafe { (runtime.get_type)(name, out) });
        Type::new(runtime.clone(), handle)
    }

    /// Raw handle
    pub fn handle(&self) -> ManagedHandle {
        self.handle
    }

    /// `false` for the null handle
    pub fn is_valid(&self) -> bool {
        self.handle != 0
    }

    pub(crate) fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Namespace-qualified name, e.g. `System.Collections.Generic.List`1`
    pub fn full_name(&self) -> String {
        take_string(unsafe { (self.runtime.get_full_type_name)(self.handle) })
    }

    /// Name including the assembly, as accepted by `Type.GetType`
    pub fn assembly_qualified_name(&self) -> String {
        take_string(unsafe { (self.runtime.get_assembly_qualified_name)(self.handle) })
    }

    /// Direct base type, resolved once
    pub fn base_type(&self) -> &Type {
        self.base_type.get_or_init(|| {
            let handle = out_handle(|out| unsafe { (self.runtime.get_base_type)(self.handle, out) });
            Box::new(Type::new(self.runtime.clone(), handle))
        })
    }

    /// Element type of arrays and by-ref types, resolved once
    pub fn element_type(&self) -> &Type {
        self.element_type.get_or_init(|| {
            let handle =
                out_handle(|out| unsafe { (self.runtime.get_element_type)(self.handle, out) });
            Box::new(Type::new(self.runtime.clone(), handle))
        })
    }

    /// Size of an instance in bytes
    pub fn size(&self) -> i32 {
        unsafe { (self.runtime.get_type_size)(self.handle) }
    }

    /// `true` if this type derives from `other`
    pub fn is_subclass_of(&self, other: &Type) -> bool {
        unsafe { (self.runtime.is_type_subclass_of)(self.handle, other.handle) != 0 }
    }

    /// `true` if a value of this type can be stored in `other`
    pub fn is_assignable_to(&self, other: &Type) -> bool {
        unsafe { (self.runtime.is_type_assignable_to)(self.handle, other.handle) != 0 }
    }

    /// `true` if a value of `other` can be stored in this type
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        unsafe { (self.runtime.is_type_assignable_from)(self.handle, other.handle) != 0 }
    }

    /// Single-dimension zero-based array
    pub fn is_sz_array(&self) -> bool {
        unsafe { (self.runtime.is_type_sz_array)(self.handle) != 0 }
    }

    /// By-reference type (`T&`)
    pub fn is_by_ref(&self) -> bool {
        unsafe { (self.runtime.is_type_by_ref)(self.handle) != 0 }
    }

    /// Reference type
    pub fn is_class(&self) -> bool {
        unsafe { (self.runtime.is_class)(self.handle) }
    }

    /// Enumeration
    pub fn is_enum(&self) -> bool {
        unsafe { (self.runtime.is_enum)(self.handle) }
    }

    /// Value type
    pub fn is_value_type(&self) -> bool {
        unsafe { (self.runtime.is_value_type)(self.handle) }
    }

    /// Marshaling category of this type, resolved once
    pub fn managed_type(&self) -> ManagedType {
        *self
            .managed_type
            .get_or_init(|| unsafe { (self.runtime.get_type_managed_type)(self.handle) })
    }

    /// Every method
    pub fn methods(&self) -> Vec<MethodInfo> {
        let handles = size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_type_methods)(self.handle, buffer, count)
        });
        wrap_all(&self.runtime, handles, MethodInfo::new)
    }

    /// Every field
    pub fn fields(&self) -> Vec<FieldInfo> {
        let handles = size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_type_fields)(self.handle, buffer, count)
        });
        wrap_all(&self.runtime, handles, FieldInfo::new)
    }

    /// Every property
    pub fn properties(&self) -> Vec<PropertyInfo> {
        let handles = size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_type_properties)(self.handle, buffer, count)
        });
        wrap_all(&self.runtime, handles, PropertyInfo::new)
    }

    /// Method by name; invalid if there is none
    pub fn method(&self, name: &str) -> MethodInfo {
        let handle = lookup_by_name(name, |name, out| unsafe {
            (self.runtime.get_type_method)(self.handle, name, out)
        });
        MethodInfo::new(self.runtime.clone(), handle)
    }

    /// Field by name; invalid if there is none
    pub fn field(&self, name: &str) -> FieldInfo {
        let handle = lookup_by_name(name, |name, out| unsafe {
            (self.runtime.get_type_field)(self.handle, name, out)
        });
        FieldInfo::new(self.runtime.clone(), handle)
    }

    /// Property by name; invalid if there is none
    pub fn property(&self, name: &str) -> PropertyInfo {
        let handle = lookup_by_name(name, |name, out| unsafe {
            (self.runtime.get_type_property)(self.handle, name, out)
        });
        PropertyInfo::new(self.runtime.clone(), handle)
    }

    /// `true` if an attribute of `attribute_type` is applied to this type
    pub fn has_attribute(&self, attribute_type: &Type) -> bool {
        unsafe { (self.runtime.has_type_attribute)(self.handle, attribute_type.handle) != 0 }
    }

    /// Applied attributes
    pub fn attributes(&self) -> Vec<Attribute> {
        let handles = size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_type_attributes)(self.handle, buffer, count)
        });
        wrap_all(&self.runtime, handles, Attribute::new)
    }

    /// Names of an enum's members, in declaration order
    pub fn enum_names(&self) -> Vec<String> {
        size_then_fill::<NativeString>(|buffer, count| unsafe {
            (self.runtime.get_enum_names)(self.handle, buffer, count)
        })
        .into_iter()
        .map(take_string)
        .collect()
    }

    /// Values of an enum's members, in declaration order
    pub fn enum_values(&self) -> Vec<i32> {
        size_then_fill(|buffer, count| unsafe {
            (self.runtime.get_enum_values)(self.handle, buffer, count)
        })
    }

    /// Construct an instance with constructor arguments.
    ///
    /// Each entry of `args` points at one argument's storage.
    pub fn create_instance(&self, args: &[*const c_void]) -> ManagedObject {
        let object = unsafe {
            (self.runtime.create_object)(self.handle, bool32(false), args.as_ptr(), args.len() as i32)
        };
        ManagedObject::new(self.clone(), object)
    }

    /// Invoke a static method, discarding its result
    pub fn invoke_static_method(&self, method: &MethodInfo, args: &[*const c_void]) {
        self.invoke_static_method_raw(method.handle(), args, None);
    }

    /// Invoke a static method, writing its result into `ret`
    pub fn invoke_static_method_ret(
        &self,
        method: &MethodInfo,
        args: &[*const c_void],
        ret: *mut c_void,
    ) {
        self.invoke_static_method_raw(method.handle(), args, Some(ret));
    }

    pub(crate) fn invoke_static_method_raw(
        &self,
        method: ManagedHandle,
        args: &[*const c_void],
        ret: Option<*mut c_void>,
    ) {
        invoke_static(&self.runtime, self.handle, method, args, ret);
    }
}

/// Invoke a static method by raw handles
pub(crate) fn invoke_static(
    runtime: &Runtime,
    type_handle: ManagedHandle,
    method: ManagedHandle,
    args: &[*const c_void],
    ret: Option<*mut c_void>,
) {
    let count = args.len() as i32;
    unsafe {
        match ret {
            Some(ret) => {
                (runtime.invoke_static_method_ret)(type_handle, method, args.as_ptr(), count, ret)
            }
            None => (runtime.invoke_static_method)(type_handle, method, args.as_ptr(), count),
        }
    }
}

impl Clone for Type {
    /// Clones share the handle but start with empty caches
    fn clone(&self) -> Self {
        Type::new(self.runtime.clone(), self.handle)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Type) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Type").field(&self.handle).finish()
    }
}
