//! The managed runtime's entry points
//!
//! The host fills a [`RawFunctionTable`] with pointers obtained from the
//! runtime. Field order is ABI: it matches the managed-side declaration
//! group by group. [`RawFunctionTable::bind`] checks that every entry is
//! present and produces a [`FunctionTable`] whose entries can be called
//! without further checks.

use std::ffi::c_void;

use netbridge_sdk::{Bool32, InternalCall, ManagedGuid, ManagedHandle, ManagedType, NativeString};

use crate::error::InitError;

/// Managed log sink installed through `Initialize`
pub type MessageCallback = unsafe extern "C" fn(message: NativeString, level: i32);

/// Managed exception sink installed through `Initialize`
pub type ExceptionCallback = unsafe extern "C" fn(message: NativeString);

macro_rules! function_table {
    (
        $(
            $(#[$group:meta])*
            $field:ident => $name:literal : fn($($arg:ty),* $(,)?) $(-> $ret:ty)?;
        )*
    ) => {
        /// Function table as filled by the host; entries may be missing
        #[repr(C)]
        #[derive(Clone, Copy)]
        pub struct RawFunctionTable {
            $(
                $(#[$group])*
                #[doc = concat!("`", $name, "` entry")]
                pub $field: Option<unsafe extern "C" fn($($arg),*) $(-> $ret)?>,
            )*
        }

        impl RawFunctionTable {
            /// A table with every entry missing
            pub const fn empty() -> Self {
                RawFunctionTable { $($field: None,)* }
            }

            /// Names of the entries that are still missing
            pub fn missing(&self) -> Vec<&'static str> {
                let mut missing = Vec::new();
                $(
                    if self.$field.is_none() {
                        missing.push($name);
                    }
                )*
                missing
            }

            /// Check every entry and produce a callable table.
            ///
            /// A partially filled table is rejected with the first missing entry.
            pub fn bind(&self) -> Result<FunctionTable, InitError> {
                Ok(FunctionTable {
                    $($field: self.$field.ok_or(InitError::MissingEntry($name))?,)*
                })
            }
        }

        /// Function table with every entry present
        #[derive(Clone, Copy)]
        pub struct FunctionTable {
            $(
                #[doc = concat!("`", $name, "` entry")]
                pub $field: unsafe extern "C" fn($($arg),*) $(-> $ret)?,
            )*
        }

        /// Number of entries in the table
        pub const FUNCTION_TABLE_LEN: usize = [$($name),*].len();
    };
}

function_table! {
    // Lifecycle
    initialize => "Initialize": fn(MessageCallback, ExceptionCallback);
    shutdown => "Shutdown": fn();

    // Assemblies
    set_internal_calls => "SetInternalCalls": fn(*const InternalCall, i32, Bool32);
    load_managed_assembly => "LoadManagedAssembly": fn(NativeString, Bool32, Bool32) -> ManagedGuid;
    unload_managed_assembly => "UnloadManagedAssembly": fn(ManagedGuid) -> Bool32;
    get_last_load_status => "GetLastLoadStatus": fn() -> i32;
    get_assembly_name => "GetAssemblyName": fn(ManagedGuid) -> NativeString;

    // Garbage collector
    collect_garbage => "CollectGarbage": fn(i32, i32, Bool32, Bool32);
    wait_for_pending_finalizers => "WaitForPendingFinalizers": fn();

    // Objects
    create_object => "CreateObject": fn(ManagedHandle, Bool32, *const *const c_void, i32) -> *mut c_void;
    invoke_method => "InvokeMethod": fn(*mut c_void, ManagedHandle, *const *const c_void, i32);
    invoke_method_ret => "InvokeMethodRet": fn(*mut c_void, ManagedHandle, *const *const c_void, i32, *mut c_void);
    invoke_static_method => "InvokeStaticMethod": fn(ManagedHandle, ManagedHandle, *const *const c_void, i32);
    invoke_static_method_ret => "InvokeStaticMethodRet": fn(ManagedHandle, ManagedHandle, *const *const c_void, i32, *mut c_void);
    invoke_delegate => "InvokeDelegate": fn(ManagedHandle, *const *const c_void, i32);
    invoke_delegate_ret => "InvokeDelegateRet": fn(ManagedHandle, *const *const c_void, i32, *mut c_void);
    set_field_value => "SetFieldValue": fn(*mut c_void, NativeString, *mut c_void);
    get_field_value => "GetFieldValue": fn(*mut c_void, NativeString, *mut c_void);
    get_field_pointer => "GetFieldPointer": fn(*mut c_void, NativeString, *mut *mut c_void);
    set_property_value => "SetPropertyValue": fn(*mut c_void, NativeString, *mut c_void);
    get_property_value => "GetPropertyValue": fn(*mut c_void, NativeString, *mut c_void);
    destroy_object => "DestroyObject": fn(*mut c_void);

    // Type interface
    get_assembly_types => "GetAssemblyTypes": fn(ManagedGuid, *mut ManagedHandle, *mut i32);
    get_type => "GetType": fn(NativeString, *mut ManagedHandle);
    get_full_type_name => "GetFullTypeName": fn(ManagedHandle) -> NativeString;
    get_assembly_qualified_name => "GetAssemblyQualifiedName": fn(ManagedHandle) -> NativeString;
    get_base_type => "GetBaseType": fn(ManagedHandle, *mut ManagedHandle);
    get_type_size => "GetTypeSize": fn(ManagedHandle) -> i32;
    is_type_subclass_of => "IsTypeSubclassOf": fn(ManagedHandle, ManagedHandle) -> Bool32;
    is_type_assignable_to => "IsTypeAssignableTo": fn(ManagedHandle, ManagedHandle) -> Bool32;
    is_type_assignable_from => "IsTypeAssignableFrom": fn(ManagedHandle, ManagedHandle) -> Bool32;
    is_type_sz_array => "IsTypeSZArray": fn(ManagedHandle) -> Bool32;
    is_type_by_ref => "IsTypeByRef": fn(ManagedHandle) -> Bool32;
    get_element_type => "GetElementType": fn(ManagedHandle, *mut ManagedHandle);
    get_type_methods => "GetTypeMethods": fn(ManagedHandle, *mut ManagedHandle, *mut i32);
    get_type_fields => "GetTypeFields": fn(ManagedHandle, *mut ManagedHandle, *mut i32);
    get_type_properties => "GetTypeProperties": fn(ManagedHandle, *mut ManagedHandle, *mut i32);
    get_type_method => "GetTypeMethod": fn(ManagedHandle, NativeString, *mut ManagedHandle);
    get_type_field => "GetTypeField": fn(ManagedHandle, NativeString, *mut ManagedHandle);
    get_type_property => "GetTypeProperty": fn(ManagedHandle, NativeString, *mut ManagedHandle);
    has_type_attribute => "HasTypeAttribute": fn(ManagedHandle, ManagedHandle) -> Bool32;
    get_type_attributes => "GetTypeAttributes": fn(ManagedHandle, *mut ManagedHandle, *mut i32);
    get_type_managed_type => "GetTypeManagedType": fn(ManagedHandle) -> ManagedType;

    // Method info
    get_method_info_name => "GetMethodInfoName": fn(ManagedHandle) -> NativeString;
    get_method_info_function_address => "GetMethodInfoFunctionAddress": fn(ManagedHandle) -> *mut c_void;
    get_method_info_return_type => "GetMethodInfoReturnType": fn(ManagedHandle, *mut ManagedHandle);
    get_method_info_parameter_types => "GetMethodInfoParameterTypes": fn(ManagedHandle, *mut ManagedHandle, *mut i32);
    get_method_info_accessibility => "GetMethodInfoAccessibility": fn(ManagedHandle) -> i32;
    get_method_info_attributes => "GetMethodInfoAttributes": fn(ManagedHandle, *mut ManagedHandle, *mut i32);
    get_method_info_parameter_attributes => "GetMethodInfoParameterAttributes": fn(ManagedHandle, i32, *mut ManagedHandle, *mut i32);
    get_method_info_return_attributes => "GetMethodInfoReturnAttributes": fn(ManagedHandle, *mut ManagedHandle, *mut i32);

    // Field info
    get_field_info_name => "GetFieldInfoName": fn(ManagedHandle) -> NativeString;
    get_field_info_type => "GetFieldInfoType": fn(ManagedHandle, *mut ManagedHandle);
    get_field_info_accessibility => "GetFieldInfoAccessibility": fn(ManagedHandle) -> i32;
    get_field_info_attributes => "GetFieldInfoAttributes": fn(ManagedHandle, *mut ManagedHandle, *mut i32);

    // Property info
    get_property_info_name => "GetPropertyInfoName": fn(ManagedHandle) -> NativeString;
    get_property_info_type => "GetPropertyInfoType": fn(ManagedHandle, *mut ManagedHandle);
    get_property_info_attributes => "GetPropertyInfoAttributes": fn(ManagedHandle, *mut ManagedHandle, *mut i32);

    // Attributes
    get_attribute_field_value => "GetAttributeFieldValue": fn(ManagedHandle, NativeString, *mut c_void);
    get_attribute_type => "GetAttributeType": fn(ManagedHandle, *mut ManagedHandle);

    // Other
    is_class => "IsClass": fn(ManagedHandle) -> bool;
    is_enum => "IsEnum": fn(ManagedHandle) -> bool;
    is_value_type => "IsValueType": fn(ManagedHandle) -> bool;
    get_enum_names => "GetEnumNames": fn(ManagedHandle, *mut NativeString, *mut i32);
    get_enum_values => "GetEnumValues": fn(ManagedHandle, *mut i32, *mut i32);
}

impl Default for RawFunctionTable {
    fn default() -> Self {
        RawFunctionTable::empty()
    }
}

const _: () = assert!(
    std::mem::size_of::<RawFunctionTable>() == FUNCTION_TABLE_LEN * std::mem::size_of::<usize>()
);
