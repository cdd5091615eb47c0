//! In-process stand-in for the managed runtime
//!
//! Every entry of the function table is a plain `extern "C"` function
//! backed by thread-local state, so tests running on separate threads never
//! see each other's types or recordings. Handles are synthetic:
//! - registered types start at 1000, methods at 2000, members at 3000
//! - built-in value categories are `5000 + (category << 1 | by_ref)`
//! - delegates start at 9000

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::path::{Path, PathBuf};
use std::slice;
use std::sync::Mutex;

use netbridge_engine::module::{Provider, Severity};
use netbridge_engine::runtime::{ExceptionCallback, MessageCallback};
use netbridge_engine::{RawFunctionTable, Runtime};
use netbridge_sdk::{
    Bool32, InternalCall, ManagedGuid, ManagedHandle, ManagedType, NativeString, ValueType,
};

/// Managed method body: argument pointers in, return storage out (null for void)
pub type Behavior = fn(args: &[*const c_void], ret: *mut c_void);

const TYPE_BASE: ManagedHandle = 1000;
const METHOD_BASE: ManagedHandle = 2000;
const MEMBER_BASE: ManagedHandle = 3000;
const BUILTIN_BASE: ManagedHandle = 5000;
const DELEGATE_BASE: ManagedHandle = 9000;
const OBJECT_BASE: usize = 0x10_0000;

#[derive(Debug, Clone, Default)]
pub struct FakeType {
    pub full_name: String,
    pub base: ManagedHandle,
    pub managed_type: ManagedType,
    pub size: i32,
    pub is_class: bool,
    pub methods: Vec<ManagedHandle>,
    pub fields: Vec<ManagedHandle>,
    pub properties: Vec<ManagedHandle>,
    pub enum_entries: Vec<(String, i32)>,
}

#[derive(Debug, Clone)]
pub struct FakeMethod {
    pub name: String,
    pub params: Vec<ManagedHandle>,
    pub ret: ManagedHandle,
    pub behavior: Option<Behavior>,
}

#[derive(Debug, Clone)]
pub struct FakeMember {
    pub name: String,
    pub ty: ManagedHandle,
}

#[derive(Debug, Clone)]
pub struct FakeAssembly {
    pub file: String,
    pub name: String,
    pub id: ManagedGuid,
    pub types: Vec<ManagedHandle>,
}

/// One managed invocation seen by the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Object handle, type handle or delegate handle
    pub target: i64,
    /// Method handle, 0 for delegates
    pub method: ManagedHandle,
    pub arg_count: usize,
    pub has_ret: bool,
}

#[derive(Default)]
pub struct FakeState {
    pub types: Vec<FakeType>,
    pub methods: Vec<FakeMethod>,
    pub members: Vec<FakeMember>,
    pub assemblies: Vec<FakeAssembly>,
    pub delegates: Vec<Behavior>,
    pub next_load_status: Option<i32>,
    pub last_load_status: i32,
    pub message_sink: Option<MessageCallback>,
    pub exception_sink: Option<ExceptionCallback>,
    pub invocations: Vec<Invocation>,
    pub internal_call_batches: Vec<(Vec<(String, usize)>, bool)>,
    pub created: Vec<(ManagedHandle, usize)>,
    pub destroyed: Vec<usize>,
    pub properties: Vec<(String, String)>,
    pub fields: HashMap<(usize, String), i64>,
    pub unloaded: Vec<ManagedGuid>,
    pub collections: usize,
    pub finalizer_waits: usize,
    pub shutdowns: usize,
}

thread_local! {
    static STATE: RefCell<FakeState> = RefCell::new(FakeState::default());
}

/// Run `f` against this thread's fake runtime
pub fn with_state<R>(f: impl FnOnce(&mut FakeState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Forget every registration and recording on this thread
pub fn reset() {
    with_state(|state| *state = FakeState::default());
}

// ============================================================================
// Registration
// ============================================================================

/// Handle of a built-in value category
pub fn builtin(vt: ValueType) -> ManagedHandle {
    BUILTIN_BASE + ((vt as u8 as i64) << 1)
}

/// Handle of a built-in category passed by reference
pub fn builtin_ref(vt: ValueType) -> ManagedHandle {
    builtin(vt) | 1
}

/// Register a class deriving from `base` (0 for none)
pub fn add_type(full_name: &str, base: ManagedHandle) -> ManagedHandle {
    add_type_with(FakeType {
        full_name: full_name.to_string(),
        base,
        managed_type: ManagedType::new(ValueType::Invalid, false),
        size: 8,
        is_class: true,
        ..FakeType::default()
    })
}

/// Register a fully described type
pub fn add_type_with(ty: FakeType) -> ManagedHandle {
    with_state(|state| {
        state.types.push(ty);
        TYPE_BASE + state.types.len() as i64 - 1
    })
}

/// Register a method on `declaring`
pub fn add_method(
    declaring: ManagedHandle,
    name: &str,
    params: &[ManagedHandle],
    ret: ManagedHandle,
    behavior: Option<Behavior>,
) -> ManagedHandle {
    with_state(|state| {
        state.methods.push(FakeMethod {
            name: name.to_string(),
            params: params.to_vec(),
            ret,
            behavior,
        });
        let handle = METHOD_BASE + state.methods.len() as i64 - 1;
        if let Some(ty) = type_mut(state, declaring) {
            ty.methods.push(handle);
        }
        handle
    })
}

fn add_member(declaring: ManagedHandle, name: &str, ty: ManagedHandle, field: bool) -> ManagedHandle {
    with_state(|state| {
        state.members.push(FakeMember {
            name: name.to_string(),
            ty,
        });
        let handle = MEMBER_BASE + state.members.len() as i64 - 1;
        if let Some(owner) = type_mut(state, declaring) {
            if field {
                owner.fields.push(handle);
            } else {
                owner.properties.push(handle);
            }
        }
        handle
    })
}

/// Register a field on `declaring`
pub fn add_field(declaring: ManagedHandle, name: &str, ty: ManagedHandle) -> ManagedHandle {
    add_member(declaring, name, ty, true)
}

/// Register a property on `declaring`
pub fn add_property(declaring: ManagedHandle, name: &str, ty: ManagedHandle) -> ManagedHandle {
    add_member(declaring, name, ty, false)
}

/// Register an assembly found at any path ending in `file`
pub fn add_assembly(file: &str, name: &str, types: &[ManagedHandle]) -> ManagedGuid {
    with_state(|state| {
        let id = ManagedGuid::new(state.assemblies.len() as u64 + 1, 0xA55E);
        state.assemblies.push(FakeAssembly {
            file: file.to_string(),
            name: name.to_string(),
            id,
            types: types.to_vec(),
        });
        id
    })
}

/// Register a delegate
pub fn add_delegate(behavior: Behavior) -> ManagedHandle {
    with_state(|state| {
        state.delegates.push(behavior);
        DELEGATE_BASE + state.delegates.len() as i64 - 1
    })
}

/// Make the next assembly load report `status`
pub fn fail_next_load(status: i32) {
    with_state(|state| state.next_load_status = Some(status));
}

/// Deliver a log line through the sink installed by `Initialize`
pub fn emit_message(message: &str, level: i32) {
    if let Some(sink) = with_state(|state| state.message_sink) {
        let text = NativeString::new(message);
        unsafe {
            sink(text, level);
            text.into_string();
        }
    }
}

/// Deliver an exception through the sink installed by `Initialize`
pub fn emit_exception(message: &str) {
    if let Some(sink) = with_state(|state| state.exception_sink) {
        let text = NativeString::new(message);
        unsafe {
            sink(text);
            text.into_string();
        }
    }
}

pub fn invocations() -> Vec<Invocation> {
    with_state(|state| state.invocations.clone())
}

pub fn internal_call_batches() -> Vec<(Vec<(String, usize)>, bool)> {
    with_state(|state| state.internal_call_batches.clone())
}

pub fn property(name: &str) -> Option<String> {
    with_state(|state| {
        state
            .properties
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    })
}

fn type_mut(state: &mut FakeState, handle: ManagedHandle) -> Option<&mut FakeType> {
    state.types.get_mut(usize::try_from(handle - TYPE_BASE).ok()?)
}

fn type_ref(state: &FakeState, handle: ManagedHandle) -> Option<&FakeType> {
    state.types.get(usize::try_from(handle - TYPE_BASE).ok()?)
}

fn method_ref(state: &FakeState, handle: ManagedHandle) -> Option<&FakeMethod> {
    state.methods.get(usize::try_from(handle - METHOD_BASE).ok()?)
}

fn member_ref(state: &FakeState, handle: ManagedHandle) -> Option<&FakeMember> {
    state.members.get(usize::try_from(handle - MEMBER_BASE).ok()?)
}

fn assembly_ref(state: &FakeState, id: ManagedGuid) -> Option<&FakeAssembly> {
    state.assemblies.iter().find(|assembly| assembly.id == id)
}

fn is_builtin(handle: ManagedHandle) -> bool {
    (BUILTIN_BASE..DELEGATE_BASE).contains(&handle)
}

fn builtin_type(handle: ManagedHandle) -> ManagedType {
    let raw = handle - BUILTIN_BASE;
    let vt = ValueType::from_u8((raw >> 1) as u8).unwrap_or(ValueType::Invalid);
    ManagedType::new(vt, raw & 1 == 1)
}

// ============================================================================
// Table plumbing
// ============================================================================

/// Copy out a size-then-fill result
unsafe fn fill<T: Clone>(items: &[T], buffer: *mut T, count: *mut i32) {
    if !buffer.is_null() {
        let room = (*count).max(0) as usize;
        for (index, item) in items.iter().take(room).enumerate() {
            buffer.add(index).write(item.clone());
        }
    }
    *count = items.len() as i32;
}

unsafe fn write_handle(out: *mut ManagedHandle, handle: ManagedHandle) {
    if !out.is_null() {
        *out = handle;
    }
}

unsafe fn args_of<'a>(args: *const *const c_void, count: i32) -> &'a [*const c_void] {
    if args.is_null() || count <= 0 {
        &[]
    } else {
        slice::from_raw_parts(args, count as usize)
    }
}

fn name_of(name: NativeString) -> String {
    name.to_string_lossy()
}

fn record(target: i64, method: ManagedHandle, count: i32, has_ret: bool) {
    with_state(|state| {
        state.invocations.push(Invocation {
            target,
            method,
            arg_count: count.max(0) as usize,
            has_ret,
        })
    });
}

fn behavior_of(method: ManagedHandle) -> Option<Behavior> {
    with_state(|state| method_ref(state, method).and_then(|m| m.behavior))
}

fn delegate_of(handle: ManagedHandle) -> Option<Behavior> {
    with_state(|state| {
        usize::try_from(handle - DELEGATE_BASE)
            .ok()
            .and_then(|index| state.delegates.get(index).copied())
    })
}

unsafe fn run(behavior: Option<Behavior>, args: *const *const c_void, count: i32, ret: *mut c_void) {
    if let Some(behavior) = behavior {
        behavior(args_of(args, count), ret);
    }
}

// Lifecycle

unsafe extern "C" fn initialize(message: MessageCallback, exception: ExceptionCallback) {
    with_state(|state| {
        state.message_sink = Some(message);
        state.exception_sink = Some(exception);
    });
}

unsafe extern "C" fn shutdown() {
    with_state(|state| state.shutdowns += 1);
}

// Assemblies

unsafe extern "C" fn set_internal_calls(calls: *const InternalCall, count: i32, warn: Bool32) {
    let calls = if calls.is_null() || count <= 0 {
        &[][..]
    } else {
        slice::from_raw_parts(calls, count as usize)
    };
    let batch = calls
        .iter()
        .map(|call| {
            let name = CStr::from_ptr(call.name).to_string_lossy().into_owned();
            (name, call.native_function as usize)
        })
        .collect();
    with_state(|state| state.internal_call_batches.push((batch, warn != 0)));
}

unsafe extern "C" fn load_managed_assembly(
    path: NativeString,
    _from_memory: Bool32,
    _collectible: Bool32,
) -> ManagedGuid {
    let path = PathBuf::from(path.to_string_lossy());
    with_state(|state| {
        if let Some(status) = state.next_load_status.take() {
            state.last_load_status = status;
            return ManagedGuid::EMPTY;
        }
        let found = state
            .assemblies
            .iter()
            .find(|assembly| path.file_name().is_some_and(|file| file == assembly.file.as_str()))
            .map(|assembly| assembly.id);
        match found {
            Some(id) => {
                state.last_load_status = 0;
                id
            }
            None => {
                state.last_load_status = 1;
                ManagedGuid::EMPTY
            }
        }
    })
}

unsafe extern "C" fn unload_managed_assembly(id: ManagedGuid) -> Bool32 {
    with_state(|state| {
        state.unloaded.push(id);
        1
    })
}

unsafe extern "C" fn get_last_load_status() -> i32 {
    with_state(|state| state.last_load_status)
}

unsafe extern "C" fn get_assembly_name(id: ManagedGuid) -> NativeString {
    let name = with_state(|state| assembly_ref(state, id).map(|a| a.name.clone()));
    name.map_or(NativeString::null(), |name| NativeString::new(&name))
}

// Garbage collector

unsafe extern "C" fn collect_garbage(_generation: i32, _mode: i32, _blocking: Bool32, _compacting: Bool32) {
    with_state(|state| state.collections += 1);
}

unsafe extern "C" fn wait_for_pending_finalizers() {
    with_state(|state| state.finalizer_waits += 1);
}

// Objects

unsafe extern "C" fn create_object(
    ty: ManagedHandle,
    _is_static: Bool32,
    _args: *const *const c_void,
    _count: i32,
) -> *mut c_void {
    with_state(|state| {
        if type_ref(state, ty).is_none() {
            return std::ptr::null_mut();
        }
        let object = OBJECT_BASE + state.created.len() * 0x10;
        state.created.push((ty, object));
        object as *mut c_void
    })
}

unsafe extern "C" fn invoke_method(object: *mut c_void, method: ManagedHandle, args: *const *const c_void, count: i32) {
    record(object as i64, method, count, false);
    run(behavior_of(method), args, count, std::ptr::null_mut());
}

unsafe extern "C" fn invoke_method_ret(
    object: *mut c_void,
    method: ManagedHandle,
    args: *const *const c_void,
    count: i32,
    ret: *mut c_void,
) {
    record(object as i64, method, count, true);
    run(behavior_of(method), args, count, ret);
}

unsafe extern "C" fn invoke_static_method(
    ty: ManagedHandle,
    method: ManagedHandle,
    args: *const *const c_void,
    count: i32,
) {
    record(ty, method, count, false);
    run(behavior_of(method), args, count, std::ptr::null_mut());
}

unsafe extern "C" fn invoke_static_method_ret(
    ty: ManagedHandle,
    method: ManagedHandle,
    args: *const *const c_void,
    count: i32,
    ret: *mut c_void,
) {
    record(ty, method, count, true);
    run(behavior_of(method), args, count, ret);
}

unsafe extern "C" fn invoke_delegate(delegate: ManagedHandle, args: *const *const c_void, count: i32) {
    record(delegate, 0, count, false);
    run(delegate_of(delegate), args, count, std::ptr::null_mut());
}

unsafe extern "C" fn invoke_delegate_ret(
    delegate: ManagedHandle,
    args: *const *const c_void,
    count: i32,
    ret: *mut c_void,
) {
    record(delegate, 0, count, true);
    run(delegate_of(delegate), args, count, ret);
}

unsafe extern "C" fn set_field_value(object: *mut c_void, name: NativeString, value: *mut c_void) {
    let value = *(value as *const i64);
    with_state(|state| state.fields.insert((object as usize, name_of(name)), value));
}

unsafe extern "C" fn get_field_value(object: *mut c_void, name: NativeString, out: *mut c_void) {
    let value = with_state(|state| state.fields.get(&(object as usize, name_of(name))).copied());
    if let Some(value) = value {
        *(out as *mut i64) = value;
    }
}

unsafe extern "C" fn get_field_pointer(object: *mut c_void, name: NativeString, out: *mut *mut c_void) {
    let known = with_state(|state| state.fields.contains_key(&(object as usize, name_of(name))));
    if known {
        *out = (object as usize + 8) as *mut c_void;
    }
}

/// Plugin properties arrive as native values: `Id` is an i64,
/// `Dependencies` a vector of strings, everything else a string.
unsafe extern "C" fn set_property_value(_object: *mut c_void, name: NativeString, value: *mut c_void) {
    let name = name_of(name);
    let rendered = match name.as_str() {
        "Id" => (*(value as *const i64)).to_string(),
        "Dependencies" => (*(value as *const Vec<String>)).join(","),
        _ => (*(value as *const String)).clone(),
    };
    with_state(|state| state.properties.push((name, rendered)));
}

unsafe extern "C" fn get_property_value(_object: *mut c_void, name: NativeString, out: *mut c_void) {
    let name = name_of(name);
    let value = with_state(|state| {
        state
            .properties
            .iter()
            .rev()
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| value.parse::<i64>().ok())
    });
    if let Some(value) = value {
        *(out as *mut i64) = value;
    }
}

unsafe extern "C" fn destroy_object(object: *mut c_void) {
    with_state(|state| state.destroyed.push(object as usize));
}

// Type interface

unsafe extern "C" fn get_assembly_types(id: ManagedGuid, buffer: *mut ManagedHandle, count: *mut i32) {
    let types = with_state(|state| assembly_ref(state, id).map(|a| a.types.clone()).unwrap_or_default());
    fill(&types, buffer, count);
}

unsafe extern "C" fn get_type(name: NativeString, out: *mut ManagedHandle) {
    let name = name_of(name);
    let handle = with_state(|state| {
        state
            .types
            .iter()
            .position(|ty| ty.full_name == name)
            .map_or(0, |index| TYPE_BASE + index as i64)
    });
    write_handle(out, handle);
}

unsafe extern "C" fn get_full_type_name(ty: ManagedHandle) -> NativeString {
    if is_builtin(ty) {
        return NativeString::new(&format!("System.{}", builtin_type(ty).value_type()));
    }
    let name = with_state(|state| type_ref(state, ty).map(|t| t.full_name.clone()));
    name.map_or(NativeString::null(), |name| NativeString::new(&name))
}

unsafe extern "C" fn get_assembly_qualified_name(ty: ManagedHandle) -> NativeString {
    let name = with_state(|state| {
        let full_name = type_ref(state, ty)?.full_name.clone();
        let assembly = state.assemblies.iter().find(|a| a.types.contains(&ty))?;
        Some(format!("{}, {}", full_name, assembly.name))
    });
    name.map_or(NativeString::null(), |name| NativeString::new(&name))
}

unsafe extern "C" fn get_base_type(ty: ManagedHandle, out: *mut ManagedHandle) {
    let base = with_state(|state| type_ref(state, ty).map_or(0, |t| t.base));
    write_handle(out, base);
}

unsafe extern "C" fn get_type_size(ty: ManagedHandle) -> i32 {
    with_state(|state| type_ref(state, ty).map_or(0, |t| t.size))
}

fn derives_from(state: &FakeState, mut ty: ManagedHandle, ancestor: ManagedHandle) -> bool {
    while let Some(current) = type_ref(state, ty) {
        if current.base == ancestor && ancestor != 0 {
            return true;
        }
        ty = current.base;
    }
    false
}

unsafe extern "C" fn is_type_subclass_of(ty: ManagedHandle, other: ManagedHandle) -> Bool32 {
    with_state(|state| derives_from(state, ty, other) as Bool32)
}

unsafe extern "C" fn is_type_assignable_to(ty: ManagedHandle, other: ManagedHandle) -> Bool32 {
    with_state(|state| (ty == other || derives_from(state, ty, other)) as Bool32)
}

unsafe extern "C" fn is_type_assignable_from(ty: ManagedHandle, other: ManagedHandle) -> Bool32 {
    is_type_assignable_to(other, ty)
}

unsafe extern "C" fn is_type_sz_array(ty: ManagedHandle) -> Bool32 {
    (is_builtin(ty) && builtin_type(ty).value_type().is_array()) as Bool32
}

unsafe extern "C" fn is_type_by_ref(ty: ManagedHandle) -> Bool32 {
    (is_builtin(ty) && builtin_type(ty).is_ref()) as Bool32
}

unsafe extern "C" fn get_element_type(ty: ManagedHandle, out: *mut ManagedHandle) {
    let element = if is_builtin(ty) && builtin_type(ty).value_type() == ValueType::ArrayInt32 {
        builtin(ValueType::Int32)
    } else {
        0
    };
    write_handle(out, element);
}

unsafe extern "C" fn get_type_methods(ty: ManagedHandle, buffer: *mut ManagedHandle, count: *mut i32) {
    let methods = with_state(|state| type_ref(state, ty).map(|t| t.methods.clone()).unwrap_or_default());
    fill(&methods, buffer, count);
}

unsafe extern "C" fn get_type_fields(ty: ManagedHandle, buffer: *mut ManagedHandle, count: *mut i32) {
    let fields = with_state(|state| type_ref(state, ty).map(|t| t.fields.clone()).unwrap_or_default());
    fill(&fields, buffer, count);
}

unsafe extern "C" fn get_type_properties(ty: ManagedHandle, buffer: *mut ManagedHandle, count: *mut i32) {
    let properties =
        with_state(|state| type_ref(state, ty).map(|t| t.properties.clone()).unwrap_or_default());
    fill(&properties, buffer, count);
}

unsafe extern "C" fn get_type_method(ty: ManagedHandle, name: NativeString, out: *mut ManagedHandle) {
    let name = name_of(name);
    let handle = with_state(|state| {
        type_ref(state, ty)
            .and_then(|t| {
                t.methods
                    .iter()
                    .copied()
                    .find(|&m| method_ref(state, m).is_some_and(|m| m.name == name))
            })
            .unwrap_or(0)
    });
    write_handle(out, handle);
}

fn find_member(state: &FakeState, members: &[ManagedHandle], name: &str) -> ManagedHandle {
    members
        .iter()
        .copied()
        .find(|&m| member_ref(state, m).is_some_and(|m| m.name == name))
        .unwrap_or(0)
}

unsafe extern "C" fn get_type_field(ty: ManagedHandle, name: NativeString, out: *mut ManagedHandle) {
    let name = name_of(name);
    let handle =
        with_state(|state| type_ref(state, ty).map_or(0, |t| find_member(state, &t.fields, &name)));
    write_handle(out, handle);
}

unsafe extern "C" fn get_type_property(ty: ManagedHandle, name: NativeString, out: *mut ManagedHandle) {
    let name = name_of(name);
    let handle = with_state(|state| {
        type_ref(state, ty).map_or(0, |t| find_member(state, &t.properties, &name))
    });
    write_handle(out, handle);
}

unsafe extern "C" fn has_type_attribute(_ty: ManagedHandle, _attribute: ManagedHandle) -> Bool32 {
    0
}

unsafe extern "C" fn no_attributes(_owner: ManagedHandle, _buffer: *mut ManagedHandle, count: *mut i32) {
    *count = 0;
}

unsafe extern "C" fn get_type_managed_type(ty: ManagedHandle) -> ManagedType {
    if is_builtin(ty) {
        return builtin_type(ty);
    }
    with_state(|state| type_ref(state, ty).map_or(ManagedType::default(), |t| t.managed_type))
}

// Method info

unsafe extern "C" fn get_method_info_name(method: ManagedHandle) -> NativeString {
    let name = with_state(|state| method_ref(state, method).map(|m| m.name.clone()));
    name.map_or(NativeString::null(), |name| NativeString::new(&name))
}

unsafe extern "C" fn get_method_info_function_address(method: ManagedHandle) -> *mut c_void {
    if method == 0 {
        std::ptr::null_mut()
    } else {
        (0x7000_0000 + method as usize) as *mut c_void
    }
}

unsafe extern "C" fn get_method_info_return_type(method: ManagedHandle, out: *mut ManagedHandle) {
    let ret = with_state(|state| method_ref(state, method).map_or(0, |m| m.ret));
    write_handle(out, ret);
}

unsafe extern "C" fn get_method_info_parameter_types(
    method: ManagedHandle,
    buffer: *mut ManagedHandle,
    count: *mut i32,
) {
    let params = with_state(|state| method_ref(state, method).map(|m| m.params.clone()).unwrap_or_default());
    fill(&params, buffer, count);
}

unsafe extern "C" fn get_method_info_accessibility(_method: ManagedHandle) -> i32 {
    0
}

unsafe extern "C" fn get_method_info_parameter_attributes(
    _method: ManagedHandle,
    _index: i32,
    _buffer: *mut ManagedHandle,
    count: *mut i32,
) {
    *count = 0;
}

// Field and property info

unsafe extern "C" fn get_member_name(member: ManagedHandle) -> NativeString {
    let name = with_state(|state| member_ref(state, member).map(|m| m.name.clone()));
    name.map_or(NativeString::null(), |name| NativeString::new(&name))
}

unsafe extern "C" fn get_member_type(member: ManagedHandle, out: *mut ManagedHandle) {
    let ty = with_state(|state| member_ref(state, member).map_or(0, |m| m.ty));
    write_handle(out, ty);
}

unsafe extern "C" fn get_field_info_accessibility(_field: ManagedHandle) -> i32 {
    1
}

// Attributes

unsafe extern "C" fn get_attribute_field_value(_attribute: ManagedHandle, _name: NativeString, _out: *mut c_void) {}

unsafe extern "C" fn get_attribute_type(_attribute: ManagedHandle, out: *mut ManagedHandle) {
    write_handle(out, 0);
}

// Other

unsafe extern "C" fn is_class(ty: ManagedHandle) -> bool {
    with_state(|state| type_ref(state, ty).is_some_and(|t| t.is_class))
}

unsafe extern "C" fn is_enum(ty: ManagedHandle) -> bool {
    with_state(|state| type_ref(state, ty).is_some_and(|t| !t.enum_entries.is_empty()))
}

unsafe extern "C" fn is_value_type(ty: ManagedHandle) -> bool {
    if is_builtin(ty) {
        return builtin_type(ty).value_type().is_scalar();
    }
    with_state(|state| type_ref(state, ty).is_some_and(|t| !t.is_class))
}

unsafe extern "C" fn get_enum_names(ty: ManagedHandle, buffer: *mut NativeString, count: *mut i32) {
    let names: Vec<String> = with_state(|state| {
        type_ref(state, ty)
            .map(|t| t.enum_entries.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    });
    if buffer.is_null() {
        *count = names.len() as i32;
        return;
    }
    let strings: Vec<NativeString> = names.iter().map(|name| NativeString::new(name)).collect();
    fill(&strings, buffer, count);
}

unsafe extern "C" fn get_enum_values(ty: ManagedHandle, buffer: *mut i32, count: *mut i32) {
    let values: Vec<i32> = with_state(|state| {
        type_ref(state, ty)
            .map(|t| t.enum_entries.iter().map(|(_, value)| *value).collect())
            .unwrap_or_default()
    });
    fill(&values, buffer, count);
}

/// A table with every entry wired to this module
pub fn table() -> RawFunctionTable {
    RawFunctionTable {
        initialize: Some(initialize),
        shutdown: Some(shutdown),
        set_internal_calls: Some(set_internal_calls),
        load_managed_assembly: Some(load_managed_assembly),
        unload_managed_assembly: Some(unload_managed_assembly),
        get_last_load_status: Some(get_last_load_status),
        get_assembly_name: Some(get_assembly_name),
        collect_garbage: Some(collect_garbage),
        wait_for_pending_finalizers: Some(wait_for_pending_finalizers),
        create_object: Some(create_object),
        invoke_method: Some(invoke_method),
        invoke_method_ret: Some(invoke_method_ret),
        invoke_static_method: Some(invoke_static_method),
        invoke_static_method_ret: Some(invoke_static_method_ret),
        invoke_delegate: Some(invoke_delegate),
        invoke_delegate_ret: Some(invoke_delegate_ret),
        set_field_value: Some(set_field_value),
        get_field_value: Some(get_field_value),
        get_field_pointer: Some(get_field_pointer),
        set_property_value: Some(set_property_value),
        get_property_value: Some(get_property_value),
        destroy_object: Some(destroy_object),
        get_assembly_types: Some(get_assembly_types),
        get_type: Some(get_type),
        get_full_type_name: Some(get_full_type_name),
        get_assembly_qualified_name: Some(get_assembly_qualified_name),
        get_base_type: Some(get_base_type),
        get_type_size: Some(get_type_size),
        is_type_subclass_of: Some(is_type_subclass_of),
        is_type_assignable_to: Some(is_type_assignable_to),
        is_type_assignable_from: Some(is_type_assignable_from),
        is_type_sz_array: Some(is_type_sz_array),
        is_type_by_ref: Some(is_type_by_ref),
        get_element_type: Some(get_element_type),
        get_type_methods: Some(get_type_methods),
        get_type_fields: Some(get_type_fields),
        get_type_properties: Some(get_type_properties),
        get_type_method: Some(get_type_method),
        get_type_field: Some(get_type_field),
        get_type_property: Some(get_type_property),
        has_type_attribute: Some(has_type_attribute),
        get_type_attributes: Some(no_attributes),
        get_type_managed_type: Some(get_type_managed_type),
        get_method_info_name: Some(get_method_info_name),
        get_method_info_function_address: Some(get_method_info_function_address),
        get_method_info_return_type: Some(get_method_info_return_type),
        get_method_info_parameter_types: Some(get_method_info_parameter_types),
        get_method_info_accessibility: Some(get_method_info_accessibility),
        get_method_info_attributes: Some(no_attributes),
        get_method_info_parameter_attributes: Some(get_method_info_parameter_attributes),
        get_method_info_return_attributes: Some(no_attributes),
        get_field_info_name: Some(get_member_name),
        get_field_info_type: Some(get_member_type),
        get_field_info_accessibility: Some(get_field_info_accessibility),
        get_field_info_attributes: Some(no_attributes),
        get_property_info_name: Some(get_member_name),
        get_property_info_type: Some(get_member_type),
        get_property_info_attributes: Some(no_attributes),
        get_attribute_field_value: Some(get_attribute_field_value),
        get_attribute_type: Some(get_attribute_type),
        is_class: Some(is_class),
        is_enum: Some(is_enum),
        is_value_type: Some(is_value_type),
        get_enum_names: Some(get_enum_names),
        get_enum_values: Some(get_enum_values),
    }
}

/// A bound runtime over a fresh fake
pub fn runtime() -> Runtime {
    reset();
    Runtime::from_raw(&table()).expect("fake table is complete")
}

// ============================================================================
// Host collaborator
// ============================================================================

/// Provider that records log lines and answers load queries from lists
#[derive(Debug, Default)]
pub struct RecordingProvider {
    pub base_dir: PathBuf,
    pub modules: Vec<(String, i32)>,
    pub plugins: Vec<(String, i32)>,
    pub lines: Mutex<Vec<(String, Severity)>>,
}

impl RecordingProvider {
    pub fn new(base_dir: &Path) -> Self {
        RecordingProvider {
            base_dir: base_dir.to_path_buf(),
            ..RecordingProvider::default()
        }
    }

    pub fn lines(&self) -> Vec<(String, Severity)> {
        self.lines.lock().unwrap().clone()
    }

    fn matches(list: &[(String, i32)], name: &str, version: Option<i32>, minimum: bool) -> bool {
        list.iter().any(|(loaded, loaded_version)| {
            loaded == name
                && match version {
                    None => true,
                    Some(v) if minimum => *loaded_version >= v,
                    Some(v) => *loaded_version == v,
                }
        })
    }
}

impl Provider for RecordingProvider {
    fn log(&self, message: &str, severity: Severity) {
        self.lines.lock().unwrap().push((message.to_string(), severity));
    }

    fn base_dir(&self) -> PathBuf {
        self.base_dir.clone()
    }

    fn is_module_loaded(&self, name: &str, version: Option<i32>, minimum: bool) -> bool {
        Self::matches(&self.modules, name, version, minimum)
    }

    fn is_plugin_loaded(&self, name: &str, version: Option<i32>, minimum: bool) -> bool {
        Self::matches(&self.plugins, name, version, minimum)
    }
}
