//! Handle-based reflection proxies
//!
//! Each proxy wraps one managed handle plus the [`Runtime`] it came from.
//! Derived handles (base type, element type, return and parameter types) are
//! resolved on first access and cached in the proxy. A zero handle is an
//! invalid proxy: name lookups that miss return one instead of an error,
//! and every accessor on it still goes through the runtime, which answers
//! with empty values.
//!
//! Constructors are crate-internal; the loader and other proxies hand
//! proxies out.

mod attribute;
mod field;
mod method;
mod object;
mod property;
mod ty;

pub use attribute::Attribute;
pub use field::FieldInfo;
pub use method::MethodInfo;
pub use object::{invoke_delegate, invoke_delegate_ret, ManagedObject};
pub use property::PropertyInfo;
pub use ty::Type;

pub(crate) use ty::invoke_static;

use std::ptr;

use netbridge_sdk::string::ScopedString;
use netbridge_sdk::{ManagedHandle, NativeString};

use crate::runtime::Runtime;

/// Run a size-then-fill call pair and collect the result.
///
/// `fill` is called once with a null buffer to learn the count, then with a
/// buffer of that size. The second call may shrink the count.
pub(crate) fn size_then_fill<T: Copy + Default>(mut fill: impl FnMut(*mut T, *mut i32)) -> Vec<T> {
    let mut count = 0i32;
    fill(ptr::null_mut(), &mut count as *mut i32);
    if count <= 0 {
        return Vec::new();
    }
    let mut items = vec![T::default(); count as usize];
    fill(items.as_mut_ptr(), &mut count as *mut i32);
    items.truncate(count.max(0) as usize);
    items
}

/// Resolve a handle through a single out-parameter call
pub(crate) fn out_handle(fill: impl FnOnce(*mut ManagedHandle)) -> ManagedHandle {
    let mut handle: ManagedHandle = 0;
    fill(&mut handle as *mut ManagedHandle);
    handle
}

/// Look a handle up by name, passing the name as a transient native string
pub(crate) fn lookup_by_name(
    name: &str,
    lookup: impl FnOnce(NativeString, *mut ManagedHandle),
) -> ManagedHandle {
    let name = ScopedString::new(name);
    out_handle(|out| lookup(name.get(), out))
}

/// Take ownership of a string returned by the runtime
pub(crate) fn take_string(value: NativeString) -> String {
    // Safety: strings returned by the runtime are allocated with the C
    // allocator and ownership passes to the caller.
    unsafe { value.into_string() }
}

/// Wrap a handle list into proxies
pub(crate) fn wrap_all<T>(
    runtime: &Runtime,
    handles: Vec<ManagedHandle>,
    wrap: impl Fn(Runtime, ManagedHandle) -> T,
) -> Vec<T> {
    handles
        .into_iter()
        .map(|handle| wrap(runtime.clone(), handle))
        .collect()
}
