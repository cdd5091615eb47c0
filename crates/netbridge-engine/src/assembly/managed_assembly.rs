//! A loaded managed assembly and its pending internal calls

use std::ffi::{c_void, CString};

use netbridge_sdk::abi::bool32;
use netbridge_sdk::{AssemblyLoadStatus, InternalCall, ManagedGuid, ManagedHandle};

use crate::reflect::{size_then_fill, take_string, Type};
use crate::runtime::Runtime;

/// One assembly loaded into a load context.
///
/// Types are enumerated once at load. Internal calls are queued with
/// [`add_internal_call`](Self::add_internal_call) and pushed to the runtime
/// in a single batch by [`upload_internal_calls`](Self::upload_internal_calls).
pub struct ManagedAssembly {
    runtime: Runtime,
    id: ManagedGuid,
    name: String,
    status: AssemblyLoadStatus,
    types: Vec<Type>,
    internal_calls: Vec<InternalCall>,
    names: Vec<CString>,
}

// Safety: the raw pointers in `internal_calls` point into `names` (owned) or
// at generated code owned by the language module, which outlives assemblies.
unsafe impl Send for ManagedAssembly {}

impl ManagedAssembly {
    pub(crate) fn load(runtime: Runtime, id: ManagedGuid, status: AssemblyLoadStatus) -> Self {
        let name = take_string(unsafe { (runtime.get_assembly_name)(id) });
        let handles: Vec<ManagedHandle> =
            size_then_fill(|buf, count| unsafe { (runtime.get_assembly_types)(id, buf, count) });
        let types = handles
            .into_iter()
            .map(|handle| Type::new(runtime.clone(), handle))
            .collect::<Vec<_>>();

        tracing::debug!(assembly = %name, %id, types = types.len(), "Assembly loaded");

        ManagedAssembly {
            runtime,
            id,
            name,
            status,
            types,
            internal_calls: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Runtime-assigned identifier
    pub fn id(&self) -> ManagedGuid {
        self.id
    }

    /// Simple assembly name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load status reported by the runtime
    pub fn status(&self) -> AssemblyLoadStatus {
        self.status
    }

    /// Every type defined in the assembly
    pub fn types(&self) -> &[Type] {
        &self.types
    }

    /// Find a type by full name
    pub fn get_type(&self, full_name: &str) -> Option<&Type> {
        self.types.iter().find(|ty| ty.full_name() == full_name)
    }

    /// Find the first type whose direct base type has the given full name
    pub fn get_type_by_base_type(&self, base_name: &str) -> Option<&Type> {
        self.types
            .iter()
            .find(|ty| ty.base_type().is_valid() && ty.base_type().full_name() == base_name)
    }

    /// Queue a binding of `{class}@{member}` to a native entry point
    pub fn add_internal_call(&mut self, class: &str, member: &str, function: *const c_void) {
        let qualified = format!("{}@{}, {}", class, member, self.name);
        let Ok(name) = CString::new(qualified) else {
            tracing::warn!(class, member, "Internal call name contains a NUL byte");
            return;
        };
        self.internal_calls.push(InternalCall {
            name: name.as_ptr(),
            native_function: function as *mut c_void,
        });
        self.names.push(name);
    }

    /// Number of queued bindings
    pub fn pending_internal_calls(&self) -> usize {
        self.internal_calls.len()
    }

    /// Names of the queued bindings, in queue order
    pub fn pending_internal_call_names(&self) -> Vec<String> {
        self.names
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    /// Push every queued binding to the runtime in one call and clear the queue.
    ///
    /// With `warn_missing`, the runtime logs bindings that match no method.
    /// An empty queue sends nothing. Each upload makes the runtime resolve
    /// bindings across the whole assembly, and method export calls this on
    /// every loaded assembly whether or not it received bindings.
    pub fn upload_internal_calls(&mut self, warn_missing: bool) {
        if self.internal_calls.is_empty() {
            return;
        }
        tracing::debug!(assembly = %self.name, count = self.internal_calls.len(), "Uploading internal calls");
        unsafe {
            (self.runtime.set_internal_calls)(
                self.internal_calls.as_ptr(),
                self.internal_calls.len() as i32,
                bool32(warn_missing),
            )
        };
        self.internal_calls.clear();
        self.names.clear();
    }
}

impl std::fmt::Debug for ManagedAssembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedAssembly")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("types", &self.types.len())
            .field("pending_internal_calls", &self.internal_calls.len())
            .finish()
    }
}
