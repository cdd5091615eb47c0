//! Access to the managed runtime
//!
//! [`Runtime`] is a cheap handle to one bound [`FunctionTable`]. It is
//! cloned into every proxy, loader and dispatcher instead of living in a
//! global, so tests can hand the bridge a fake table.

pub mod gc;
pub mod host;
pub mod table;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub use gc::Gc;
pub use host::{HostConfig, PreloadedHost, RuntimeHost};
pub use table::{
    ExceptionCallback, FunctionTable, MessageCallback, RawFunctionTable, FUNCTION_TABLE_LEN,
};

use crate::error::InitError;

/// Shared handle to the runtime's entry points
#[derive(Clone)]
pub struct Runtime {
    table: Arc<FunctionTable>,
}

impl Runtime {
    /// Wrap an already bound table
    pub fn new(table: FunctionTable) -> Self {
        Runtime {
            table: Arc::new(table),
        }
    }

    /// Bind a host-filled table; fails on the first missing entry
    pub fn from_raw(raw: &RawFunctionTable) -> Result<Self, InitError> {
        let table = raw.bind()?;
        tracing::debug!(entries = FUNCTION_TABLE_LEN, "function table installed");
        Ok(Runtime::new(table))
    }

    /// Collector controls
    pub fn gc(&self) -> Gc {
        Gc::new(self.clone())
    }

    /// `true` if both handles share one table
    pub fn same_table(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }
}

impl Deref for Runtime {
    type Target = FunctionTable;

    fn deref(&self) -> &FunctionTable {
        &self.table
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("table", &Arc::as_ptr(&self.table))
            .finish()
    }
}
