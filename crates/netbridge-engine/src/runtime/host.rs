//! Runtime hosting seam
//!
//! Discovering and starting the managed runtime is the host's business. The
//! bridge only needs a populated function table back and a way to stop the
//! runtime again.

use std::path::PathBuf;

use crate::error::InitError;
use crate::runtime::table::RawFunctionTable;

/// Paths handed to the hosting layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Hosting library
    pub hostfxr_path: PathBuf,
    /// Directory with the managed API assemblies
    pub root_directory: PathBuf,
}

/// Starts and stops the managed runtime
pub trait RuntimeHost: Send {
    /// Boot the runtime and return its entry points
    fn initialize(&mut self, config: &HostConfig) -> Result<RawFunctionTable, InitError>;

    /// Stop the runtime. Called once, after every managed object is gone.
    fn shutdown(&mut self);
}

/// Host for a runtime that is already running in the process.
///
/// Useful when the embedding application boots the runtime itself and only
/// hands the entry points over.
pub struct PreloadedHost {
    table: RawFunctionTable,
}

impl PreloadedHost {
    /// Wrap a table obtained elsewhere
    pub fn new(table: RawFunctionTable) -> Self {
        PreloadedHost { table }
    }
}

impl RuntimeHost for PreloadedHost {
    fn initialize(&mut self, _config: &HostConfig) -> Result<RawFunctionTable, InitError> {
        Ok(self.table)
    }

    fn shutdown(&mut self) {}
}
