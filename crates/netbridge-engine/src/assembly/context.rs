//! Assembly load context

use std::path::Path;

use netbridge_sdk::abi::bool32;
use netbridge_sdk::string::ScopedString;
use netbridge_sdk::{AssemblyLoadStatus, ManagedGuid};
use rustc_hash::FxHashMap;

use super::managed_assembly::ManagedAssembly;
use crate::error::LoadError;
use crate::runtime::Runtime;

fn load_error(status: i32) -> Result<AssemblyLoadStatus, LoadError> {
    match AssemblyLoadStatus::try_from(status) {
        Ok(AssemblyLoadStatus::Success) => Ok(AssemblyLoadStatus::Success),
        Ok(AssemblyLoadStatus::FileNotFound) => Err(LoadError::FileNotFound),
        Ok(AssemblyLoadStatus::FileLoadFailure) => Err(LoadError::FileLoadFailure),
        Ok(AssemblyLoadStatus::InvalidFilePath) => Err(LoadError::InvalidFilePath),
        Ok(AssemblyLoadStatus::InvalidAssembly) => Err(LoadError::InvalidAssembly),
        Ok(AssemblyLoadStatus::UnknownError) | Err(_) => Err(LoadError::Unknown),
    }
}

/// Owns every assembly loaded for the bridge, in load order
pub struct AssemblyLoadContext {
    runtime: Runtime,
    name: String,
    collectible: bool,
    assemblies: Vec<ManagedAssembly>,
    index: FxHashMap<ManagedGuid, usize>,
    error: String,
}

impl AssemblyLoadContext {
    /// An empty context
    pub fn new(runtime: Runtime, name: impl Into<String>, collectible: bool) -> Self {
        AssemblyLoadContext {
            runtime,
            name: name.into(),
            collectible,
            assemblies: Vec::new(),
            index: FxHashMap::default(),
            error: String::new(),
        }
    }

    /// Context name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load an assembly from disk.
    ///
    /// The path is made absolute first. On failure the message is also kept
    /// for [`get_error`](Self::get_error).
    pub fn load_assembly(&mut self, path: &Path) -> Result<&mut ManagedAssembly, LoadError> {
        match self.try_load(path) {
            Ok(index) => {
                self.error.clear();
                Ok(&mut self.assemblies[index])
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load assembly");
                self.error = e.to_string();
                Err(e)
            }
        }
    }

    fn try_load(&mut self, path: &Path) -> Result<usize, LoadError> {
        let absolute =
            std::path::absolute(path).map_err(|e| LoadError::BadPath(e.to_string()))?;
        let path_str = ScopedString::new(&absolute.to_string_lossy());

        let id = unsafe {
            (self.runtime.load_managed_assembly)(path_str.get(), bool32(false), bool32(self.collectible))
        };
        let status = load_error(unsafe { (self.runtime.get_last_load_status)() })?;

        if self.index.contains_key(&id) {
            return Err(LoadError::Duplicate);
        }

        let assembly = ManagedAssembly::load(self.runtime.clone(), id, status);
        let index = self.assemblies.len();
        self.assemblies.push(assembly);
        self.index.insert(id, index);
        Ok(index)
    }

    /// Message of the last failed load, empty after a success
    pub fn get_error(&self) -> &str {
        &self.error
    }

    /// Find a loaded assembly
    pub fn find_assembly(&self, id: ManagedGuid) -> Option<&ManagedAssembly> {
        self.index.get(&id).map(|&index| &self.assemblies[index])
    }

    /// Find a loaded assembly for mutation
    pub fn find_assembly_mut(&mut self, id: ManagedGuid) -> Option<&mut ManagedAssembly> {
        let index = *self.index.get(&id)?;
        self.assemblies.get_mut(index)
    }

    /// Loaded assemblies in load order
    pub fn assemblies(&self) -> &[ManagedAssembly] {
        &self.assemblies
    }

    /// Mutable access to every loaded assembly
    pub fn assemblies_mut(&mut self) -> &mut [ManagedAssembly] {
        &mut self.assemblies
    }

    /// Unload every assembly, most recent first
    pub fn unload(&mut self) {
        while let Some(assembly) = self.assemblies.pop() {
            let unloaded = unsafe { (self.runtime.unload_managed_assembly)(assembly.id()) };
            if unloaded == 0 {
                tracing::warn!(assembly = assembly.name(), "Runtime refused to unload assembly");
            }
        }
        self.index.clear();
    }
}

impl std::fmt::Debug for AssemblyLoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblyLoadContext")
            .field("name", &self.name)
            .field("collectible", &self.collectible)
            .field("assemblies", &self.assemblies)
            .finish()
    }
}
