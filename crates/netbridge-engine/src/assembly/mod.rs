//! Assembly loader and internal-call registry

mod context;
mod managed_assembly;

pub use context::AssemblyLoadContext;
pub use managed_assembly::ManagedAssembly;
