//! C ABI exported to the managed side
//!
//! Symbol names are fixed by the managed bindings, hence the non-snake-case
//! functions. Strings handed out here are allocated with the C allocator and
//! released by the caller.

#[allow(non_snake_case)]
pub mod aggregate;
#[allow(non_snake_case)]
pub mod call;
#[allow(non_snake_case)]
pub mod plugin;
