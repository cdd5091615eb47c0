//! Marshaling taxonomy
//!
//! Decides, per value category, how a value crosses the dispatch boundary
//! (by slot address or by the pointer stored in the slot) and how native
//! object storage is constructed and destroyed.

pub mod category;
pub mod pack;
pub mod storage;

pub use category::{arg_passing, classify, ArgPassing, BoundaryClass};
pub use pack::pack_args;
pub use storage::{construct_default, destroy_in_place, object_size};
