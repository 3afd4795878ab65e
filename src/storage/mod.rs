//! Storage layer: store contract, trace registry, feature cache and in-memory store

pub mod cache;
pub mod memory;
pub mod registry;
pub mod store;

pub use cache::*;
pub use memory::*;
pub use registry::*;
pub use store::*;
