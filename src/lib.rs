//! Shaktris (workspace facade crate).
//!
//! Re-exports the member crates as `shaktris::{core, adapter, types}` so tests,
//! benches and the binary share one import path.

pub use shaktris_adapter as adapter;
pub use shaktris_core as core;
pub use shaktris_types as types;
