//! Shared types, adapter traits, and core utilities for TreeBranch.
//!
//! This crate holds the configuration tree data model (nodes and the
//! capacities they own), the storage adapter trait consumed by the
//! duplication engine, and the crate-wide error type. Adapter crates depend
//! only on this crate, so they compile in parallel with the engine.

pub mod capacity;
pub mod error;
pub mod event_sink;
pub mod prelude;
pub mod store_adapter;
pub mod tree;
pub mod types;

// vim: ts=4
