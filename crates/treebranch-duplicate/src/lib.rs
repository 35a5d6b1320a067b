//! Subtree duplication engine for TreeBranch configuration trees.
//!
//! [`duplicate_subtree`] copies a node, its descendants and every capacity
//! they own (formulas, conditions, tables, variables, select and number
//! configurations). References between copied records are rewritten so the
//! copy works on its own, references leaving the subtree are resolved by
//! policy. Copies are named with a suffix token, and running the same
//! duplication twice reuses the copies of the first run.

pub(crate) mod capacity;
pub mod collect;
pub mod context;
pub mod events;
pub(crate) mod node_clone;
pub mod options;
pub(crate) mod parent;
pub mod plan;
pub mod reference;
pub mod service;
pub mod suffix;
pub(crate) mod sync;

pub use context::{DanglingReference, DuplicateResult, SkippedCapacity};
pub use events::{CollectingEventSink, TracingEventSink};
pub use options::{DuplicateOptions, DuplicatorConfig};
pub use service::{Engine, duplicate_subtree};
pub use suffix::SuffixPolicy;

// vim: ts=4
