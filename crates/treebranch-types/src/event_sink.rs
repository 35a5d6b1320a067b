//! Audit events emitted while capacities are copied

use serde::Serialize;
use std::fmt::Debug;

use crate::capacity::CapacityKind;
use crate::types::RepeatContext;

/// One created capacity copy
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityEvent {
	pub owner_node_id: String,
	pub capacity_id: String,
	pub kind: CapacityKind,
	pub referenced_node_ids: Vec<String>,
	pub repeat_context: Option<RepeatContext>,
}

/// Receives capacity events. Implementations must not fail the duplication.
pub trait CapacityEventSink: Debug + Send + Sync {
	fn record(&self, event: CapacityEvent);
}

// vim: ts=4
