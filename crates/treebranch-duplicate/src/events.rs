//! Capacity event sinks

use parking_lot::Mutex;

use treebranch_types::event_sink::{CapacityEvent, CapacityEventSink};
use treebranch_types::prelude::*;

/// Writes capacity events to the log
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl CapacityEventSink for TracingEventSink {
	fn record(&self, event: CapacityEvent) {
		info!(
			owner = %event.owner_node_id,
			capacity = %event.capacity_id,
			kind = %event.kind,
			refs = ?event.referenced_node_ids,
			repeater = ?event.repeat_context.as_ref().map(|c| c.repeater_node_id.as_str()),
			"capacity copied"
		);
	}
}

/// Keeps capacity events in memory
#[derive(Debug, Default)]
pub struct CollectingEventSink {
	events: Mutex<Vec<CapacityEvent>>,
}

impl CollectingEventSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> Vec<CapacityEvent> {
		self.events.lock().clone()
	}

	pub fn take(&self) -> Vec<CapacityEvent> {
		std::mem::take(&mut *self.events.lock())
	}
}

impl CapacityEventSink for CollectingEventSink {
	fn record(&self, event: CapacityEvent) {
		self.events.lock().push(event);
	}
}

// vim: ts=4
