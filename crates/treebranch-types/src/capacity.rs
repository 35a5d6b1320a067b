//! Capacity flags of a node and the record kinds a node can own

use serde::{Deserialize, Serialize};
use std::fmt;

/// Behaviors a node can carry, mirrored from the `has*` flags of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capacity {
	Formula,
	Condition,
	Table,
	Data,
	Api,
	Link,
	Markers,
}

impl Capacity {
	pub const ALL: [Capacity; 7] = [
		Capacity::Formula,
		Capacity::Condition,
		Capacity::Table,
		Capacity::Data,
		Capacity::Api,
		Capacity::Link,
		Capacity::Markers,
	];

	fn bit(self) -> u8 {
		1 << (self as u8)
	}
}

/// Small set of capacities, computed once per node
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapacitySet(u8);

impl CapacitySet {
	pub fn empty() -> Self {
		Self(0)
	}

	pub fn insert(&mut self, capacity: Capacity) {
		self.0 |= capacity.bit();
	}

	pub fn with(mut self, capacity: Capacity) -> Self {
		self.insert(capacity);
		self
	}

	pub fn contains(self, capacity: Capacity) -> bool {
		self.0 & capacity.bit() != 0
	}

	pub fn is_empty(self) -> bool {
		self.0 == 0
	}

	/// True if any of the capacities producing a computed value is present
	pub fn is_computed(self) -> bool {
		self.contains(Capacity::Formula)
			|| self.contains(Capacity::Condition)
			|| self.contains(Capacity::Table)
	}

	pub fn iter(self) -> impl Iterator<Item = Capacity> {
		Capacity::ALL.into_iter().filter(move |c| self.contains(*c))
	}
}

impl FromIterator<Capacity> for CapacitySet {
	fn from_iter<I: IntoIterator<Item = Capacity>>(iter: I) -> Self {
		let mut set = Self::empty();
		for capacity in iter {
			set.insert(capacity);
		}
		set
	}
}

impl fmt::Debug for CapacitySet {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_set().entries(self.iter()).finish()
	}
}

/// Record classes the duplication engine copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapacityKind {
	Formula,
	Condition,
	Table,
	Variable,
	SelectConfig,
	NumberConfig,
}

impl fmt::Display for CapacityKind {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			CapacityKind::Formula => "formula",
			CapacityKind::Condition => "condition",
			CapacityKind::Table => "table",
			CapacityKind::Variable => "variable",
			CapacityKind::SelectConfig => "select-config",
			CapacityKind::NumberConfig => "number-config",
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_capacity_set() {
		let set: CapacitySet = [Capacity::Formula, Capacity::Data].into_iter().collect();
		assert!(set.contains(Capacity::Formula));
		assert!(set.contains(Capacity::Data));
		assert!(!set.contains(Capacity::Table));
		assert!(set.is_computed());
		assert_eq!(set.iter().collect::<Vec<_>>(), vec![Capacity::Formula, Capacity::Data]);

		let plain = CapacitySet::empty().with(Capacity::Link);
		assert!(!plain.is_computed());
		assert!(CapacitySet::empty().is_empty());
	}
}

// vim: ts=4
