//! Subtree collection

use std::collections::{HashMap, HashSet, VecDeque};

use treebranch_types::tree::Node;

/// Node ids reachable from a root through child links
#[derive(Debug, Clone)]
pub struct Subtree {
	root_id: String,
	/// Breadth-first discovery order, root first
	ids: Vec<String>,
	members: HashSet<String>,
}

impl Subtree {
	pub fn root_id(&self) -> &str {
		&self.root_id
	}

	pub fn ids(&self) -> &[String] {
		&self.ids
	}

	pub fn contains(&self, id: &str) -> bool {
		self.members.contains(id)
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}
}

/// Groups node ids by parent id
pub fn child_adjacency<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> HashMap<String, Vec<String>> {
	let mut children: HashMap<String, Vec<String>> = HashMap::new();
	for node in nodes {
		if let Some(parent_id) = &node.parent_id {
			children.entry(parent_id.clone()).or_default().push(node.id.clone());
		}
	}
	children
}

/// Breadth-first collection of `root_id` and all its descendants
///
/// Every id is visited once, so duplicate edges and cycles in the adjacency
/// data do not cause repeated visits.
pub fn collect_subtree(root_id: &str, children: &HashMap<String, Vec<String>>) -> Subtree {
	let mut ids = Vec::new();
	let mut members = HashSet::new();
	let mut queue = VecDeque::from([root_id.to_string()]);
	members.insert(root_id.to_string());

	while let Some(id) = queue.pop_front() {
		if let Some(kids) = children.get(&id) {
			for kid in kids {
				if members.insert(kid.clone()) {
					queue.push_back(kid.clone());
				}
			}
		}
		ids.push(id);
	}

	Subtree { root_id: root_id.to_string(), ids, members }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn adjacency(edges: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
		let mut children: HashMap<String, Vec<String>> = HashMap::new();
		for (parent, child) in edges {
			children.entry((*parent).to_string()).or_default().push((*child).to_string());
		}
		children
	}

	#[test]
	fn test_collect_descendants() {
		let children = adjacency(&[("r", "a"), ("r", "b"), ("a", "c"), ("x", "y")]);
		let subtree = collect_subtree("r", &children);
		assert_eq!(subtree.ids(), ["r", "a", "b", "c"]);
		assert!(subtree.contains("c"));
		assert!(!subtree.contains("y"));
	}

	#[test]
	fn test_collect_malformed_adjacency() {
		let children = adjacency(&[("r", "a"), ("r", "a"), ("a", "r"), ("a", "b"), ("b", "a")]);
		let subtree = collect_subtree("r", &children);
		assert_eq!(subtree.len(), 3);
		assert_eq!(subtree.ids(), ["r", "a", "b"]);
	}

	#[test]
	fn test_collect_leaf() {
		let subtree = collect_subtree("leaf", &HashMap::new());
		assert_eq!(subtree.ids(), ["leaf"]);
		assert_eq!(subtree.root_id(), "leaf");
	}
}

// vim: ts=4
