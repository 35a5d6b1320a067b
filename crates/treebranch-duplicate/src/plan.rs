//! Creation order planning
//!
//! Kahn's algorithm over the parent to child edges inside the subtree. Nodes
//! that become ready together are created in ascending display order.

use itertools::Itertools;
use std::collections::{HashMap, VecDeque};

use crate::collect::Subtree;
use treebranch_types::tree::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationPlan {
	pub order: Vec<String>,
	/// The parent links did not form a DAG, depth ordering was used instead
	pub fallback: bool,
}

fn display_order(nodes: &HashMap<String, Node>, a: &str, b: &str) -> std::cmp::Ordering {
	let key = |id: &str| nodes.get(id).map_or(0, |n| n.order);
	key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

pub fn plan_creation(subtree: &Subtree, nodes: &HashMap<String, Node>) -> CreationPlan {
	let count = subtree.len();
	let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(count);
	let mut children: HashMap<&str, Vec<&str>> = HashMap::with_capacity(count);

	for id in subtree.ids() {
		let parent = nodes.get(id).and_then(|n| n.parent_id.as_deref()).filter(|p| subtree.contains(p));
		match parent {
			Some(parent) => {
				in_degree.insert(id, 1);
				children.entry(parent).or_default().push(id);
			}
			None => {
				in_degree.insert(id, 0);
			}
		}
	}

	let mut queue: VecDeque<&str> = subtree
		.ids()
		.iter()
		.map(String::as_str)
		.filter(|id| in_degree.get(id) == Some(&0))
		.sorted_by(|a, b| display_order(nodes, a, b))
		.collect();
	let mut order = Vec::with_capacity(count);

	while let Some(id) = queue.pop_front() {
		order.push(id.to_string());
		let mut ready = Vec::new();
		for child in children.get(id).into_iter().flatten() {
			if let Some(degree) = in_degree.get_mut(child) {
				*degree = degree.saturating_sub(1);
				if *degree == 0 {
					ready.push(*child);
				}
			}
		}
		queue.extend(ready.into_iter().sorted_by(|a, b| display_order(nodes, a, b)));
	}

	if order.len() == count {
		return CreationPlan { order, fallback: false };
	}
	CreationPlan { order: depth_order(subtree, &children), fallback: true }
}

/// Orders by distance from the root, then by id
fn depth_order(subtree: &Subtree, children: &HashMap<&str, Vec<&str>>) -> Vec<String> {
	let mut depth: HashMap<&str, usize> = HashMap::new();
	let mut queue = VecDeque::from([(subtree.root_id(), 0usize)]);
	while let Some((id, d)) = queue.pop_front() {
		if depth.contains_key(id) {
			continue;
		}
		depth.insert(id, d);
		for child in children.get(id).into_iter().flatten() {
			queue.push_back((*child, d + 1));
		}
	}

	let key = |id: &str| depth.get(id).copied().unwrap_or(usize::MAX);
	subtree
		.ids()
		.iter()
		.sorted_by(|a, b| key(a).cmp(&key(b)).then_with(|| a.cmp(b)))
		.cloned()
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::collect::{child_adjacency, collect_subtree};

	fn node(id: &str, parent: Option<&str>, order: i64) -> Node {
		Node {
			id: id.into(),
			tree_id: "t".into(),
			parent_id: parent.map(Into::into),
			order,
			..Node::default()
		}
	}

	fn plan(nodes: Vec<Node>, root: &str) -> CreationPlan {
		let children = child_adjacency(&nodes);
		let subtree = collect_subtree(root, &children);
		let by_id = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
		plan_creation(&subtree, &by_id)
	}

	#[test]
	fn test_parent_before_child() {
		let nodes = vec![
			node("outside", None, 0),
			node("root", Some("outside"), 0),
			node("b", Some("root"), 1),
			node("a", Some("root"), 2),
			node("b1", Some("b"), 0),
			node("a1", Some("a"), 0),
			node("a2", Some("a1"), 0),
		];
		let parents: HashMap<String, Option<String>> =
			nodes.iter().map(|n| (n.id.clone(), n.parent_id.clone())).collect();
		let plan = plan(nodes, "root");
		assert!(!plan.fallback);
		assert_eq!(plan.order.len(), 6);

		for (pos, id) in plan.order.iter().enumerate() {
			if let Some(Some(parent)) = parents.get(id) {
				if let Some(parent_pos) = plan.order.iter().position(|p| p == parent) {
					assert!(parent_pos < pos, "{} created before its parent {}", id, parent);
				}
			}
		}
	}

	#[test]
	fn test_siblings_by_display_order() {
		let nodes = vec![
			node("root", None, 0),
			node("z", Some("root"), 0),
			node("y", Some("root"), 2),
			node("x", Some("root"), 1),
		];
		assert_eq!(plan(nodes, "root").order, vec!["root", "z", "x", "y"]);
	}

	#[test]
	fn test_cycle_falls_back_to_depth() {
		// root's parent is its own grandchild
		let nodes = vec![
			node("root", Some("c"), 0),
			node("b", Some("root"), 0),
			node("a", Some("root"), 0),
			node("c", Some("b"), 0),
		];
		let plan = plan(nodes, "root");
		assert!(plan.fallback);
		assert_eq!(plan.order, vec!["root", "a", "b", "c"]);
	}
}

// vim: ts=4
