//! Configuration tree data model
//!
//! A tree is made of nodes. Each node may own capacities (formulas,
//! conditions, tables, variables, select/number configurations) and may
//! reference other nodes' capacities by identifier, either through its
//! typed configuration blocks or through free-form JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::capacity::{Capacity, CapacitySet};

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
	pub id: String,
	pub organization_id: Option<String>,
	pub name: String,
}

// Node //
//******//

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
	pub id: String,
	pub tree_id: String,
	pub parent_id: Option<String>,
	#[serde(rename = "type")]
	pub node_type: String,
	pub sub_type: Option<String>,
	pub field_type: Option<String>,
	pub label: String,
	pub description: Option<String>,
	#[serde(default)]
	pub order: i64,

	#[serde(default)]
	pub is_visible: bool,
	#[serde(default)]
	pub is_required: bool,
	#[serde(default)]
	pub is_active: bool,
	#[serde(default)]
	pub is_multiple: bool,

	// Capacity flags
	#[serde(default)]
	pub has_formula: bool,
	#[serde(default)]
	pub has_condition: bool,
	#[serde(default)]
	pub has_table: bool,
	#[serde(default)]
	pub has_data: bool,
	#[serde(default)]
	pub has_api: bool,
	#[serde(default)]
	pub has_link: bool,
	#[serde(default)]
	pub has_markers: bool,

	// Active capacity pointers
	pub formula_active_id: Option<String>,
	pub condition_active_id: Option<String>,
	pub table_active_id: Option<String>,
	pub data_active_id: Option<String>,

	// Linked capacities, in display order
	#[serde(default)]
	pub linked_formula_ids: Vec<String>,
	#[serde(default)]
	pub linked_condition_ids: Vec<String>,
	#[serde(default)]
	pub linked_table_ids: Vec<String>,
	#[serde(default)]
	pub linked_variable_ids: Vec<String>,

	pub default_value: Option<String>,
	pub calculated_value: Option<String>,

	// Shared references
	#[serde(default)]
	pub is_shared_reference: bool,
	pub shared_reference_id: Option<String>,
	#[serde(default)]
	pub shared_reference_ids: Vec<String>,
	pub shared_reference_name: Option<String>,

	// Configuration blocks
	pub appearance: Option<Value>,
	pub text: Option<TextConfig>,
	pub number: Option<NumberBlock>,
	pub select: Option<SelectBlock>,
	pub table: Option<TableInstanceBlock>,
	pub link: Option<LinkBlock>,
	pub repeater: Option<RepeaterBlock>,
	pub ai: Option<AiAssistBlock>,
	pub data: Option<DataBlock>,

	#[serde(default)]
	pub metadata: Map<String, Value>,
}

impl Node {
	/// Capacity set derived from the `has*` flags
	pub fn capacities(&self) -> CapacitySet {
		let flags = [
			(self.has_formula, Capacity::Formula),
			(self.has_condition, Capacity::Condition),
			(self.has_table, Capacity::Table),
			(self.has_data, Capacity::Data),
			(self.has_api, Capacity::Api),
			(self.has_link, Capacity::Link),
			(self.has_markers, Capacity::Markers),
		];
		flags.into_iter().filter(|(on, _)| *on).map(|(_, capacity)| capacity).collect()
	}
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextConfig {
	pub placeholder: Option<String>,
	pub min_length: Option<i64>,
	pub max_length: Option<i64>,
	pub mask: Option<String>,
	pub regex: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberBlock {
	pub min: Option<f64>,
	pub max: Option<f64>,
	pub step: Option<f64>,
	pub decimals: Option<i64>,
	pub unit: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBlock {
	/// Option source, e.g. `@table.<tableId>`
	pub source: Option<String>,
	pub options: Option<Value>,
	#[serde(default)]
	pub multiple: bool,
	#[serde(default)]
	pub searchable: bool,
	#[serde(default)]
	pub allow_custom: bool,
	pub default_value: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInstanceBlock {
	pub name: Option<String>,
	/// Object keyed by table id, each entry carrying a `tableId`
	pub instances: Option<Value>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkBlock {
	pub target_node_id: Option<String>,
	pub target_tree_id: Option<String>,
	pub mode: Option<String>,
	#[serde(default)]
	pub carry_context: bool,
	pub params: Option<Value>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeaterBlock {
	#[serde(default)]
	pub template_node_ids: Vec<String>,
	pub min_items: Option<i64>,
	pub max_items: Option<i64>,
	pub add_button_label: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAssistBlock {
	#[serde(default)]
	pub enabled: bool,
	pub prompt: Option<String>,
	pub model: Option<String>,
}

/// Display settings of the node's active variable
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBlock {
	pub exposed_key: Option<String>,
	pub display_format: Option<String>,
	pub unit: Option<String>,
	pub precision: Option<i64>,
	#[serde(default)]
	pub visible_to_user: bool,
}

// Capacities //
//************//

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formula {
	pub id: String,
	pub node_id: String,
	pub organization_id: Option<String>,
	pub name: String,
	#[serde(default)]
	pub tokens: Vec<Value>,
	pub description: Option<String>,
	#[serde(default)]
	pub is_default: bool,
	#[serde(default)]
	pub order: i64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
	pub id: String,
	pub node_id: String,
	pub organization_id: Option<String>,
	pub name: String,
	#[serde(default)]
	pub condition_set: Value,
	pub description: Option<String>,
	#[serde(default)]
	pub is_default: bool,
	#[serde(default)]
	pub order: i64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
	pub id: String,
	pub node_id: String,
	pub organization_id: Option<String>,
	pub name: String,
	pub description: Option<String>,
	#[serde(rename = "type")]
	pub table_type: String,
	#[serde(default)]
	pub row_count: i64,
	#[serde(default)]
	pub column_count: i64,
	/// Lookup configuration
	#[serde(default)]
	pub meta: Value,
	#[serde(default)]
	pub is_default: bool,
	#[serde(default)]
	pub order: i64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
	pub id: String,
	pub table_id: String,
	pub column_index: i64,
	pub name: String,
	#[serde(rename = "type")]
	pub column_type: String,
	pub width: Option<i64>,
	pub format: Option<String>,
	#[serde(default)]
	pub metadata: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
	pub id: String,
	pub table_id: String,
	pub row_index: i64,
	#[serde(default)]
	pub cells: Value,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
	pub id: String,
	pub node_id: String,
	pub exposed_key: String,
	pub display_name: String,
	pub display_format: Option<String>,
	pub unit: Option<String>,
	pub precision: Option<i64>,
	#[serde(default)]
	pub visible_to_user: bool,
	#[serde(default)]
	pub is_readonly: bool,
	pub default_value: Option<String>,
	pub fixed_value: Option<String>,
	pub selected_node_id: Option<String>,
	/// `node-formula:<id>`, `condition:<id>`, `@table.<id>` or a node id
	pub source_ref: Option<String>,
	pub source_type: Option<String>,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectConfig {
	pub id: String,
	pub node_id: String,
	pub options: Option<Value>,
	#[serde(default)]
	pub multiple: bool,
	#[serde(default)]
	pub searchable: bool,
	#[serde(default)]
	pub allow_custom: bool,
	pub max_selections: Option<i64>,
	pub options_source: Option<String>,
	pub api_endpoint: Option<String>,
	pub table_reference: Option<String>,
	pub key_column: Option<String>,
	pub value_column: Option<String>,
	pub display_column: Option<String>,
	pub display_row: Option<String>,
	pub depends_on_node_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberConfig {
	pub id: String,
	pub node_id: String,
	pub min: Option<f64>,
	pub max: Option<f64>,
	pub step: Option<f64>,
	pub decimals: Option<i64>,
	pub unit: Option<String>,
	pub prefix: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_node_capacities() {
		let node = Node { has_formula: true, has_data: true, ..Node::default() };
		let caps = node.capacities();
		assert!(caps.contains(Capacity::Formula));
		assert!(caps.contains(Capacity::Data));
		assert!(!caps.contains(Capacity::Condition));
	}

	#[test]
	fn test_node_serde_names() {
		let node: Node = serde_json::from_value(json!({
			"id": "n1",
			"treeId": "t1",
			"type": "leaf_field",
			"label": "Width",
			"hasFormula": true,
			"linkedFormulaIds": ["f2", "f1"]
		}))
		.unwrap();
		assert_eq!(node.node_type, "leaf_field");
		assert!(node.has_formula);
		assert_eq!(node.linked_formula_ids, vec!["f2", "f1"]);

		let value = serde_json::to_value(&node).unwrap();
		assert_eq!(value["treeId"], "t1");
		assert!(value.get("parentId").is_none());
	}
}

// vim: ts=4
