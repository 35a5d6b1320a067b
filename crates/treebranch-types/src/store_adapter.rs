//! Adapter that persists configuration trees and their capacities

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Debug;

use crate::prelude::*;
use crate::tree::{
	Condition, DataBlock, Formula, Node, NumberConfig, SelectConfig, Table, TableColumn, TableRow,
	Tree, Variable,
};

/// Options for listing nodes. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ListNodeOptions {
	pub tree_id: Option<String>,
	pub parent_id: Option<String>,
	/// Only nodes whose id starts with this prefix
	pub id_prefix: Option<String>,
	pub ids: Option<Vec<String>>,
}

impl ListNodeOptions {
	pub fn tree(tree_id: impl Into<String>) -> Self {
		Self { tree_id: Some(tree_id.into()), ..Self::default() }
	}

	/// Whether a node passes the filter, for adapters that filter in memory
	pub fn matches(&self, node: &Node) -> bool {
		self.tree_id.as_deref().is_none_or(|t| node.tree_id == t)
			&& self.parent_id.as_deref().is_none_or(|p| node.parent_id.as_deref() == Some(p))
			&& self.id_prefix.as_deref().is_none_or(|p| node.id.starts_with(p))
			&& self.ids.as_ref().is_none_or(|ids| ids.iter().any(|id| *id == node.id))
	}
}

#[derive(Debug, Clone, Default)]
pub struct ListVariableOptions {
	pub node_ids: Option<Vec<String>>,
	pub ids: Option<Vec<String>>,
}

impl ListVariableOptions {
	pub fn matches(&self, variable: &Variable) -> bool {
		self.node_ids.as_ref().is_none_or(|ids| ids.iter().any(|id| *id == variable.node_id))
			&& self.ids.as_ref().is_none_or(|ids| ids.iter().any(|id| *id == variable.id))
	}
}

/// Partial node update
#[derive(Debug, Clone, Default)]
pub struct UpdateNodeData {
	pub parent_id: Patch<String>,
	pub node_type: Patch<String>,
	pub field_type: Patch<String>,
	pub is_visible: Patch<bool>,
	pub is_active: Patch<bool>,
	pub has_formula: Patch<bool>,
	pub has_condition: Patch<bool>,
	pub has_table: Patch<bool>,
	pub has_data: Patch<bool>,
	pub formula_active_id: Patch<String>,
	pub condition_active_id: Patch<String>,
	pub table_active_id: Patch<String>,
	pub data_active_id: Patch<String>,
	pub linked_formula_ids: Patch<Vec<String>>,
	pub linked_condition_ids: Patch<Vec<String>>,
	pub linked_table_ids: Patch<Vec<String>>,
	pub linked_variable_ids: Patch<Vec<String>>,
	pub data: Patch<DataBlock>,
	/// Replaces the whole metadata map
	pub metadata: Patch<Map<String, Value>>,
}

impl UpdateNodeData {
	pub fn is_empty(&self) -> bool {
		self.parent_id.is_undefined()
			&& self.node_type.is_undefined()
			&& self.field_type.is_undefined()
			&& self.is_visible.is_undefined()
			&& self.is_active.is_undefined()
			&& self.has_formula.is_undefined()
			&& self.has_condition.is_undefined()
			&& self.has_table.is_undefined()
			&& self.has_data.is_undefined()
			&& self.formula_active_id.is_undefined()
			&& self.condition_active_id.is_undefined()
			&& self.table_active_id.is_undefined()
			&& self.data_active_id.is_undefined()
			&& self.linked_formula_ids.is_undefined()
			&& self.linked_condition_ids.is_undefined()
			&& self.linked_table_ids.is_undefined()
			&& self.linked_variable_ids.is_undefined()
			&& self.data.is_undefined()
			&& self.metadata.is_undefined()
	}

	pub fn apply_to(&self, node: &mut Node) {
		self.parent_id.apply(&mut node.parent_id);
		self.node_type.apply_value(&mut node.node_type);
		self.field_type.apply(&mut node.field_type);
		self.is_visible.apply_value(&mut node.is_visible);
		self.is_active.apply_value(&mut node.is_active);
		self.has_formula.apply_value(&mut node.has_formula);
		self.has_condition.apply_value(&mut node.has_condition);
		self.has_table.apply_value(&mut node.has_table);
		self.has_data.apply_value(&mut node.has_data);
		self.formula_active_id.apply(&mut node.formula_active_id);
		self.condition_active_id.apply(&mut node.condition_active_id);
		self.table_active_id.apply(&mut node.table_active_id);
		self.data_active_id.apply(&mut node.data_active_id);
		self.linked_formula_ids.apply_value(&mut node.linked_formula_ids);
		self.linked_condition_ids.apply_value(&mut node.linked_condition_ids);
		self.linked_table_ids.apply_value(&mut node.linked_table_ids);
		self.linked_variable_ids.apply_value(&mut node.linked_variable_ids);
		self.data.apply(&mut node.data);
		self.metadata.apply_value(&mut node.metadata);
	}
}

/// Store adapter trait
///
/// Reads return `Ok(None)` for missing records. Creates fail with
/// `Error::DbError` when a record with the same id already exists.
#[async_trait]
pub trait TreeStoreAdapter: Debug + Send + Sync {
	/// # Trees
	async fn read_tree(&self, tree_id: &str) -> TbResult<Option<Tree>>;
	async fn create_tree(&self, tree: &Tree) -> TbResult<()>;

	/// # Nodes
	async fn read_node(&self, node_id: &str) -> TbResult<Option<Node>>;
	async fn list_nodes(&self, opts: &ListNodeOptions) -> TbResult<Vec<Node>>;
	async fn create_node(&self, node: &Node) -> TbResult<()>;
	/// Updates a node. Returns `Error::NotFound` if it does not exist.
	async fn update_node(&self, node_id: &str, data: &UpdateNodeData) -> TbResult<()>;
	/// Deletes a node record. Returns `Error::NotFound` if it does not exist.
	/// Owned capacities are left in place; a store may refuse the delete while
	/// the node still owns a table.
	async fn delete_node(&self, node_id: &str) -> TbResult<()>;

	/// # Formulas
	async fn read_formula(&self, formula_id: &str) -> TbResult<Option<Formula>>;
	async fn list_formulas(&self, node_id: &str) -> TbResult<Vec<Formula>>;
	async fn create_formula(&self, formula: &Formula) -> TbResult<()>;

	/// # Conditions
	async fn read_condition(&self, condition_id: &str) -> TbResult<Option<Condition>>;
	async fn list_conditions(&self, node_id: &str) -> TbResult<Vec<Condition>>;
	async fn create_condition(&self, condition: &Condition) -> TbResult<()>;

	/// # Tables
	async fn read_table(&self, table_id: &str) -> TbResult<Option<Table>>;
	async fn list_tables(&self, node_id: &str) -> TbResult<Vec<Table>>;
	async fn create_table(&self, table: &Table) -> TbResult<()>;
	/// Columns ordered by `column_index`
	async fn list_table_columns(&self, table_id: &str) -> TbResult<Vec<TableColumn>>;
	async fn create_table_column(&self, column: &TableColumn) -> TbResult<()>;
	/// Rows ordered by `row_index`
	async fn list_table_rows(&self, table_id: &str) -> TbResult<Vec<TableRow>>;
	async fn create_table_row(&self, row: &TableRow) -> TbResult<()>;

	/// # Variables
	async fn read_variable(&self, variable_id: &str) -> TbResult<Option<Variable>>;
	async fn list_variables(&self, opts: &ListVariableOptions) -> TbResult<Vec<Variable>>;
	async fn create_variable(&self, variable: &Variable) -> TbResult<()>;

	/// # Select / number configurations
	async fn read_select_config(&self, node_id: &str) -> TbResult<Option<SelectConfig>>;
	async fn create_select_config(&self, config: &SelectConfig) -> TbResult<()>;
	async fn read_number_config(&self, node_id: &str) -> TbResult<Option<NumberConfig>>;
	async fn create_number_config(&self, config: &NumberConfig) -> TbResult<()>;
}


// vim: ts=4
