#![forbid(unsafe_code)]

//! In-memory implementation of `TreeStoreAdapter`.
//!
//! Records live in ordered maps behind one async lock. Creating a record
//! whose id is already taken fails like a primary key violation would.
//! Record ids can be marked as failing to exercise error paths.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use treebranch_types::prelude::*;
use treebranch_types::store_adapter::*;
use treebranch_types::tree::*;

#[derive(Debug, Default)]
struct Records {
	trees: BTreeMap<String, Tree>,
	nodes: BTreeMap<String, Node>,
	formulas: BTreeMap<String, Formula>,
	conditions: BTreeMap<String, Condition>,
	tables: BTreeMap<String, Table>,
	columns: BTreeMap<String, TableColumn>,
	rows: BTreeMap<String, TableRow>,
	variables: BTreeMap<String, Variable>,
	select_configs: BTreeMap<String, SelectConfig>,
	number_configs: BTreeMap<String, NumberConfig>,
	failing: HashSet<String>,
}

/// Number of stored records per entity class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
	pub nodes: usize,
	pub formulas: usize,
	pub conditions: usize,
	pub tables: usize,
	pub columns: usize,
	pub rows: usize,
	pub variables: usize,
	pub select_configs: usize,
	pub number_configs: usize,
}

#[derive(Debug, Default, Clone)]
pub struct TreeStoreAdapterMemory {
	records: Arc<RwLock<Records>>,
}

impl TreeStoreAdapterMemory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every later create or update of a record with this id fail
	pub async fn fail_on_create(&self, id: impl Into<String>) {
		self.records.write().await.failing.insert(id.into());
	}

	pub async fn counts(&self) -> StoreCounts {
		let records = self.records.read().await;
		StoreCounts {
			nodes: records.nodes.len(),
			formulas: records.formulas.len(),
			conditions: records.conditions.len(),
			tables: records.tables.len(),
			columns: records.columns.len(),
			rows: records.rows.len(),
			variables: records.variables.len(),
			select_configs: records.select_configs.len(),
			number_configs: records.number_configs.len(),
		}
	}
}

/// Inserts `record` under `id`, failing on a taken or failing id
fn insert<T: Clone>(
	map: &mut BTreeMap<String, T>,
	failing: &HashSet<String>,
	id: &str,
	record: &T,
) -> TbResult<()> {
	if failing.contains(id) {
		debug!(id = %id, "injected create failure");
		return Err(Error::DbError);
	}
	if map.contains_key(id) {
		debug!(id = %id, "duplicate id");
		return Err(Error::DbError);
	}
	map.insert(id.to_string(), record.clone());
	Ok(())
}

/// Records of `map` selected by `filter`, in `(order, id)` order
fn sorted_by_order<T: Clone>(
	map: &BTreeMap<String, T>,
	filter: impl Fn(&T) -> bool,
	order: impl Fn(&T) -> i64,
) -> Vec<T> {
	let mut out: Vec<T> = map.values().filter(|r| filter(r)).cloned().collect();
	// Stable sort keeps the id order among equal keys
	out.sort_by_key(order);
	out
}

#[async_trait]
impl TreeStoreAdapter for TreeStoreAdapterMemory {
	async fn read_tree(&self, tree_id: &str) -> TbResult<Option<Tree>> {
		Ok(self.records.read().await.trees.get(tree_id).cloned())
	}

	async fn create_tree(&self, tree: &Tree) -> TbResult<()> {
		let mut records = self.records.write().await;
		let Records { trees, failing, .. } = &mut *records;
		insert(trees, failing, &tree.id, tree)
	}

	async fn read_node(&self, node_id: &str) -> TbResult<Option<Node>> {
		Ok(self.records.read().await.nodes.get(node_id).cloned())
	}

	async fn list_nodes(&self, opts: &ListNodeOptions) -> TbResult<Vec<Node>> {
		let records = self.records.read().await;
		Ok(sorted_by_order(&records.nodes, |n| opts.matches(n), |n| n.order))
	}

	async fn create_node(&self, node: &Node) -> TbResult<()> {
		let mut records = self.records.write().await;
		let Records { nodes, failing, .. } = &mut *records;
		insert(nodes, failing, &node.id, node)
	}

	async fn update_node(&self, node_id: &str, data: &UpdateNodeData) -> TbResult<()> {
		let mut records = self.records.write().await;
		if records.failing.contains(node_id) {
			return Err(Error::DbError);
		}
		let node = records.nodes.get_mut(node_id).ok_or(Error::NotFound)?;
		data.apply_to(node);
		Ok(())
	}

	async fn delete_node(&self, node_id: &str) -> TbResult<()> {
		self.records.write().await.nodes.remove(node_id).map(|_| ()).ok_or(Error::NotFound)
	}

	async fn read_formula(&self, formula_id: &str) -> TbResult<Option<Formula>> {
		Ok(self.records.read().await.formulas.get(formula_id).cloned())
	}

	async fn list_formulas(&self, node_id: &str) -> TbResult<Vec<Formula>> {
		let records = self.records.read().await;
		Ok(sorted_by_order(&records.formulas, |f| f.node_id == node_id, |f| f.order))
	}

	async fn create_formula(&self, formula: &Formula) -> TbResult<()> {
		let mut records = self.records.write().await;
		let Records { formulas, failing, .. } = &mut *records;
		insert(formulas, failing, &formula.id, formula)
	}

	async fn read_condition(&self, condition_id: &str) -> TbResult<Option<Condition>> {
		Ok(self.records.read().await.conditions.get(condition_id).cloned())
	}

	async fn list_conditions(&self, node_id: &str) -> TbResult<Vec<Condition>> {
		let records = self.records.read().await;
		Ok(sorted_by_order(&records.conditions, |c| c.node_id == node_id, |c| c.order))
	}

	async fn create_condition(&self, condition: &Condition) -> TbResult<()> {
		let mut records = self.records.write().await;
		let Records { conditions, failing, .. } = &mut *records;
		insert(conditions, failing, &condition.id, condition)
	}

	async fn read_table(&self, table_id: &str) -> TbResult<Option<Table>> {
		Ok(self.records.read().await.tables.get(table_id).cloned())
	}

	async fn list_tables(&self, node_id: &str) -> TbResult<Vec<Table>> {
		let records = self.records.read().await;
		Ok(sorted_by_order(&records.tables, |t| t.node_id == node_id, |t| t.order))
	}

	async fn create_table(&self, table: &Table) -> TbResult<()> {
		let mut records = self.records.write().await;
		if !records.nodes.contains_key(&table.node_id) {
			debug!(table_id = %table.id, node_id = %table.node_id, "table owner missing");
			return Err(Error::DbError);
		}
		let Records { tables, failing, .. } = &mut *records;
		insert(tables, failing, &table.id, table)
	}

	async fn list_table_columns(&self, table_id: &str) -> TbResult<Vec<TableColumn>> {
		let records = self.records.read().await;
		Ok(sorted_by_order(&records.columns, |c| c.table_id == table_id, |c| c.column_index))
	}

	async fn create_table_column(&self, column: &TableColumn) -> TbResult<()> {
		let mut records = self.records.write().await;
		let Records { columns, failing, .. } = &mut *records;
		insert(columns, failing, &column.id, column)
	}

	async fn list_table_rows(&self, table_id: &str) -> TbResult<Vec<TableRow>> {
		let records = self.records.read().await;
		Ok(sorted_by_order(&records.rows, |r| r.table_id == table_id, |r| r.row_index))
	}

	async fn create_table_row(&self, row: &TableRow) -> TbResult<()> {
		let mut records = self.records.write().await;
		let Records { rows, failing, .. } = &mut *records;
		insert(rows, failing, &row.id, row)
	}

	async fn read_variable(&self, variable_id: &str) -> TbResult<Option<Variable>> {
		Ok(self.records.read().await.variables.get(variable_id).cloned())
	}

	async fn list_variables(&self, opts: &ListVariableOptions) -> TbResult<Vec<Variable>> {
		let records = self.records.read().await;
		Ok(records.variables.values().filter(|v| opts.matches(v)).cloned().collect())
	}

	async fn create_variable(&self, variable: &Variable) -> TbResult<()> {
		let mut records = self.records.write().await;
		let Records { variables, failing, .. } = &mut *records;
		insert(variables, failing, &variable.id, variable)
	}

	async fn read_select_config(&self, node_id: &str) -> TbResult<Option<SelectConfig>> {
		let records = self.records.read().await;
		Ok(records.select_configs.values().find(|c| c.node_id == node_id).cloned())
	}

	async fn create_select_config(&self, config: &SelectConfig) -> TbResult<()> {
		let mut records = self.records.write().await;
		if records.select_configs.values().any(|c| c.node_id == config.node_id) {
			return Err(Error::DbError);
		}
		let Records { select_configs, failing, .. } = &mut *records;
		insert(select_configs, failing, &config.id, config)
	}

	async fn read_number_config(&self, node_id: &str) -> TbResult<Option<NumberConfig>> {
		let records = self.records.read().await;
		Ok(records.number_configs.values().find(|c| c.node_id == node_id).cloned())
	}

	async fn create_number_config(&self, config: &NumberConfig) -> TbResult<()> {
		let mut records = self.records.write().await;
		if records.number_configs.values().any(|c| c.node_id == config.node_id) {
			return Err(Error::DbError);
		}
		let Records { number_configs, failing, .. } = &mut *records;
		insert(number_configs, failing, &config.id, config)
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use super::*;
	use serde_json::json;

	fn node(id: &str, parent: Option<&str>, order: i64) -> Node {
		Node {
			id: id.into(),
			tree_id: "t1".into(),
			parent_id: parent.map(Into::into),
			label: id.into(),
			order,
			..Node::default()
		}
	}

	#[tokio::test]
	async fn test_create_rejects_duplicate_id() {
		let store = TreeStoreAdapterMemory::new();
		store.create_node(&node("a", None, 0)).await.unwrap();
		assert!(matches!(store.create_node(&node("a", None, 1)).await, Err(Error::DbError)));
		assert_eq!(store.counts().await.nodes, 1);
	}

	#[tokio::test]
	async fn test_list_nodes_by_order() {
		let store = TreeStoreAdapterMemory::new();
		store.create_node(&node("root", None, 0)).await.unwrap();
		store.create_node(&node("b", Some("root"), 2)).await.unwrap();
		store.create_node(&node("a", Some("root"), 2)).await.unwrap();
		store.create_node(&node("c", Some("root"), 1)).await.unwrap();

		let opts = ListNodeOptions { parent_id: Some("root".into()), ..ListNodeOptions::default() };
		let ids: Vec<String> = store.list_nodes(&opts).await.unwrap().into_iter().map(|n| n.id).collect();
		assert_eq!(ids, vec!["c", "a", "b"]);
	}

	#[tokio::test]
	async fn test_update_node() {
		let store = TreeStoreAdapterMemory::new();
		store.create_node(&node("a", None, 0)).await.unwrap();
		let update = UpdateNodeData {
			has_formula: Patch::Value(true),
			formula_active_id: Patch::Value("f1".into()),
			..UpdateNodeData::default()
		};
		store.update_node("a", &update).await.unwrap();
		let a = store.read_node("a").await.unwrap().unwrap();
		assert!(a.has_formula);
		assert_eq!(a.formula_active_id.as_deref(), Some("f1"));

		assert!(matches!(store.update_node("missing", &update).await, Err(Error::NotFound)));
	}

	#[tokio::test]
	async fn test_table_requires_owner() {
		let store = TreeStoreAdapterMemory::new();
		let table = Table { id: "tbl".into(), node_id: "a".into(), meta: json!({}), ..Table::default() };
		assert!(store.create_table(&table).await.is_err());
		store.create_node(&node("a", None, 0)).await.unwrap();
		store.create_table(&table).await.unwrap();
		assert_eq!(store.list_tables("a").await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_fail_on_create() {
		let store = TreeStoreAdapterMemory::new();
		store.fail_on_create("f1").await;
		let formula = Formula { id: "f1".into(), node_id: "a".into(), ..Formula::default() };
		assert!(store.create_formula(&formula).await.is_err());
		assert_eq!(store.counts().await.formulas, 0);
	}

	#[tokio::test]
	async fn test_one_select_config_per_node() {
		let store = TreeStoreAdapterMemory::new();
		let config = SelectConfig { id: "s1".into(), node_id: "a".into(), ..SelectConfig::default() };
		store.create_select_config(&config).await.unwrap();
		let again = SelectConfig { id: "s2".into(), ..config };
		assert!(store.create_select_config(&again).await.is_err());
		assert_eq!(store.read_select_config("a").await.unwrap().unwrap().id, "s1");
	}
}

// vim: ts=4
