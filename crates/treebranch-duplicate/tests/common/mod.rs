//! Shared fixtures for duplication tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use serde_json::{Value, json};
use std::sync::Arc;

use treebranch_duplicate::{CollectingEventSink, Engine};
use treebranch_store_adapter_memory::TreeStoreAdapterMemory;
use treebranch_types::store_adapter::TreeStoreAdapter;
use treebranch_types::tree::*;
use treebranch_types::types::AuthCtx;

pub const TREE_ID: &str = "t1";
pub const ORG_ID: &str = "org1";

pub fn setup_test_logging() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}

pub struct Fixture {
	pub store: Arc<TreeStoreAdapterMemory>,
	pub events: Arc<CollectingEventSink>,
	pub engine: Engine,
}

impl Fixture {
	/// An empty tree owned by `ORG_ID`
	pub async fn new() -> Self {
		setup_test_logging();
		let store = Arc::new(TreeStoreAdapterMemory::new());
		let events = Arc::new(CollectingEventSink::new());
		let engine = Engine::new(store.clone()).with_event_sink(events.clone());
		let tree = Tree { id: TREE_ID.into(), organization_id: Some(ORG_ID.into()), name: "Quote".into() };
		store.create_tree(&tree).await.expect("create tree");
		Self { store, events, engine }
	}

	/// The base form used by most tests
	///
	/// ```text
	/// sec (section)
	/// ├── grp (branch)
	/// │   ├── width   formula f_w = @value.height * 2, variable v_w
	/// │   └── height
	/// └── ext_owner   owns table tbl_ext and variable v_ext
	/// ```
	pub async fn form() -> Self {
		let fx = Self::new().await;
		fx.add_node(node("sec", None, 0, "section")).await;
		fx.add_node(node("grp", Some("sec"), 0, "branch")).await;
		fx.add_node(Node {
			has_formula: true,
			has_data: true,
			formula_active_id: Some("f_w".into()),
			linked_formula_ids: vec!["f_w".into()],
			data_active_id: Some("v_w".into()),
			calculated_value: Some("84".into()),
			..node("width", Some("grp"), 0, "leaf_field")
		})
		.await;
		fx.add_node(node("height", Some("grp"), 1, "leaf_field")).await;
		fx.add_node(Node { has_table: true, has_data: true, ..node("ext_owner", Some("sec"), 1, "leaf_field") })
			.await;

		fx.add_formula(formula("f_w", "width", 0, vec![json!("@value.height"), json!("*"), json!(2)])).await;
		fx.add_variable(variable("v_w", "width", "width_key", Some("node-formula:f_w"))).await;
		fx.add_variable(variable("v_ext", "ext_owner", "ext_key", None)).await;
		fx.add_table(
			Table {
				meta: json!({"lookup": {"displayColumn": "Name"}}),
				..table("tbl_ext", "ext_owner")
			},
			&["Name", "100"],
			&[json!(["A", 1]), json!(["B", 2])],
		)
		.await;
		fx
	}

	pub async fn add_node(&self, node: Node) {
		self.store.create_node(&node).await.expect("create node");
	}

	pub async fn add_formula(&self, formula: Formula) {
		self.store.create_formula(&formula).await.expect("create formula");
	}

	pub async fn add_condition(&self, condition: Condition) {
		self.store.create_condition(&condition).await.expect("create condition");
	}

	pub async fn add_variable(&self, variable: Variable) {
		self.store.create_variable(&variable).await.expect("create variable");
	}

	/// Adds a table with one column per name and the given row cells
	pub async fn add_table(&self, table: Table, columns: &[&str], rows: &[Value]) {
		self.store.create_table(&table).await.expect("create table");
		for (index, name) in columns.iter().enumerate() {
			let column = TableColumn {
				id: format!("{}_c{}", table.id, index),
				table_id: table.id.clone(),
				column_index: index as i64,
				name: (*name).to_string(),
				..TableColumn::default()
			};
			self.store.create_table_column(&column).await.expect("create column");
		}
		for (index, cells) in rows.iter().enumerate() {
			let row = TableRow {
				id: format!("{}_r{}", table.id, index),
				table_id: table.id.clone(),
				row_index: index as i64,
				cells: cells.clone(),
			};
			self.store.create_table_row(&row).await.expect("create row");
		}
	}

	pub async fn node(&self, id: &str) -> Node {
		self.store.read_node(id).await.unwrap().unwrap_or_else(|| panic!("node {} missing", id))
	}
}

pub fn auth() -> AuthCtx {
	AuthCtx::organization(ORG_ID)
}

pub fn node(id: &str, parent: Option<&str>, order: i64, node_type: &str) -> Node {
	Node {
		id: id.into(),
		tree_id: TREE_ID.into(),
		parent_id: parent.map(Into::into),
		node_type: node_type.into(),
		label: id.replace('_', " "),
		order,
		is_visible: true,
		..Node::default()
	}
}

pub fn formula(id: &str, node_id: &str, order: i64, tokens: Vec<Value>) -> Formula {
	Formula { id: id.into(), node_id: node_id.into(), name: id.to_uppercase(), tokens, order, ..Formula::default() }
}

pub fn condition(id: &str, node_id: &str, condition_set: Value) -> Condition {
	Condition { id: id.into(), node_id: node_id.into(), name: id.to_uppercase(), condition_set, ..Condition::default() }
}

pub fn table(id: &str, node_id: &str) -> Table {
	Table { id: id.into(), node_id: node_id.into(), name: id.to_uppercase(), ..Table::default() }
}

pub fn variable(id: &str, node_id: &str, exposed_key: &str, source_ref: Option<&str>) -> Variable {
	Variable {
		id: id.into(),
		node_id: node_id.into(),
		exposed_key: exposed_key.into(),
		display_name: id.to_uppercase(),
		source_ref: source_ref.map(Into::into),
		..Variable::default()
	}
}

// vim: ts=4
