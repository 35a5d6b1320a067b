#![forbid(unsafe_code)]

//! SQLite implementation of `TreeStoreAdapter`.

use async_trait::async_trait;
use sqlx::sqlite::{self, SqlitePool};
use std::path::Path;

use treebranch_types::prelude::*;
use treebranch_types::store_adapter::*;
use treebranch_types::tree::*;

mod node;
mod record;
mod schema;
mod utils;

use crate::schema::init_db;

/// Adapter configuration options
#[derive(Debug, Clone)]
pub struct AdapterConfig {
	/// Database file name inside the storage directory
	pub file_name: String,

	/// Maximum number of pooled connections
	pub max_connections: u32,
}

impl Default for AdapterConfig {
	fn default() -> Self {
		Self { file_name: "treebranch.db".into(), max_connections: 5 }
	}
}

#[derive(Debug)]
pub struct TreeStoreAdapterSqlite {
	db: SqlitePool,
}

impl TreeStoreAdapterSqlite {
	/// Opens (or creates) the database in `storage_dir`
	pub async fn new(storage_dir: impl AsRef<Path>, config: AdapterConfig) -> TbResult<Self> {
		tokio::fs::create_dir_all(storage_dir.as_ref()).await?;

		let opts = sqlite::SqliteConnectOptions::new()
			.filename(storage_dir.as_ref().join(&config.file_name))
			.create_if_missing(true)
			.foreign_keys(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(config.max_connections)
			.connect_with(opts)
			.await
			.inspect_err(|err| error!("DbError: {:#?}", err))
			.or(Err(Error::DbError))?;

		init_db(&db)
			.await
			.inspect_err(|err| error!("DbError: {:#?}", err))
			.or(Err(Error::DbError))?;

		Ok(Self { db })
	}
}

#[async_trait]
impl TreeStoreAdapter for TreeStoreAdapterSqlite {
	// Trees and nodes
	//*****************
	async fn read_tree(&self, tree_id: &str) -> TbResult<Option<Tree>> {
		node::read_tree(&self.db, tree_id).await
	}

	async fn create_tree(&self, tree: &Tree) -> TbResult<()> {
		node::create_tree(&self.db, tree).await
	}

	async fn read_node(&self, node_id: &str) -> TbResult<Option<Node>> {
		node::read(&self.db, node_id).await
	}

	async fn list_nodes(&self, opts: &ListNodeOptions) -> TbResult<Vec<Node>> {
		node::list(&self.db, opts).await
	}

	async fn create_node(&self, node: &Node) -> TbResult<()> {
		node::create(&self.db, node).await
	}

	async fn update_node(&self, node_id: &str, data: &UpdateNodeData) -> TbResult<()> {
		node::update(&self.db, node_id, data).await
	}

	async fn delete_node(&self, node_id: &str) -> TbResult<()> {
		node::delete(&self.db, node_id).await
	}

	// Formulas and conditions
	//*************************
	async fn read_formula(&self, formula_id: &str) -> TbResult<Option<Formula>> {
		record::read(&self.db, "formulas", formula_id).await
	}

	async fn list_formulas(&self, node_id: &str) -> TbResult<Vec<Formula>> {
		record::list_owned(&self.db, "formulas", "node_id", node_id).await
	}

	async fn create_formula(&self, formula: &Formula) -> TbResult<()> {
		record::insert(&self.db, "formulas", "node_id", &formula.id, &formula.node_id, formula.order, formula)
			.await
	}

	async fn read_condition(&self, condition_id: &str) -> TbResult<Option<Condition>> {
		record::read(&self.db, "conditions", condition_id).await
	}

	async fn list_conditions(&self, node_id: &str) -> TbResult<Vec<Condition>> {
		record::list_owned(&self.db, "conditions", "node_id", node_id).await
	}

	async fn create_condition(&self, condition: &Condition) -> TbResult<()> {
		record::insert(
			&self.db,
			"conditions",
			"node_id",
			&condition.id,
			&condition.node_id,
			condition.order,
			condition,
		)
		.await
	}

	// Tables
	//********
	async fn read_table(&self, table_id: &str) -> TbResult<Option<Table>> {
		record::read(&self.db, "node_tables", table_id).await
	}

	async fn list_tables(&self, node_id: &str) -> TbResult<Vec<Table>> {
		record::list_owned(&self.db, "node_tables", "node_id", node_id).await
	}

	async fn create_table(&self, table: &Table) -> TbResult<()> {
		record::insert(&self.db, "node_tables", "node_id", &table.id, &table.node_id, table.order, table).await
	}

	async fn list_table_columns(&self, table_id: &str) -> TbResult<Vec<TableColumn>> {
		record::list_owned(&self.db, "table_columns", "table_id", table_id).await
	}

	async fn create_table_column(&self, column: &TableColumn) -> TbResult<()> {
		record::insert(
			&self.db,
			"table_columns",
			"table_id",
			&column.id,
			&column.table_id,
			column.column_index,
			column,
		)
		.await
	}

	async fn list_table_rows(&self, table_id: &str) -> TbResult<Vec<TableRow>> {
		record::list_owned(&self.db, "table_rows", "table_id", table_id).await
	}

	async fn create_table_row(&self, row: &TableRow) -> TbResult<()> {
		record::insert(&self.db, "table_rows", "table_id", &row.id, &row.table_id, row.row_index, row).await
	}

	// Variables and configs
	//***********************
	async fn read_variable(&self, variable_id: &str) -> TbResult<Option<Variable>> {
		record::read(&self.db, "variables", variable_id).await
	}

	async fn list_variables(&self, opts: &ListVariableOptions) -> TbResult<Vec<Variable>> {
		record::list_variables(&self.db, opts).await
	}

	async fn create_variable(&self, variable: &Variable) -> TbResult<()> {
		record::insert_unordered(&self.db, "variables", &variable.id, &variable.node_id, variable).await
	}

	async fn read_select_config(&self, node_id: &str) -> TbResult<Option<SelectConfig>> {
		record::read_by_node(&self.db, "select_configs", node_id).await
	}

	async fn create_select_config(&self, config: &SelectConfig) -> TbResult<()> {
		record::insert_unordered(&self.db, "select_configs", &config.id, &config.node_id, config).await
	}

	async fn read_number_config(&self, node_id: &str) -> TbResult<Option<NumberConfig>> {
		record::read_by_node(&self.db, "number_configs", node_id).await
	}

	async fn create_number_config(&self, config: &NumberConfig) -> TbResult<()> {
		record::insert_unordered(&self.db, "number_configs", &config.id, &config.node_id, config).await
	}
}

// vim: ts=4
