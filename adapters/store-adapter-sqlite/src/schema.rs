//! Database schema initialization
//!
//! Every record is stored as a JSON document next to the columns used for
//! lookups and ordering.

use sqlx::SqlitePool;

/// Initialize the database schema with all required tables and indexes
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Trees and nodes
	//*****************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS trees (
		tree_id text NOT NULL,
		organization_id text,
		doc json NOT NULL,
		PRIMARY KEY(tree_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS nodes (
		node_id text NOT NULL,
		tree_id text NOT NULL,
		parent_id text,
		ord integer NOT NULL DEFAULT 0,
		doc json NOT NULL,
		PRIMARY KEY(node_id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_tree ON nodes(tree_id, ord)")
		.execute(&mut *tx)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)")
		.execute(&mut *tx)
		.await?;

	// Capacities
	//************
	for table in ["formulas", "conditions"] {
		sqlx::query(&format!(
			"CREATE TABLE IF NOT EXISTS {table} (
			id text NOT NULL,
			node_id text NOT NULL,
			ord integer NOT NULL DEFAULT 0,
			doc json NOT NULL,
			PRIMARY KEY(id)
		)"
		))
		.execute(&mut *tx)
		.await?;
		sqlx::query(&format!("CREATE INDEX IF NOT EXISTS idx_{table}_node ON {table}(node_id, ord)"))
			.execute(&mut *tx)
			.await?;
	}

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS node_tables (
		id text NOT NULL,
		node_id text NOT NULL REFERENCES nodes(node_id),
		ord integer NOT NULL DEFAULT 0,
		doc json NOT NULL,
		PRIMARY KEY(id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_node_tables_node ON node_tables(node_id, ord)")
		.execute(&mut *tx)
		.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS table_columns (
		id text NOT NULL,
		table_id text NOT NULL,
		ord integer NOT NULL DEFAULT 0,
		doc json NOT NULL,
		PRIMARY KEY(id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS table_rows (
		id text NOT NULL,
		table_id text NOT NULL,
		ord integer NOT NULL DEFAULT 0,
		doc json NOT NULL,
		PRIMARY KEY(id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_table_columns_table ON table_columns(table_id, ord)")
		.execute(&mut *tx)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_table_rows_table ON table_rows(table_id, ord)")
		.execute(&mut *tx)
		.await?;

	// Variables and configs
	//***********************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS variables (
		id text NOT NULL,
		node_id text NOT NULL,
		doc json NOT NULL,
		PRIMARY KEY(id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_variables_node ON variables(node_id)")
		.execute(&mut *tx)
		.await?;

	for table in ["select_configs", "number_configs"] {
		sqlx::query(&format!(
			"CREATE TABLE IF NOT EXISTS {table} (
			id text NOT NULL,
			node_id text NOT NULL UNIQUE,
			doc json NOT NULL,
			PRIMARY KEY(id)
		)"
		))
		.execute(&mut *tx)
		.await?;
	}

	tx.commit().await?;

	Ok(())
}

// vim: ts=4
