//! Capacity records
//!
//! Capacity tables share one layout: `id`, the owning `node_id` or
//! `table_id`, an optional `ord` column and the JSON document. The table and
//! column names passed here are compile-time constants.

use serde::{Serialize, de::DeserializeOwned};
use sqlx::SqlitePool;

use crate::utils::*;
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::ListVariableOptions;
use treebranch_types::tree::Variable;

pub(crate) async fn read<T: DeserializeOwned>(db: &SqlitePool, table: &str, id: &str) -> TbResult<Option<T>> {
	let row = sqlx::query(&format!("SELECT doc FROM {} WHERE id = ?", table))
		.bind(id)
		.fetch_optional(db)
		.await;
	map_opt(row)
}

/// The record of a one-per-node table
pub(crate) async fn read_by_node<T: DeserializeOwned>(
	db: &SqlitePool,
	table: &str,
	node_id: &str,
) -> TbResult<Option<T>> {
	let row = sqlx::query(&format!("SELECT doc FROM {} WHERE node_id = ?", table))
		.bind(node_id)
		.fetch_optional(db)
		.await;
	map_opt(row)
}

/// Records owned by `owner_id`, in `(ord, id)` order
pub(crate) async fn list_owned<T: DeserializeOwned>(
	db: &SqlitePool,
	table: &str,
	owner_column: &str,
	owner_id: &str,
) -> TbResult<Vec<T>> {
	let rows = sqlx::query(&format!("SELECT doc FROM {} WHERE {} = ? ORDER BY ord, id", table, owner_column))
		.bind(owner_id)
		.fetch_all(db)
		.await;
	collect_res(rows)
}

/// Inserts an ordered record; a taken id fails on the primary key
pub(crate) async fn insert<T: Serialize>(
	db: &SqlitePool,
	table: &str,
	owner_column: &str,
	id: &str,
	owner_id: &str,
	ord: i64,
	record: &T,
) -> TbResult<()> {
	let doc = encode(record)?;
	db_err(
		sqlx::query(&format!("INSERT INTO {} (id, {}, ord, doc) VALUES (?, ?, ?, ?)", table, owner_column))
			.bind(id)
			.bind(owner_id)
			.bind(ord)
			.bind(doc)
			.execute(db)
			.await,
	)?;
	Ok(())
}

/// Inserts an unordered record owned by a node
pub(crate) async fn insert_unordered<T: Serialize>(
	db: &SqlitePool,
	table: &str,
	id: &str,
	node_id: &str,
	record: &T,
) -> TbResult<()> {
	let doc = encode(record)?;
	db_err(
		sqlx::query(&format!("INSERT INTO {} (id, node_id, doc) VALUES (?, ?, ?)", table))
			.bind(id)
			.bind(node_id)
			.bind(doc)
			.execute(db)
			.await,
	)?;
	Ok(())
}

pub(crate) async fn list_variables(db: &SqlitePool, opts: &ListVariableOptions) -> TbResult<Vec<Variable>> {
	let mut query = sqlx::QueryBuilder::new("SELECT doc FROM variables WHERE 1=1");
	if let Some(node_ids) = &opts.node_ids {
		if node_ids.is_empty() {
			return Ok(Vec::new());
		}
		query.push(" AND node_id IN ");
		query = push_in(query, node_ids);
	}
	if let Some(ids) = &opts.ids {
		if ids.is_empty() {
			return Ok(Vec::new());
		}
		query.push(" AND id IN ");
		query = push_in(query, ids);
	}
	query.push(" ORDER BY id");

	collect_res(query.build().fetch_all(db).await)
}

// vim: ts=4
