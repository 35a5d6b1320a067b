//! Tree and node records

use sqlx::SqlitePool;

use crate::utils::*;
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::{ListNodeOptions, UpdateNodeData};
use treebranch_types::tree::{Node, Tree};

pub(crate) async fn read_tree(db: &SqlitePool, tree_id: &str) -> TbResult<Option<Tree>> {
	let row = sqlx::query("SELECT doc FROM trees WHERE tree_id = ?")
		.bind(tree_id)
		.fetch_optional(db)
		.await;
	map_opt(row)
}

pub(crate) async fn create_tree(db: &SqlitePool, tree: &Tree) -> TbResult<()> {
	let doc = encode(tree)?;
	db_err(
		sqlx::query("INSERT INTO trees (tree_id, organization_id, doc) VALUES (?, ?, ?)")
			.bind(&tree.id)
			.bind(tree.organization_id.as_deref())
			.bind(doc)
			.execute(db)
			.await,
	)?;
	Ok(())
}

pub(crate) async fn read(db: &SqlitePool, node_id: &str) -> TbResult<Option<Node>> {
	let row = sqlx::query("SELECT doc FROM nodes WHERE node_id = ?")
		.bind(node_id)
		.fetch_optional(db)
		.await;
	map_opt(row)
}

/// List nodes with optional filtering, ordered by display order
pub(crate) async fn list(db: &SqlitePool, opts: &ListNodeOptions) -> TbResult<Vec<Node>> {
	let mut query = sqlx::QueryBuilder::new("SELECT doc FROM nodes WHERE 1=1");

	if let Some(tree_id) = &opts.tree_id {
		query.push(" AND tree_id = ").push_bind(tree_id.as_str());
	}
	if let Some(parent_id) = &opts.parent_id {
		query.push(" AND parent_id = ").push_bind(parent_id.as_str());
	}
	if let Some(prefix) = &opts.id_prefix {
		query.push(" AND instr(node_id, ").push_bind(prefix.as_str()).push(") = 1");
	}
	if let Some(ids) = &opts.ids {
		if ids.is_empty() {
			return Ok(Vec::new());
		}
		query.push(" AND node_id IN ");
		query = push_in(query, ids);
	}
	query.push(" ORDER BY ord, node_id");

	collect_res(query.build().fetch_all(db).await)
}

pub(crate) async fn create(db: &SqlitePool, node: &Node) -> TbResult<()> {
	let doc = encode(node)?;
	db_err(
		sqlx::query("INSERT INTO nodes (node_id, tree_id, parent_id, ord, doc) VALUES (?, ?, ?, ?, ?)")
			.bind(&node.id)
			.bind(&node.tree_id)
			.bind(node.parent_id.as_deref())
			.bind(node.order)
			.bind(doc)
			.execute(db)
			.await,
	)?;
	Ok(())
}

/// Applies the patch to the stored document in one transaction
pub(crate) async fn update(db: &SqlitePool, node_id: &str, data: &UpdateNodeData) -> TbResult<()> {
	let mut tx = db_err(db.begin().await)?;

	let row = sqlx::query("SELECT doc FROM nodes WHERE node_id = ?")
		.bind(node_id)
		.fetch_optional(&mut *tx)
		.await;
	let mut node: Node = map_opt(row)?.ok_or(Error::NotFound)?;
	data.apply_to(&mut node);

	let doc = encode(&node)?;
	db_err(
		sqlx::query("UPDATE nodes SET parent_id = ?, doc = ? WHERE node_id = ?")
			.bind(node.parent_id.as_deref())
			.bind(doc)
			.bind(node_id)
			.execute(&mut *tx)
			.await,
	)?;
	db_err(tx.commit().await)
}

pub(crate) async fn delete(db: &SqlitePool, node_id: &str) -> TbResult<()> {
	let res = db_err(sqlx::query("DELETE FROM nodes WHERE node_id = ?").bind(node_id).execute(db).await)?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

// vim: ts=4
