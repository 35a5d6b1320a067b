//! Table duplication
//!
//! A node copies the tables it owns, plus the tables it points at through
//! its active or linked table ids. A pointed-at table owned by a node outside
//! the subtree is copied under a placeholder copy of that owner, so every
//! table copy keeps a valid owner.

use itertools::Itertools;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::context::DuplicationRun;
use crate::reference::{SHARED_REF_PREFIX, referenced_node_ids};
use crate::service::Engine;
use treebranch_types::capacity::CapacityKind;
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::UpdateNodeData;
use treebranch_types::tree::{Node, Table, TableColumn, TableRow};

/// Metadata key marking a placeholder owner, holds the original owner id
pub(crate) const PLACEHOLDER_KEY: &str = "placeholderForNodeId";

pub(crate) async fn duplicate_tables(
	engine: &Engine,
	run: &mut DuplicationRun,
	source: &Node,
	copy_id: &str,
) -> TbResult<()> {
	let mut tables = match engine.store.list_tables(&source.id).await {
		Ok(tables) => tables,
		Err(err) => {
			run.skip(&source.id, Some(CapacityKind::Table), None, &err);
			Vec::new()
		}
	};

	let pointed: Vec<String> = source
		.table_active_id
		.iter()
		.chain(source.linked_table_ids.iter())
		.filter(|id| !id.starts_with(SHARED_REF_PREFIX))
		.filter(|id| !tables.iter().any(|t| &t.id == *id))
		.unique()
		.cloned()
		.collect();
	for table_id in pointed {
		match engine.store.read_table(&table_id).await {
			Ok(Some(table)) => tables.push(table),
			Ok(None) => debug!(node_id = %source.id, table_id = %table_id, "pointed table not found"),
			Err(err) => run.skip(&source.id, Some(CapacityKind::Table), Some(&table_id), &err),
		}
	}

	for table in &tables {
		match duplicate_table(engine, run, source, copy_id, table).await {
			Ok(()) => {}
			Err(err @ Error::OwnerResolution(_)) => {
				error!(node_id = %source.id, table_id = %table.id, error = %err, "table owner unresolved");
				return Err(err);
			}
			Err(err) => run.skip(&source.id, Some(CapacityKind::Table), Some(&table.id), &err),
		}
	}
	Ok(())
}

async fn duplicate_table(
	engine: &Engine,
	run: &mut DuplicationRun,
	source: &Node,
	copy_id: &str,
	table: &Table,
) -> TbResult<()> {
	if run.maps.tables.contains_key(&table.id) {
		return Ok(());
	}
	let Some(owner_id) = resolve_owner(engine, run, source, copy_id, table).await? else {
		debug!(table_id = %table.id, owner = %table.node_id, "table left to its owner's pass");
		return Ok(());
	};
	let new_id = run.policy.derive(&table.id);

	let created = if engine.store.read_table(&new_id).await?.is_some() {
		debug!(table_id = %table.id, copy_id = %new_id, "table copy exists");
		None
	} else {
		let meta = run.rewrite(|rw| rw.rewrite_table_meta(&table.meta));
		let referenced = referenced_node_ids(&meta);
		let copy = Table {
			id: new_id.clone(),
			node_id: owner_id.clone(),
			name: run.policy.suffix(&table.name),
			meta,
			..table.clone()
		};
		engine.store.create_table(&copy).await?;
		Some(referenced)
	};

	copy_columns(engine, run, &table.id, &new_id).await?;
	copy_rows(engine, run, &table.id, &new_id).await?;
	if let Some(referenced) = created {
		run.emit(engine.events.as_ref(), &owner_id, &new_id, CapacityKind::Table, referenced);
	}

	run.maps.tables.insert(table.id.clone(), new_id.clone());
	run.table_owners.insert(new_id.clone(), owner_id.clone());
	run.owned_mut(&owner_id).tables.push(new_id.clone());
	if owner_id == copy_id {
		if source.table_active_id.as_deref() == Some(table.id.as_str()) {
			let update = UpdateNodeData {
				table_active_id: Patch::Value(new_id),
				has_table: Patch::Value(true),
				..UpdateNodeData::default()
			};
			super::set_active_pointer(engine, copy_id, update).await?;
		}
	}
	Ok(())
}

/// Node the table copy belongs to, `None` when the owner is a subtree node
/// whose copy does not exist yet
async fn resolve_owner(
	engine: &Engine,
	run: &mut DuplicationRun,
	source: &Node,
	copy_id: &str,
	table: &Table,
) -> TbResult<Option<String>> {
	if table.node_id == source.id {
		return Ok(Some(copy_id.to_string()));
	}
	if let Some(mapped) = run.maps.nodes.get(&table.node_id) {
		if run.node_exists(mapped) {
			return Ok(Some(mapped.clone()));
		}
		if run.subtree.contains(&table.node_id) {
			return Ok(None);
		}
	}

	let owner_copy = run.policy.derive(&table.node_id);
	if run.node_exists(&owner_copy) {
		return Ok(Some(owner_copy));
	}
	let unresolved =
		|err: Error| Error::OwnerResolution(format!("owner {} of table {}: {}", table.node_id, table.id, err));
	if engine.store.read_node(&owner_copy).await.map_err(unresolved)?.is_some() {
		run.existing_ids.insert(owner_copy.clone());
		return Ok(Some(owner_copy));
	}

	let owner = match run.sources.get(&table.node_id).cloned() {
		Some(owner) => owner,
		None => engine.store.read_node(&table.node_id).await.map_err(unresolved)?.ok_or_else(|| {
			Error::OwnerResolution(format!("owner {} of table {} not found", table.node_id, table.id))
		})?,
	};
	let placeholder = placeholder_for(run, &owner, &owner_copy);
	engine.store.create_node(&placeholder).await.map_err(unresolved)?;
	info!(owner = %owner.id, placeholder = %owner_copy, table_id = %table.id, "placeholder owner created");

	run.placeholder_ids.push(owner_copy.clone());
	run.existing_ids.insert(owner_copy.clone());
	run.maps.nodes.insert(owner.id.clone(), owner_copy.clone());
	Ok(Some(owner_copy))
}

/// Hidden stand-in for a table owner that is not part of the copy
fn placeholder_for(run: &DuplicationRun, owner: &Node, placeholder_id: &str) -> Node {
	let parent_id = owner.parent_id.as_ref().map(|parent| {
		run.maps.nodes.get(parent).filter(|copy| run.node_exists(copy)).unwrap_or(parent).clone()
	});
	let mut metadata = Map::new();
	metadata.insert(PLACEHOLDER_KEY.into(), Value::String(owner.id.clone()));
	metadata.insert("copySuffix".into(), Value::String(run.policy.token().to_string()));

	Node {
		id: placeholder_id.to_string(),
		tree_id: run.tree_id.clone(),
		parent_id,
		node_type: owner.node_type.clone(),
		label: run.policy.suffix(&owner.label),
		order: owner.order,
		is_visible: false,
		has_table: true,
		metadata,
		..Node::default()
	}
}

async fn copy_columns(engine: &Engine, run: &DuplicationRun, table_id: &str, copy_id: &str) -> TbResult<()> {
	let existing: HashSet<String> =
		engine.store.list_table_columns(copy_id).await?.into_iter().map(|c| c.id).collect();
	for column in engine.store.list_table_columns(table_id).await? {
		let id = run.policy.derive(&column.id);
		if existing.contains(&id) {
			continue;
		}
		let copy = TableColumn {
			id,
			table_id: copy_id.to_string(),
			name: run.policy.column_name(&column.name),
			..column
		};
		engine.store.create_table_column(&copy).await?;
	}
	Ok(())
}

async fn copy_rows(engine: &Engine, run: &mut DuplicationRun, table_id: &str, copy_id: &str) -> TbResult<()> {
	let existing: HashSet<String> =
		engine.store.list_table_rows(copy_id).await?.into_iter().map(|r| r.id).collect();
	for row in engine.store.list_table_rows(table_id).await? {
		let id = run.policy.derive(&row.id);
		if existing.contains(&id) {
			continue;
		}
		let cells = run.rewrite(|rw| rw.rewrite_value(&row.cells));
		let copy = TableRow { id, table_id: copy_id.to_string(), cells, ..row };
		engine.store.create_table_row(&copy).await?;
	}
	Ok(())
}

// vim: ts=4
