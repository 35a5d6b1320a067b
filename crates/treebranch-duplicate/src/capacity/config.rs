//! Select and number configuration duplication

use crate::context::DuplicationRun;
use crate::service::Engine;
use treebranch_types::capacity::CapacityKind;
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::UpdateNodeData;
use treebranch_types::tree::{Node, NumberConfig, SelectConfig};

pub(crate) async fn duplicate_select_config(engine: &Engine, run: &mut DuplicationRun, source: &Node, copy_id: &str) {
	if let Err(err) = copy_select_config(engine, run, source, copy_id).await {
		run.skip(&source.id, Some(CapacityKind::SelectConfig), None, &err);
	}
}

async fn copy_select_config(
	engine: &Engine,
	run: &mut DuplicationRun,
	source: &Node,
	copy_id: &str,
) -> TbResult<()> {
	let Some(config) = engine.store.read_select_config(&source.id).await? else {
		return Ok(());
	};
	if engine.store.read_select_config(copy_id).await?.is_some() {
		debug!(node_id = %source.id, copy_id = %copy_id, "select config copy exists");
		return Ok(());
	}

	// Only a table copied by this run is renamed, any other table is a shared lookup
	let mapped_table = config.table_reference.as_ref().and_then(|t| run.maps.tables.get(t)).cloned();
	let column = |name: &Option<String>| match &mapped_table {
		Some(_) => name.as_deref().map(|n| run.policy.column_name(n)),
		None => name.clone(),
	};
	let key_column = column(&config.key_column);
	let value_column = column(&config.value_column);
	let display_column = column(&config.display_column);
	let display_row = column(&config.display_row);
	let depends_on_node_id = config
		.depends_on_node_id
		.as_ref()
		.map(|id| run.maps.nodes.get(id).unwrap_or(id).clone());
	let options = config.options.as_ref().map(|o| run.rewrite(|rw| rw.rewrite_value(o)));

	let copy = SelectConfig {
		id: run.policy.derive(&config.id),
		node_id: copy_id.to_string(),
		options,
		table_reference: mapped_table.clone().or_else(|| config.table_reference.clone()),
		key_column,
		value_column,
		display_column,
		display_row,
		depends_on_node_id,
		..config
	};
	engine.store.create_select_config(&copy).await?;

	let owns_table = mapped_table
		.as_ref()
		.and_then(|t| run.table_owners.get(t))
		.is_some_and(|owner| owner == copy_id);
	if owns_table && !source.has_table {
		let update = UpdateNodeData { has_table: Patch::Value(true), ..UpdateNodeData::default() };
		engine.store.update_node(copy_id, &update).await?;
	}
	Ok(())
}

pub(crate) async fn duplicate_number_config(engine: &Engine, run: &mut DuplicationRun, source: &Node, copy_id: &str) {
	if let Err(err) = copy_number_config(engine, run, source, copy_id).await {
		run.skip(&source.id, Some(CapacityKind::NumberConfig), None, &err);
	}
}

async fn copy_number_config(engine: &Engine, run: &DuplicationRun, source: &Node, copy_id: &str) -> TbResult<()> {
	let Some(config) = engine.store.read_number_config(&source.id).await? else {
		return Ok(());
	};
	if engine.store.read_number_config(copy_id).await?.is_some() {
		debug!(node_id = %source.id, copy_id = %copy_id, "number config copy exists");
		return Ok(());
	}
	let copy = NumberConfig { id: run.policy.derive(&config.id), node_id: copy_id.to_string(), ..config };
	engine.store.create_number_config(&copy).await
}

// vim: ts=4
