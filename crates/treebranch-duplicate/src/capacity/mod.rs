//! Capacity duplicators
//!
//! Each duplicator runs once per copied node, after the node copy exists.
//! Select and number configs run in a later pass, once every table of the
//! run has its copy.
//! All of them detect copies left by an earlier run with the same suffix and
//! skip re-creating them. Failures of a single capacity record are recorded
//! on the run and do not stop the duplication, except a table owner that
//! cannot be resolved.

pub(crate) mod condition;
pub(crate) mod config;
pub(crate) mod formula;
pub(crate) mod table;
pub(crate) mod variable;

use crate::context::{DuplicationRun, NodePair};
use crate::service::Engine;
use treebranch_types::prelude::*;
use treebranch_types::store_adapter::UpdateNodeData;

pub(crate) async fn duplicate_capacities(
	engine: &Engine,
	run: &mut DuplicationRun,
	pair: &NodePair,
) -> TbResult<()> {
	let Some(source) = run.sources.get(&pair.source_id).cloned() else {
		return Ok(());
	};
	let copy_id = pair.copy_id.as_str();

	formula::duplicate_formulas(engine, run, &source, copy_id).await;
	condition::duplicate_conditions(engine, run, &source, copy_id).await;
	table::duplicate_tables(engine, run, &source, copy_id).await?;
	variable::duplicate_variables(engine, run, &source, copy_id).await?;
	Ok(())
}

pub(crate) async fn duplicate_configs(engine: &Engine, run: &mut DuplicationRun, pair: &NodePair) {
	let Some(source) = run.sources.get(&pair.source_id).cloned() else {
		return;
	};
	config::duplicate_select_config(engine, run, &source, &pair.copy_id).await;
	config::duplicate_number_config(engine, run, &source, &pair.copy_id).await;
}

/// Points a copied node at one of its freshly copied capacities
async fn set_active_pointer(engine: &Engine, copy_id: &str, update: UpdateNodeData) -> TbResult<()> {
	if update.is_empty() {
		return Ok(());
	}
	engine.store.update_node(copy_id, &update).await
}

// vim: ts=4
