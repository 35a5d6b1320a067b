//! Subtree duplication tests
//!
//! Node copies, suffixes, parents, authorization and re-entry

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use serde_json::json;

use common::*;
use treebranch_duplicate::{DuplicateOptions, duplicate_subtree};
use treebranch_types::error::Error;
use treebranch_types::store_adapter::TreeStoreAdapter;
use treebranch_types::tree::*;
use treebranch_types::types::{AuthCtx, RepeatContext};

fn with_suffix(suffix: &str) -> DuplicateOptions {
	let mut opts = DuplicateOptions::new();
	opts.suffix(suffix);
	opts
}

#[tokio::test]
async fn test_duplicates_subtree_with_suffix() {
	let fx = Fixture::form().await;

	let res = duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();
	assert_eq!(res.root_id, "grp-1");
	assert_eq!(res.suffix, "1");
	assert!(res.complete);
	assert_eq!(res.node_id_map.len(), 3);
	assert_eq!(res.node_id_map["width"], "width-1");

	let root = fx.node("grp-1").await;
	assert_eq!(root.parent_id.as_deref(), Some("sec"));
	assert_eq!(root.label, "grp-1");
	assert_eq!(root.metadata["copiedFromNodeId"], "grp");
	assert_eq!(root.metadata["copySuffix"], "1");

	let width = fx.node("width-1").await;
	assert_eq!(width.parent_id.as_deref(), Some("grp-1"));
	assert_eq!(width.calculated_value, None);
	assert_eq!(fx.node("height-1").await.parent_id.as_deref(), Some("grp-1"));

	// Sources are untouched
	let source = fx.node("width").await;
	assert_eq!(source.formula_active_id.as_deref(), Some("f_w"));
	assert_eq!(source.calculated_value.as_deref(), Some("84"));
}

#[tokio::test]
async fn test_formula_tokens_and_pointers_remapped() {
	let fx = Fixture::form().await;

	let res = duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();
	assert_eq!(res.formula_id_map["f_w"], "f_w-1");

	let formula = fx.store.read_formula("f_w-1").await.unwrap().unwrap();
	assert_eq!(formula.node_id, "width-1");
	assert_eq!(formula.name, "F_W-1");
	assert_eq!(formula.tokens, vec![json!("@value.height-1"), json!("*"), json!(2)]);

	let width = fx.node("width-1").await;
	assert_eq!(width.formula_active_id.as_deref(), Some("f_w-1"));
	assert_eq!(width.linked_formula_ids, vec!["f_w-1"]);
}

#[tokio::test]
async fn test_owned_variable_copied() {
	let fx = Fixture::form().await;

	let res = duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();
	assert_eq!(res.variable_id_map["v_w"], "v_w-1");

	let variable = fx.store.read_variable("v_w-1").await.unwrap().unwrap();
	assert_eq!(variable.node_id, "width-1");
	assert_eq!(variable.exposed_key, "width_key-1");
	assert_eq!(variable.source_ref.as_deref(), Some("node-formula:f_w-1"));
	assert_eq!(fx.node("width-1").await.data_active_id.as_deref(), Some("v_w-1"));
}

#[tokio::test]
async fn test_linked_order_preserved() {
	let fx = Fixture::form().await;
	fx.add_node(Node {
		has_formula: true,
		formula_active_id: Some("f2".into()),
		linked_formula_ids: vec!["f2".into(), "f1".into()],
		..node("total", Some("grp"), 2, "leaf_field")
	})
	.await;
	fx.add_formula(formula("f1", "total", 0, vec![json!("@value.width")])).await;
	fx.add_formula(formula("f2", "total", 1, vec![json!("@value.height")])).await;

	duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();

	let total = fx.node("total-1").await;
	assert_eq!(total.linked_formula_ids, vec!["f2-1", "f1-1"]);
	assert_eq!(total.formula_active_id.as_deref(), Some("f2-1"));
}

#[tokio::test]
async fn test_auto_suffix_uses_next_generation() {
	let fx = Fixture::form().await;

	let first = duplicate_subtree(&fx.engine, &auth(), "grp", &DuplicateOptions::new()).await.unwrap();
	assert_eq!(first.suffix, "1");
	assert_eq!(first.root_id, "grp-1");

	let second = duplicate_subtree(&fx.engine, &auth(), "grp", &DuplicateOptions::new()).await.unwrap();
	assert_eq!(second.suffix, "2");
	assert_eq!(second.root_id, "grp-2");
	assert_eq!(second.node_id_map["width"], "width-2");
	assert!(fx.store.read_formula("f_w-2").await.unwrap().is_some());
}

#[tokio::test]
async fn test_rerun_with_same_suffix_creates_nothing() {
	let fx = Fixture::form().await;
	fx.add_node(node("ext2", Some("sec"), 2, "leaf_field")).await;
	fx.add_table(table("tbl_ext2", "ext2"), &["Size"], &[json!(["M"])]).await;
	fx.add_node(Node {
		has_table: true,
		table_active_id: Some("tbl_p".into()),
		linked_table_ids: vec!["tbl_ext2".into()],
		..node("prices", Some("grp"), 2, "leaf_field")
	})
	.await;
	fx.add_table(table("tbl_p", "prices"), &["Price", "2.5"], &[json!(["@value.width", 1]), json!(["x", 2])]).await;
	fx.add_node(Node { linked_variable_ids: vec!["v_ext".into()], ..node("total", Some("grp"), 3, "leaf_field") })
		.await;
	fx.store
		.create_select_config(&SelectConfig {
			id: "sc".into(),
			node_id: "height".into(),
			table_reference: Some("tbl_p".into()),
			key_column: Some("Price".into()),
			..SelectConfig::default()
		})
		.await
		.unwrap();
	fx.store
		.create_number_config(&NumberConfig { id: "nc".into(), node_id: "width".into(), ..NumberConfig::default() })
		.await
		.unwrap();

	let first = duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();
	assert_eq!(first.placeholder_node_ids, vec!["ext2-1"]);
	assert_eq!(first.display_node_ids, vec!["ext_owner-1"]);
	assert_eq!(first.table_id_map.len(), 3);
	let counts = fx.store.counts().await;
	assert_eq!(counts.select_configs, 2);

	let second = duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();
	assert_eq!(fx.store.counts().await, counts);
	assert_eq!(second.node_id_map, first.node_id_map);
	assert_eq!(second.formula_id_map, first.formula_id_map);
	assert_eq!(second.table_id_map, first.table_id_map);
	assert_eq!(second.variable_id_map, first.variable_id_map);
	assert_eq!(second.display_node_ids, first.display_node_ids);
	assert!(second.complete);
}

#[tokio::test]
async fn test_active_pointer_needs_capacity_flag() {
	let fx = Fixture::form().await;
	fx.add_node(Node {
		formula_active_id: Some("f_p".into()),
		condition_active_id: Some("c_p".into()),
		..node("plain", Some("grp"), 2, "leaf_field")
	})
	.await;
	fx.add_formula(formula("f_p", "plain", 0, vec![json!(1)])).await;
	fx.add_condition(condition("c_p", "plain", json!({"branches": []}))).await;

	let res = duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();
	assert_eq!(res.formula_id_map["f_p"], "f_p-1");
	assert_eq!(res.condition_id_map["c_p"], "c_p-1");

	let plain = fx.node("plain-1").await;
	assert!(!plain.has_formula);
	assert!(!plain.has_condition);
	assert_ne!(plain.formula_active_id.as_deref(), Some("f_p-1"));
	assert_ne!(plain.condition_active_id.as_deref(), Some("c_p-1"));
}

#[tokio::test]
async fn test_target_parent() {
	let fx = Fixture::form().await;
	let mut opts = with_suffix("1");
	opts.target_parent_id("ext_owner");

	duplicate_subtree(&fx.engine, &auth(), "grp", &opts).await.unwrap();
	assert_eq!(fx.node("grp-1").await.parent_id.as_deref(), Some("ext_owner"));
	assert_eq!(fx.node("width-1").await.parent_id.as_deref(), Some("grp-1"));
}

#[tokio::test]
async fn test_external_parent_reused_or_cloned() {
	let fx = Fixture::form().await;

	duplicate_subtree(&fx.engine, &auth(), "width", &with_suffix("1")).await.unwrap();
	assert_eq!(fx.node("width-1").await.parent_id.as_deref(), Some("grp"));

	let mut opts = with_suffix("2");
	opts.clone_external_parents(true);
	let res = duplicate_subtree(&fx.engine, &auth(), "width", &opts).await.unwrap();

	// The branch is cloned, the section above it is not
	assert_eq!(res.node_id_map["grp"], "grp-2");
	assert_eq!(fx.node("grp-2").await.parent_id.as_deref(), Some("sec"));
	assert_eq!(fx.node("width-2").await.parent_id.as_deref(), Some("grp-2"));
	assert!(fx.store.read_node("sec-2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unauthorized_before_any_write() {
	let fx = Fixture::form().await;
	let counts = fx.store.counts().await;

	let res = duplicate_subtree(&fx.engine, &AuthCtx::organization("other"), "grp", &with_suffix("1")).await;
	assert!(matches!(res, Err(Error::Unauthorized)));
	assert_eq!(fx.store.counts().await, counts);

	let res = duplicate_subtree(&fx.engine, &AuthCtx::super_admin(), "grp", &with_suffix("1")).await;
	assert!(res.is_ok());
}

#[tokio::test]
async fn test_missing_node() {
	let fx = Fixture::form().await;
	let res = duplicate_subtree(&fx.engine, &auth(), "missing", &with_suffix("1")).await;
	assert!(matches!(res, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_invalid_suffix() {
	let fx = Fixture::form().await;
	let res = duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("a-b")).await;
	assert!(matches!(res, Err(Error::ValidationError(_))));
	assert!(fx.store.read_node("grp-a-b").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_capacity_is_skipped() {
	let fx = Fixture::form().await;
	fx.store.fail_on_create("f_w-1").await;

	let res = duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();
	assert!(!res.complete);
	assert_eq!(res.skipped.len(), 1);
	assert_eq!(res.skipped[0].node_id, "width");
	assert_eq!(res.skipped[0].capacity_id.as_deref(), Some("f_w"));

	// The rest of the run went through
	assert!(fx.store.read_node("width-1").await.unwrap().is_some());
	assert!(fx.store.read_variable("v_w-1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_repeat_context_events_and_repeater_block() {
	let fx = Fixture::form().await;
	fx.add_node(Node {
		repeater: Some(RepeaterBlock { template_node_ids: vec!["width".into()], ..RepeaterBlock::default() }),
		..node("rep", Some("grp"), 3, "branch")
	})
	.await;

	let mut opts = with_suffix("1");
	opts.repeat_context(RepeatContext { repeater_node_id: "rep".into(), ..RepeatContext::default() });
	duplicate_subtree(&fx.engine, &auth(), "grp", &opts).await.unwrap();

	assert!(fx.node("rep-1").await.repeater.is_none());

	let events = fx.events.events();
	let formula = events.iter().find(|e| e.capacity_id == "f_w-1").expect("formula event");
	assert_eq!(formula.owner_node_id, "width-1");
	assert_eq!(formula.referenced_node_ids, vec!["height-1"]);
	assert_eq!(formula.repeat_context.as_ref().map(|c| c.repeater_node_id.as_str()), Some("rep"));
}

#[tokio::test]
async fn test_repeater_block_rewritten_without_context() {
	let fx = Fixture::form().await;
	fx.add_node(Node {
		repeater: Some(RepeaterBlock { template_node_ids: vec!["tpl".into()], ..RepeaterBlock::default() }),
		..node("rep", Some("grp"), 3, "branch")
	})
	.await;
	fx.add_node(node("tpl", Some("rep"), 0, "leaf_field")).await;

	duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();

	let repeater = fx.node("rep-1").await.repeater.unwrap();
	assert_eq!(repeater.template_node_ids, vec!["tpl-1"]);
}

#[tokio::test]
async fn test_dangling_reference_reported() {
	let fx = Fixture::form().await;
	fx.add_node(Node { has_formula: true, ..node("total", Some("grp"), 2, "leaf_field") }).await;
	fx.add_formula(formula("f_t", "total", 0, vec![json!("@value.ext_owner")])).await;

	let res = duplicate_subtree(&fx.engine, &auth(), "grp", &with_suffix("1")).await.unwrap();

	let formula = fx.store.read_formula("f_t-1").await.unwrap().unwrap();
	assert_eq!(formula.tokens, vec![json!("@value.ext_owner-1")]);
	assert!(res.complete);
	assert!(res.dangling_references.iter().any(|d| d.id == "ext_owner-1"));
}

#[tokio::test]
async fn test_self_referencing_leaf() {
	let fx = Fixture::form().await;
	fx.add_node(Node { has_formula: true, ..node("solo", Some("sec"), 4, "leaf_field") }).await;
	fx.add_formula(formula("f_s", "solo", 0, vec![json!("@value.solo"), json!("+"), json!(1)])).await;

	let res = duplicate_subtree(&fx.engine, &auth(), "solo", &with_suffix("1")).await.unwrap();
	assert_eq!(res.root_id, "solo-1");
	assert!(res.dangling_references.is_empty());

	let formula = fx.store.read_formula("f_s-1").await.unwrap().unwrap();
	assert_eq!(formula.tokens, vec![json!("@value.solo-1"), json!("+"), json!(1)]);
	assert_eq!(fx.node("solo-1").await.parent_id.as_deref(), Some("sec"));
}

// vim: ts=4
