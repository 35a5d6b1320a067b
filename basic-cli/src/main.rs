use clap::Parser;
use std::{path::PathBuf, process::ExitCode, sync::Arc};

use treebranch_duplicate::{DuplicateOptions, Engine, duplicate_subtree};
use treebranch_store_adapter_sqlite::{AdapterConfig, TreeStoreAdapterSqlite};
use treebranch_types::prelude::*;

/// Duplicate a configuration subtree
#[derive(Debug, Parser)]
#[command(name = "treebranch-dup", version, long_about = None)]
struct Cli {
	/// Root node of the subtree to copy
	node_id: String,

	/// Data directory holding the tree database
	#[arg(long, env = "TREEBRANCH_DB", default_value = "./data")]
	db: PathBuf,

	/// Suffix token, the next free generation number when omitted
	#[arg(long, env = "TREEBRANCH_SUFFIX")]
	suffix: Option<String>,

	/// Parent of the copied root, its original parent when omitted
	#[arg(long, env = "TREEBRANCH_TARGET_PARENT")]
	target_parent: Option<String>,

	/// Keep shared references pointing at the shared originals
	#[arg(long, env = "TREEBRANCH_PRESERVE_SHARED")]
	preserve_shared: bool,

	/// Clone ancestors outside the subtree instead of reusing them
	#[arg(long, env = "TREEBRANCH_CLONE_EXTERNAL_PARENTS")]
	clone_external_parents: bool,

	/// Organization of the caller
	#[arg(long, env = "TREEBRANCH_ORG")]
	org: Option<String>,

	/// Run with super admin rights
	#[arg(long, env = "TREEBRANCH_SUPER_ADMIN")]
	super_admin: bool,
}

async fn run(cli: Cli) -> TbResult<String> {
	let store = TreeStoreAdapterSqlite::new(&cli.db, AdapterConfig::default()).await?;
	let engine = Engine::new(Arc::new(store));

	let auth = AuthCtx { organization_id: cli.org, is_super_admin: cli.super_admin };
	let mut opts = DuplicateOptions::new();
	opts.preserve_shared_references(cli.preserve_shared).clone_external_parents(cli.clone_external_parents);
	if let Some(suffix) = cli.suffix {
		opts.suffix(suffix);
	}
	if let Some(target) = cli.target_parent {
		opts.target_parent_id(target);
	}

	let result = duplicate_subtree(&engine, &auth, &cli.node_id, &opts).await?;
	Ok(serde_json::to_string_pretty(&result)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();

	match run(Cli::parse()).await {
		Ok(output) => {
			println!("{}", output);
			ExitCode::SUCCESS
		}
		Err(err) => {
			error!(error = %err, "duplication failed");
			ExitCode::FAILURE
		}
	}
}

// vim: ts=4
