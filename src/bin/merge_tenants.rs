//! Operator CLI: normalize tenant names and merge duplicate tenants.
//!
//! Run with --dry-run to print the plan (groups, keepers, duplicates)
//! without writing anything.

use clap::Parser;
use std::sync::Arc;

use pos_integrity_server::merge::MergeEngine;
use pos_integrity_server::store::{create_pool, PgStore, RowStore};
use pos_integrity_server::Config;

#[derive(Debug, Parser)]
#[command(name = "merge-tenants", about = "Merge duplicate tenant records")]
struct Args {
    /// Group and select only; print the plan without writing
    #[arg(long)]
    dry_run: bool,

    /// Worker pool size for independent groups (defaults to config)
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pos_integrity_server=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let pool = create_pool(&config.database_url).await?;
    let store: Arc<dyn RowStore> = Arc::new(PgStore::new(pool));
    let engine = MergeEngine::new(
        store,
        config.normalizer(),
        args.concurrency.unwrap_or(config.worker_concurrency),
    );

    if args.dry_run {
        let plan = engine.plan().await?;
        if plan.is_empty() {
            println!("Nothing to merge: every tenant name is already canonical.");
            return Ok(());
        }
        for group in &plan {
            println!(
                "{:<30} keeper {} ({:?}), {} duplicate(s)",
                group.normalized_name,
                group.keeper.id,
                group.keeper.name,
                group.duplicates.len()
            );
            for duplicate in &group.duplicates {
                println!("    would merge {} ({:?})", duplicate.id, duplicate.name);
            }
        }
        println!("\n{} group(s) would change. No writes performed.", plan.len());
        return Ok(());
    }

    let report = engine.run_pass().await?;
    for group in &report.groups {
        println!(
            "{:<30} keeper {} removed {} failed {}",
            group.normalized_name,
            group.keeper_id,
            group.removed.len(),
            group.failed.len()
        );
        for failure in &group.failed {
            println!("    kept {}: {}", failure.tenant_id, failure.error);
        }
    }
    println!(
        "\nMerged {} duplicate(s), renamed {} tenant(s), {} failure(s).",
        report.removed_count(),
        report.renamed_count(),
        report.failed_count()
    );

    if report.failed_count() > 0 {
        println!("Failed duplicates were preserved; re-run to retry them.");
        std::process::exit(1);
    }
    Ok(())
}
