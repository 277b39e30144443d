//! Operator CLI: scan every configured table for rows still referencing
//! a user id, then optionally chain into the admin delete endpoint.

use clap::Parser;
use std::sync::Arc;

use pos_integrity_server::constants::ADMIN_SECRET_HEADER;
use pos_integrity_server::store::tables::USER_REFERENCE_PROBES_V1;
use pos_integrity_server::store::{create_pool, PgStore, RowStore};
use pos_integrity_server::validate::scan_references;
use pos_integrity_server::Config;

#[derive(Debug, Parser)]
#[command(
    name = "check-references",
    about = "Report every table still referencing a user id"
)]
struct Args {
    /// User id to scan for
    user_id: String,

    /// Post to the admin delete endpoint after the scan
    #[arg(long)]
    delete: bool,

    /// Base URL of the running server, used with --delete
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pos_integrity_server=warn".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let pool = create_pool(&config.database_url).await?;
    let store: Arc<dyn RowStore> = Arc::new(PgStore::new(pool));

    let scan = scan_references(store.as_ref(), &args.user_id, USER_REFERENCE_PROBES_V1).await;

    println!("References to {}:", scan.target_id);
    for table in &scan.tables {
        println!("  {:<22} {} row(s)", table.table, table.count);
        for row in &table.sample {
            println!("    {}", serde_json::to_string(row)?);
        }
    }
    for error in &scan.errors {
        println!("  {:<22} ERROR: {}", error.table, error.error);
    }
    println!(
        "\n{} reference(s) across {} table(s), {} table(s) unreadable.",
        scan.total_references(),
        scan.tables.len(),
        scan.errors.len()
    );

    if !args.delete {
        return Ok(());
    }

    println!("\nRequesting soft delete for {}...", args.user_id);
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/admin/delete-user", args.server_url))
        .header(ADMIN_SECRET_HEADER, &config.admin_secret_key)
        .json(&serde_json::json!({ "userId": args.user_id }))
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    println!("{status}: {body}");
    Ok(())
}
