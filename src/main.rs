//! sqlite-proxy - run query-builder statements against an embedded SQLite database.

mod cli;

use anyhow::Context;
use cli::Cli;
use sqlite_proxy::config::Config;
use sqlite_proxy::error::ProxyError;
use sqlite_proxy::logging;
use sqlite_proxy::proxy::ProxyExecutor;
use sqlite_proxy::storage::SqliteEngine;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    match &cli.log_file {
        Some(path) => logging::init_file_logging(path),
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ProxyError>() {
            Some(proxy_err) => error!("{}: {}", proxy_err.category(), proxy_err),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let storage = cli.storage_config(&config);
    let engine = SqliteEngine::with_options(storage.engine_options());
    let proxy = ProxyExecutor::new(engine, storage.locator()).with_policy(cli.policy(&config));
    info!("Database: {}", proxy.locator());

    let output = run_and_close(&cli, &proxy).await?;
    println!("{output}");

    Ok(())
}

/// Runs the statement, then closes the engine whether or not it succeeded.
async fn run_and_close(cli: &Cli, proxy: &ProxyExecutor<SqliteEngine>) -> anyhow::Result<String> {
    let output = run_statement(cli, proxy).await;
    proxy.engine().close().await;
    output
}

async fn run_statement(cli: &Cli, proxy: &ProxyExecutor<SqliteEngine>) -> anyhow::Result<String> {
    let serialized = if cli.raw {
        let rows = proxy.raw_query(&cli.sql, &cli.params).await?;
        serde_json::to_string_pretty(&rows)
    } else {
        let result = proxy.execute(&cli.sql, &cli.params, cli.method).await?;
        serde_json::to_string_pretty(&result)
    };
    serialized.context("Failed to serialize result")
}
