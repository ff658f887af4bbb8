//! CLI entry point for the media backup tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use media_backup::auth::LoopbackFlow;
use media_backup::http::{CONNECT_TIMEOUT_SECS, build_http_client};
use media_backup::{
    CatalogClient, CredentialProvider, Database, Dispatcher, DownloadWorker, DownloadedItems,
    OAuthClient, WorkerPool,
};
use tracing::{debug, info};
use url::Url;

mod app_config;
mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let (config, config_path) = app_config::resolve(&args)?;
    match &config_path {
        Some(path) => debug!(path = %path.display(), "config file loaded"),
        None => debug!("no config file; using defaults"),
    }
    info!(
        variant = config.variant.as_str(),
        workers = config.workers,
        on_download_failure = %config.failure_policy,
        "Media backup starting"
    );

    let dirs = config.output_dirs();
    dirs.ensure_exist(config.scope())
        .await
        .context("Failed to create output directories")?;

    let db = Database::new(&config.database, config.db)
        .await
        .with_context(|| format!("Failed to open database '{}'", config.database.display()))?;
    let store = DownloadedItems::new(db.clone());

    let http = build_http_client(CONNECT_TIMEOUT_SECS).context("Failed to build HTTP client")?;

    let mut provider = CredentialProvider::new(
        OAuthClient::new(http.clone()),
        &config.token_file,
        &config.client_secrets,
    )
    .force_reauthorize(args.reauthorize);
    provider = if args.no_interactive {
        provider.non_interactive()
    } else {
        provider.with_flow(Arc::new(LoopbackFlow::with_presenter(Arc::new(|url: &Url| {
            eprintln!("Open this URL in a browser to authorize access:\n\n  {url}\n");
        }))))
    };
    let credential = provider.obtain().await.context("Authorization failed")?;

    let catalog = CatalogClient::new(
        http.clone(),
        &config.api_base_url,
        config.page_size,
        credential.token.clone(),
    );
    let worker = DownloadWorker::new(http, store.clone(), dirs)
        .with_scope(config.scope())
        .with_failure_policy(config.failure_policy)
        .with_url_suffix(config.variant.url_suffix().map(str::to_string));
    let pool = WorkerPool::new(config.workers, Arc::new(worker));

    let summary = Dispatcher::new(catalog, store, pool)
        .with_limits(config.limits)
        .with_scope(config.scope())
        .count_archived_toward_cap(config.count_archived_toward_cap)
        .run()
        .await
        .context("Backup run aborted")?;

    info!(
        pages = summary.pages,
        downloaded = summary.downloaded,
        failed = summary.failed,
        cap_reached = summary.cap_reached,
        "Backup complete"
    );

    db.close().await;
    Ok(())
}
