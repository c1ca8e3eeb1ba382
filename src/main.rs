//! CLI entry point (§6). One process per operation:
//!
//! - no subcommand: run the indexing orchestrator (C10), full or incremental
//!   depending on whether `BASE_REF`/`CHANGED_FILES` resolved to anything.
//! - `--verify`: skip indexing and report `verify_integrity` (B.4) for the
//!   configured repo/branch instead.
//! - `serve`: start the HTTP retrieval façade (C15) over an existing store.
//!
//! Environment and flags are resolved by `RuntimeConfig::resolve` (A.3); CLI
//! flags win when both are set. The closing `__RESULT__:<json>` line is the
//! one sanctioned direct stdout write outside this file.

use anyhow::Context;
use clap::{Parser, Subcommand};
use codegraph_lens::api::{self, AppState};
use codegraph_lens::diff::{self, ChangeSet};
use codegraph_lens::embed::model2vec::Model2VecEmbedder;
use codegraph_lens::embed::Embedder;
use codegraph_lens::index::Orchestrator;
use codegraph_lens::query::QueryEngine;
use codegraph_lens::runtime_config::{CliOverrides, RuntimeConfig};
use codegraph_lens::store::postgres::PostgresStore;
use codegraph_lens::store::Store;
use std::process::Command;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "codegraph-lens")]
#[command(version)]
#[command(about = "Code-intelligence indexer and hybrid retrieval service")]
struct Cli {
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    repo_path: Option<String>,
    #[arg(long)]
    repo_url: Option<String>,
    #[arg(long)]
    repo_branch: Option<String>,
    #[arg(long)]
    embedding_model: Option<String>,
    #[arg(long)]
    base_ref: Option<String>,
    #[arg(long)]
    changed_files: Option<String>,

    /// Override §4.2's nested-function fallback threshold.
    #[arg(long)]
    nested_threshold: Option<u32>,
    /// Override the line-window fallback chunker's max window size.
    #[arg(long)]
    fallback_max_lines: Option<u32>,
    /// Override the line-window fallback chunker's overlap.
    #[arg(long)]
    fallback_overlap_lines: Option<u32>,
    /// Override the embedding batch size.
    #[arg(long)]
    embed_batch: Option<usize>,

    /// Check stored invariants (§8) for the configured repo/branch instead of indexing.
    #[arg(long)]
    verify: bool,

    #[command(subcommand)]
    cmd: Option<Command_>,
}

#[derive(Debug, Subcommand)]
enum Command_ {
    /// Start the HTTP retrieval façade (C15) over an already-indexed store.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

fn overrides_from(cli: &Cli) -> CliOverrides {
    CliOverrides {
        database_url: cli.database_url.clone(),
        repo_path: cli.repo_path.clone(),
        repo_url: cli.repo_url.clone(),
        repo_branch: cli.repo_branch.clone(),
        embedding_model: cli.embedding_model.clone(),
        base_ref: cli.base_ref.clone(),
        changed_files: cli.changed_files.clone(),
        nested_threshold: cli.nested_threshold,
        fallback_max_lines: cli.fallback_max_lines,
        fallback_overlap_lines: cli.fallback_overlap_lines,
        embed_batch: cli.embed_batch,
    }
}

/// Resolve the incremental change set from `CHANGED_FILES` (preferred, no
/// subprocess needed) or by shelling out to `git diff --name-status` against
/// `BASE_REF` in the working copy (§6's second accepted diff-source shape).
fn resolve_change_set(cfg: &RuntimeConfig) -> anyhow::Result<Option<ChangeSet>> {
    if let Some(raw) = &cfg.changed_files {
        return Ok(Some(diff::parse_changed_files_env(raw)));
    }
    if let Some(base_ref) = &cfg.base_ref {
        let output = Command::new("git")
            .arg("diff")
            .arg("--name-status")
            .arg(base_ref)
            .current_dir(&cfg.repo_path)
            .output()
            .context("failed to run git diff for BASE_REF")?;
        if !output.status.success() {
            anyhow::bail!("git diff --name-status {base_ref} failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        return Ok(Some(diff::parse_git_name_status(&String::from_utf8_lossy(&output.stdout))));
    }
    Ok(None)
}

async fn build_store(cfg: &RuntimeConfig) -> anyhow::Result<Arc<dyn Store>> {
    let store = PostgresStore::connect(&cfg.database_url).await.context("failed to connect to DATABASE_URL")?;
    Ok(Arc::new(store))
}

fn build_embedder(cfg: &RuntimeConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedder = Model2VecEmbedder::load(&cfg.embedding_model).context("failed to load EMBEDDING_MODEL")?;
    Ok(Arc::new(embedder))
}

async fn run_index(cfg: RuntimeConfig) -> anyhow::Result<()> {
    let store = build_store(&cfg).await?;
    let embedder = build_embedder(&cfg)?;
    let orchestrator = Orchestrator::new(store, embedder);

    let (stats, write_failure) = match resolve_change_set(&cfg)? {
        Some(changes) => orchestrator.run_incremental(&cfg, changes).await?,
        None => orchestrator.run_full(&cfg).await?,
    };

    println!("__RESULT__:{}", serde_json::to_string(&stats)?);
    if write_failure {
        anyhow::bail!("every write batch failed; no persistent data was written");
    }
    Ok(())
}

async fn run_verify(cfg: RuntimeConfig) -> anyhow::Result<()> {
    let store = build_store(&cfg).await?;
    let embedder = build_embedder(&cfg)?;
    let engine = QueryEngine::new(store, embedder);
    let report = engine.verify_integrity(&cfg.repo_url, &cfg.repo_branch).await?;

    println!("__RESULT__:{}", serde_json::to_string(&report)?);
    if !report.violations.is_empty() {
        anyhow::bail!("{} integrity violation(s) found", report.violations.len());
    }
    Ok(())
}

async fn run_serve(cfg: RuntimeConfig, port: u16) -> anyhow::Result<()> {
    let store = build_store(&cfg).await?;
    store.migrate().await.context("schema migration failed")?;
    let embedder = build_embedder(&cfg)?;
    let model_name = embedder.model_name().to_string();
    let engine = QueryEngine::new(store.clone(), embedder);

    let state = Arc::new(AppState { engine, store, model_name });
    let router = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await.context("failed to bind HTTP listener")?;
    tracing::info!(port, "codegraph-lens HTTP façade listening");
    axum::serve(listener, router).await.context("HTTP server error")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let cli = Cli::parse();
    let overrides = overrides_from(&cli);

    if let Some(Command_::Serve { port }) = cli.cmd {
        let cfg = RuntimeConfig::resolve(overrides).context("invalid configuration")?;
        return run_serve(cfg, port).await;
    }

    let cfg = RuntimeConfig::resolve(overrides).context("invalid configuration")?;
    if cli.verify {
        run_verify(cfg).await
    } else {
        run_index(cfg).await
    }
}
