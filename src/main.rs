//! symsync command-line interface.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use symsync::cache::LocalCache;
use symsync::config::{STATE_DIR, Settings};
use symsync::extract::{PythonExtractor, SymbolExtractor};
use symsync::indexing::{ProgressSink, ProjectIndexer};
use symsync::remote::{RemoteIndex, RemoteIndexClient};
use symsync::status::project_status;
use symsync::updater::{IncrementalUpdater, SyncGate};
use symsync::watch::SyncWatcher;

#[derive(Parser)]
#[command(name = "symsync", version, about = "Sync local code symbols with a remote context index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a default settings file in this workspace
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Run the initial full index of the workspace
    Index,
    /// Delete the remote project and rebuild everything from scratch
    Reindex,
    /// Watch the workspace and sync file changes incrementally
    Watch,
    /// Show project status and cache statistics
    Status,
    /// Discard the local cache
    Clear,
    /// Check backend connectivity
    Health,
}

/// Bridges batch progress onto an indicatif bar.
struct BarProgress(ProgressBar);

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::no_length();
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .expect("static progress template"),
        );
        Self(bar)
    }

    fn finish(&self) {
        self.0.finish_and_clear();
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, processed: usize, total: usize, message: &str) {
        self.0.set_length(total as u64);
        self.0.set_position(processed as u64);
        self.0.set_message(message.to_string());
    }
}

struct Engine {
    settings: Arc<Settings>,
    cache: Arc<RwLock<LocalCache>>,
    remote: Arc<dyn RemoteIndex>,
    extractor: Arc<dyn SymbolExtractor>,
    gate: Arc<SyncGate>,
}

impl Engine {
    fn build(settings: Settings) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);
        let root = settings.resolved_workspace_root();

        let mut cache = LocalCache::new(
            settings.cache_path(),
            root,
            settings.sync.max_cache_age_days,
        );
        cache.load();

        let remote = RemoteIndexClient::new(&settings.backend)
            .context("failed to construct backend client")?;

        Ok(Self {
            settings,
            cache: Arc::new(RwLock::new(cache)),
            remote: Arc::new(remote),
            extractor: Arc::new(PythonExtractor::new()),
            gate: Arc::new(SyncGate::new()),
        })
    }

    fn indexer(&self, progress: Arc<dyn ProgressSink>) -> ProjectIndexer {
        ProjectIndexer::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.cache),
            Arc::clone(&self.remote),
            Arc::clone(&self.extractor),
            progress,
            Arc::clone(&self.gate),
        )
    }

    fn updater(&self) -> IncrementalUpdater {
        IncrementalUpdater::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.remote),
            Arc::clone(&self.extractor),
            Arc::clone(&self.gate),
        )
    }
}

/// Cancel token wired to Ctrl-C, checked between indexing batches.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::Init { force } = &cli.command {
        return init_workspace(*force);
    }

    let settings = Settings::load().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    symsync::logging::init_with_config(&settings.logging);

    let engine = Engine::build(settings)?;

    match cli.command {
        Command::Init { .. } => unreachable!("handled above"),

        Command::Index => {
            let progress = Arc::new(BarProgress::new());
            let indexer = engine.indexer(progress.clone() as Arc<dyn ProgressSink>);
            let token = cancel_on_ctrl_c();
            let response = indexer.initialize(&token).await?;
            progress.finish();
            println!(
                "Indexed {} files, {} symbols ({} ms)",
                response.indexed_files, response.indexed_symbols, response.processing_time_ms
            );
        }

        Command::Reindex => {
            let progress = Arc::new(BarProgress::new());
            let indexer = engine.indexer(progress.clone() as Arc<dyn ProgressSink>);
            let token = cancel_on_ctrl_c();
            let response = indexer.reindex(&token).await?;
            progress.finish();
            println!(
                "Reindexed {} files, {} symbols",
                response.indexed_files, response.indexed_symbols
            );
        }

        Command::Watch => {
            if !engine.cache.read().await.is_indexed() {
                bail!("workspace is not indexed yet; run `symsync index` first");
            }
            let updater = Arc::new(engine.updater());
            let watcher = SyncWatcher::new(Arc::clone(&engine.settings), updater)?;
            watcher.run().await?;
        }

        Command::Status => {
            let cache = engine.cache.read().await;
            let status =
                project_status(&cache, engine.remote.as_ref(), engine.extractor.as_ref()).await;
            println!("Status: {status}");
            if let Some(project) = cache.project() {
                println!("Project: {}", project.project_id);
                println!(
                    "Cache: {} files, {} symbols, backend version {}",
                    project.statistics.total_files,
                    project.statistics.total_symbols,
                    project.backend_version
                );
                println!("Last indexed: {}", project.last_indexed_at.to_rfc3339());
            }
        }

        Command::Clear => {
            engine.cache.write().await.clear();
            println!("Local cache cleared");
        }

        Command::Health => match engine.remote.health().await {
            Ok(()) => println!("Backend OK at {}", engine.settings.backend.url),
            Err(e) => bail!("backend health check failed: {e}"),
        },
    }

    Ok(())
}

fn init_workspace(force: bool) -> anyhow::Result<()> {
    let path = std::path::Path::new(STATE_DIR).join("settings.toml");
    if path.exists() && !force {
        bail!(
            "{} already exists; use --force to overwrite",
            path.display()
        );
    }
    Settings::default()
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
