use crate::config::AppConfig;
use crate::context::ContextStore;
use crate::dispatcher::Dispatcher;
use crate::hot_reload::watch_document;
use crate::mock;
use crate::router::Registry;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer, ServerHandle};
use crate::spec::{self, OpenApiDocument};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for brrtmock
#[derive(Parser, Debug)]
#[command(name = "brrtmock")]
#[command(about = "Mock an API from its OpenAPI document", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve random responses for every operation in an OpenAPI document
    Serve {
        /// Path to the OpenAPI document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Listen address; overrides `server.addr` from the config file
        #[arg(long)]
        addr: Option<String>,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reload the document and resync routes when the file changes
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Print the routes a document would register
    Routes {
        /// Path to the OpenAPI document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },
}

/// Parse arguments and run the selected command.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            spec,
            addr,
            config,
            watch,
        } => serve(&spec, addr, config.as_deref(), watch),
        Commands::Routes { spec } => {
            let document = spec::load_document(&spec)?;
            for line in route_lines(&document) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

/// One `METHOD path` line per registered operation, sorted by path.
pub fn route_lines(document: &OpenApiDocument) -> Vec<String> {
    let registry = Registry::new();
    mock::register_document(&registry, document);
    let base = document
        .base_path
        .as_deref()
        .unwrap_or_default()
        .trim_end_matches('/');
    registry
        .routes()
        .into_iter()
        .flat_map(|entry| {
            entry
                .methods
                .into_iter()
                .map(move |method| format!("{:<7} {base}{}", method.as_str(), entry.path))
        })
        .collect()
}

/// Wire the document, registry, dispatcher and server together and start
/// listening.
///
/// The returned watcher (if any) must be kept alive for reloads to happen.
pub fn start_server(
    spec_path: &Path,
    config: AppConfig,
    runtime: RuntimeConfig,
    watch: bool,
) -> Result<(ServerHandle, Option<notify::RecommendedWatcher>)> {
    runtime.apply();

    let document = spec::load_document(spec_path)?;
    let registry = Arc::new(Registry::new());
    mock::register_document(&registry, &document);

    let proxy_client = reqwest::blocking::Client::builder()
        .build()
        .context("Failed to build proxy client")?;
    let dispatcher = Arc::new(
        Dispatcher::new(registry, Arc::new(ContextStore::new()))
            .with_document(document)
            .with_proxy_client(proxy_client)
            .with_proxy_timeout(config.proxy.timeout()),
    );

    let watcher = if watch {
        let watcher = watch_document(spec_path, Arc::clone(&dispatcher), |dispatcher, previous, next| {
            mock::sync_document(dispatcher.registry(), previous, next);
        })
        .with_context(|| format!("Failed to watch {}", spec_path.display()))?;
        Some(watcher)
    } else {
        None
    };

    let addr = config.server.addr.clone();
    let service = AppService::new(dispatcher, Arc::new(config), runtime.request_timeout);
    let handle = HttpServer(service)
        .start(addr.as_str())
        .with_context(|| format!("Failed to bind {addr}"))?;
    Ok((handle, watcher))
}

fn serve(spec_path: &Path, addr: Option<String>, config_path: Option<&Path>, watch: bool) -> Result<()> {
    let mut config = match config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(addr) = addr {
        config.server.addr = addr;
    }
    let runtime = RuntimeConfig::from_env();

    info!(
        spec = %spec_path.display(),
        addr = %config.server.addr,
        watch,
        stack_size = runtime.stack_size,
        "Starting mock server"
    );
    let (handle, _watcher) = start_server(spec_path, config, runtime, watch)?;
    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutting down");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}
