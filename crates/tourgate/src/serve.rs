//! Gateway service entry point.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{
    Layout, default_root,
    config::GatewayConfig,
    i18n::{catalog::Catalog, translate::TranslationEngine},
    rpc::serve::{RpcServer, RpcState},
    store::TourStore,
    web::http::{self, HttpState},
};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the workspace root directory.
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Bind address for the HTTP API (e.g. 127.0.0.1:8787).
    #[arg(long, value_name = "ADDR")]
    pub http_bind: Option<SocketAddr>,
    /// Override the locale bundle directory.
    #[arg(long, value_name = "DIR")]
    pub locales: Option<PathBuf>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let layout = resolve_layout(args.root.clone())?;
    layout.ensure()?;
    let _tracing_guard = init_tracing(&layout)?;

    if let Err(err) = run_impl(layout, args).await {
        error!(error = ?err, "gateway terminated with error");
        return Err(err);
    }
    info!("gateway exited cleanly");
    Ok(())
}

async fn run_impl(layout: Layout, args: ServeArgs) -> Result<()> {
    let config = GatewayConfig::load(layout.config_path())?;

    let locales_dir = args
        .locales
        .or_else(|| config.locales_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| layout.locales_dir().to_path_buf());
    let catalog = Catalog::load_dir(&locales_dir, config.default_language)?;
    info!(
        dir = %locales_dir.display(),
        languages = catalog.languages().count(),
        "locale bundles loaded"
    );

    let engine = Arc::new(TranslationEngine::new(Arc::new(catalog), config.default_language));
    crate::i18n::translate::install((*engine).clone());

    let tours = Arc::new(TourStore::sample());

    let rpc_socket_path = layout.rpc_socket_path();
    let rpc_server = RpcServer::new(RpcState::new(engine.clone(), tours.clone()), rpc_socket_path.clone());
    let rpc_handle = tokio::spawn(async move {
        if let Err(err) = rpc_server.start().await {
            error!("RPC server error: {err}");
        }
    });

    let http_addr = args
        .http_bind
        .or(config.http_bind)
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 0)));
    let http_handle =
        http::spawn_http_server(HttpState::new(engine.clone(), tours.clone()), http_addr).await?;

    info!(
        http_addr = %http_handle.addr(),
        rpc_socket = %rpc_socket_path.display(),
        default_language = %engine.default_language(),
        "gateway ready"
    );

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    match (&mut ctrl_c).await {
        Ok(()) => {
            info!("received Ctrl+C, shutting down gateway");
        }
        Err(err) => {
            warn!(error = ?err, "failed to listen for Ctrl+C");
        }
    }

    rpc_handle.abort();
    http_handle.shutdown();

    if rpc_socket_path.exists() {
        let _ = std::fs::remove_file(&rpc_socket_path);
    }

    info!("gateway stopped cleanly");
    Ok(())
}

fn resolve_layout(root_override: Option<PathBuf>) -> Result<Layout> {
    let root = match root_override {
        Some(path) => expand_tilde(path)?,
        None => default_root()?,
    };
    debug!(root = %root.display(), "resolved workspace root");
    Ok(Layout::new(root))
}

fn expand_tilde(path: PathBuf) -> Result<PathBuf> {
    if let Some(str_path) = path.to_str() {
        if let Some(stripped) = str_path.strip_prefix('~') {
            let home = dirs_home().context("cannot expand '~', HOME unset")?;
            if stripped.is_empty() {
                return Ok(home);
            }
            let stripped = stripped.strip_prefix('/').unwrap_or(stripped);
            return Ok(home.join(stripped));
        }
    }
    Ok(path)
}

fn dirs_home() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        if !profile.is_empty() {
            return Some(PathBuf::from(profile));
        }
    }
    None
}

fn init_tracing(layout: &Layout) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    let gateway_log_dir = layout.logs_dir().join("gateway");
    std::fs::create_dir_all(&gateway_log_dir).with_context(|| {
        format!("failed to create gateway log directory {}", gateway_log_dir.display())
    })?;
    let file_appender = rolling::hourly(gateway_log_dir, "gateway.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
