use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use vulnmend_core::config::VulnmendConfig;
use vulnmend_daemon::api::{self, AppState};
use vulnmend_daemon::cli::DaemonCli;
use vulnmend_daemon::{logging, metrics_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = VulnmendConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    // CLI 오버라이드는 파일과 환경변수보다 우선
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    config.validate()?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(config = %cli.config.display(), "vulnmend-daemon starting");

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    tokio::fs::create_dir_all(&config.general.work_dir)
        .await
        .with_context(|| format!("failed to create work dir {}", config.general.work_dir))?;

    let config = Arc::new(config);
    let state = AppState::production(Arc::clone(&config));

    let addr: SocketAddr = format!("{}:{}", config.general.listen_addr, config.general.port)
        .parse()
        .context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        listen_addr = %addr,
        repos = config.repos.len(),
        "vulnmend-daemon running"
    );

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    tracing::info!("vulnmend-daemon shut down");
    Ok(())
}
