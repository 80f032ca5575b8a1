use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use warden_api::config::WardenConfig;
use warden_api::kubernetes::KubeconfigProvider;
use warden_api::middleware::auth::generate_jwt_token;
use warden_api::{build_router, AppState};
use warden_common::auth::CallerContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("--print-sample-config") {
        print!("{}", WardenConfig::generate_sample());
        return Ok(());
    }

    // Load configuration
    let config = WardenConfig::load()?;

    if args.first().map(String::as_str) == Some("--issue-token") {
        return issue_token(&config, &args[1..]);
    }

    let _log_guard = config
        .logging
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(anyhow::anyhow!("Invalid configuration: {}", e));
    }
    info!(
        environments = config.environments.len(),
        absent_bindings = ?config.kubernetes.absent_bindings,
        "Configuration loaded successfully"
    );

    let provider = Arc::new(KubeconfigProvider::new(&config.environments));
    let state = Arc::new(AppState::new(&config, provider));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Warden API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Print a bearer token for `<username> [group...]`
fn issue_token(config: &WardenConfig, args: &[String]) -> anyhow::Result<()> {
    let (username, groups) = args
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("usage: warden-api --issue-token <username> [group...]"))?;

    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!("auth.jwt_secret (or WARDEN_JWT_SECRET) must be set");
    }

    let caller =
        CallerContext::new(username.clone(), username.clone()).with_groups(groups.iter().cloned());
    let token = generate_jwt_token(&config.auth.jwt_secret, &caller, config.auth.token_ttl_secs)
        .map_err(|e| anyhow::anyhow!(e))?;

    println!("{}", token);
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
