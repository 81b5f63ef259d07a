#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "ZOP_ONBOARD_BIND", default_value = "127.0.0.1:8080")]
    pub bind: std::net::SocketAddr,

    /// Enable logging to file ($XDG_STATE_HOME/zop-onboard/log/*).
    #[arg(long, default_value_t = false)]
    pub log_to_file: bool,
}

#[tokio::main]
pub async fn run(global: &crate::cmd::GlobalArgs, args: &ServeArgs) -> Result<(), anyhow::Error> {
    let config = global.load_config().await?;
    if config.api_token.is_none() {
        tracing::warn!("api_token is not configured; the HTTP API accepts unauthenticated requests");
    }

    let store = crate::cmd::file_store(&config);
    let orchestrator = crate::orchestrator::Orchestrator::new_with_aws(config).await;
    let server = crate::server::Server::new(orchestrator, store);

    let listener = crate::server::bind_tcp(args.bind).await?;
    tracing::info!(bind = %args.bind, "Server starting");
    axum::serve(listener, server.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(err = ?e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(err = ?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
