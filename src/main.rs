use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use stockroom_api::config::{init_tracing, load_config};
use stockroom_api::db::{ensure_schema, establish_connection_from_app_config};
use stockroom_api::mailer::LogMailer;
use stockroom_api::{app_router, bootstrap, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(config.log_level(), config.log_json);
    info!(
        environment = %config.environment,
        "starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let db = establish_connection_from_app_config(&config)
        .await
        .context("failed to connect to the database")?;

    if config.auto_migrate {
        ensure_schema(&db).await.context("failed to create schema")?;
    }

    bootstrap::seed(&db, &config)
        .await
        .context("failed to seed built-in data")?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(Arc::new(db), Arc::new(config), Arc::new(LogMailer));
    let app = app_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
