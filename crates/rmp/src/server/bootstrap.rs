use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::common::config::Config;
use crate::db::Database;
use crate::report::scheduler::run_scheduler;
use crate::server::{AppState, create_router};
use crate::service::permission::load_matrix;
use crate::zoho::sync::run_sync_loop;
use crate::zoho::{ZohoApi, ZohoClient};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(error) => {
                log::error!("Cannot listen for SIGTERM: {error}");
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
}

/// Opens the database, starts background jobs and serves the API until a
/// shutdown signal arrives.
pub async fn start_server(config: Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path).with_context(|| {
        format!("Cannot open database {}", config.database.path.display())
    })?;
    let matrix = db
        .call(|conn| load_matrix(conn))
        .await
        .context("Cannot load permission overrides")?;

    let zoho: Option<Arc<dyn ZohoApi>> = match &config.zoho {
        Some(section) => {
            let client = ZohoClient::new(section.clone()).context("Cannot create Zoho client")?;
            Some(Arc::new(client))
        }
        None => None,
    };

    let mut jobs = Vec::new();
    if !config.reports.schedule.is_empty() {
        jobs.push(tokio::spawn(run_scheduler(
            db.clone(),
            config.reports.output_dir.clone(),
            config.reports.schedule.clone(),
        )));
    }
    if let (Some(api), Some(interval)) = (
        zoho.clone(),
        config.zoho.as_ref().and_then(|z| z.sync_interval),
    ) {
        jobs.push(tokio::spawn(run_sync_loop(db.clone(), api, interval)));
    }

    let state = AppState::new(db, matrix, zoho);
    let app = create_router(state, &config);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Cannot bind to {address}"))?;
    log::info!("RMP server listening on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    for job in jobs {
        job.abort();
    }
    log::info!("Server stopped");
    Ok(())
}
