use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fall_monitor::domain::events::MonitorEvent;
use fall_monitor::infrastructure::driven::HttpMonitoringClient;
use fall_monitor::infrastructure::driving::create_status_router;
use fall_monitor::infrastructure::MonitorConfig;
use fall_monitor::SessionController;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fall_monitor=info")),
        )
        .init();

    let config = MonitorConfig::load()?;
    let base_url = config.base_url()?;
    info!("Fall monitor starting against {}", base_url);

    let client = HttpMonitoringClient::new(base_url, config.request_timeout())?;
    let controller = Arc::new(SessionController::new(
        Arc::new(client),
        config.controller_settings(),
    ));

    let mut events = controller.events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match event.data {
                    MonitorEvent::FallDetected {
                        session_id,
                        fall_event_count,
                        confidence,
                    } => warn!(
                        "[session {}] FALL at {} ({} confidence, {} so far)",
                        session_id,
                        event.occurred_at,
                        confidence.as_percent(),
                        fall_event_count
                    ),
                    other => info!("{:?}", other),
                },
                Err(RecvError::Lagged(missed)) => {
                    warn!("Event log lagged, {} events missed", missed)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Some(addr) = config.listen_addr {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind status API on {}", addr))?;
        let app = create_status_router(Arc::clone(&controller));
        info!("Status API listening on {}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Status API stopped: {}", e);
            }
        });
    }

    controller
        .start()
        .await
        .context("Failed to start live monitoring")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown requested");

    if let Err(e) = controller.stop().await {
        warn!("Remote stop failed during shutdown: {}", e);
    }

    let final_stats = controller.snapshot().stats;
    info!(
        "Fall monitor exiting ({} fall events in the last session)",
        final_stats.fall_event_count
    );
    Ok(())
}
