#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use availability_notifier::config::Config;
use availability_notifier::{AppBuilder, api, telemetry};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::watch;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    availability_notifier::setup_panic_hook();

    let boot_span = tracing::info_span!("boot_server");
    let (api_listener, mgmt_listener, app_router, mgmt_app) = async {
        // Phase 1: One-time initialization and wiring
        let app = AppBuilder::new(config.clone()).build()?;

        // Phase 2: Routers and listeners
        let app_router =
            api::app_router(app.state, Duration::from_secs(config.server.invocation_timeout_secs));
        let mgmt_app = api::mgmt_router(app.mgmt);

        let api_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let mgmt_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.mgmt_port).parse()?;

        tracing::info!(address = %api_addr, "listening");
        tracing::info!(address = %mgmt_addr, "management server listening");

        let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
        let mgmt_listener = tokio::net::TcpListener::bind(mgmt_addr).await?;

        Ok::<_, anyhow::Error>((api_listener, mgmt_listener, app_router, mgmt_app))
    }
    .instrument(boot_span)
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    availability_notifier::spawn_signal_handler(shutdown_tx.clone());

    // Phase 3: Serve until shutdown
    let mut api_rx = shutdown_rx.clone();
    let api_server = axum::serve(api_listener, app_router).with_graceful_shutdown(async move {
        let _ = api_rx.wait_for(|&s| s).await;
    });

    let mut mgmt_rx = shutdown_rx.clone();
    let mgmt_server = axum::serve(mgmt_listener, mgmt_app).with_graceful_shutdown(async move {
        let _ = mgmt_rx.wait_for(|&s| s).await;
    });

    let servers = async { tokio::try_join!(api_server, mgmt_server) };

    // Phase 4: Bound the drain of in-flight invocations once shutdown begins
    let mut drain_rx = shutdown_rx;
    let drain_deadline = async move {
        let _ = drain_rx.wait_for(|&s| s).await;
        tokio::time::sleep(Duration::from_secs(config.server.shutdown_timeout_secs)).await;
    };

    tokio::select! {
        res = servers => {
            if let Err(e) = res {
                tracing::error!(error = %e, "Server error");
            }
            tracing::info!("Servers stopped.");
        }
        () = drain_deadline => {
            tracing::warn!("Timeout waiting for in-flight invocations to finish.");
        }
    }

    let _ = shutdown_tx.send(true);
    telemetry_guard.shutdown();
    Ok(())
}
