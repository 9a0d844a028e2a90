use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use trendlens::{analysis::Analyzer, api, config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing();
    let analyzer =
        Analyzer::from_config(config::get_config()).context("failed to build analyzer")?;
    let app = api::create_router(Arc::new(analyzer));

    let (listener, port) = bind_listener().await.context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    let served = axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly");
    logging::shutdown_tracing();
    served
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 5001..=5099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 5001-5099",
    ))
}
