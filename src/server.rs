use std::{net::SocketAddr, str::FromStr};

use axum::Router;
use tracing::info;

use crate::Res;

/// Binds `addr` and serves `app` until the process stops.
pub async fn start_api_server(addr: &str, app: Router) -> Res<()> {
    let addr = SocketAddr::from_str(addr)
        .map_err(|e| format!("failed to parse server address {addr:?}: {e}"))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
