use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use thiserror::Error;

use crate::api::server::{AppState, Endpoints, RouteError};
use crate::util::env::{Env, EnvErr};

mod aggregate;
mod api;
mod constants;
mod enrich;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    State(#[from] RouteError),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    util::tracing::init_subscriber();

    let env = Env::init()?;
    let state = Arc::new(AppState::new(&env, Endpoints::default())?);

    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), env.server_port);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!(
        server_url = &format!("http://127.0.0.1:{}", env.server_port),
        "server ready"
    );

    axum::serve(listener, api::server::app(state)).await?;
    Ok(())
}
