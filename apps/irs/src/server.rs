use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::endpoint::EndpointConfig;
use crate::llm_client::TextGenerator;
use crate::routes::build_router;
use crate::state::AppState;

/// Everything a server needs besides its endpoints. Built once in `main` and
/// passed down explicitly.
#[derive(Clone)]
pub struct ServerContext {
    pub generator: Arc<dyn TextGenerator>,
    pub port: u16,
}

impl ServerContext {
    pub fn new(generator: Arc<dyn TextGenerator>, port: u16) -> Self {
        Self { generator, port }
    }

    /// The full application: routes plus HTTP tracing and CORS layers.
    pub fn app(&self, endpoints: Vec<EndpointConfig>) -> Result<Router> {
        let state = AppState::new(endpoints, self.generator.clone())?;
        Ok(build_router(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()))
    }
}

pub async fn run_server(context: ServerContext, endpoints: Vec<EndpointConfig>) -> Result<()> {
    let app = context.app(endpoints)?;

    let addr: SocketAddr = format!("0.0.0.0:{}", context.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
