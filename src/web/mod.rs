use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use salvo::prelude::*;
use tracing::info;

use crate::config::WebConfig;
use crate::db::DatabaseManager;
use crate::discord::EventNotifier;

pub mod handlers;
pub mod metrics;
pub mod router;

use self::metrics::BridgeMetrics;
use self::router::create_router;

/// Shared by every request through the router's state hoop.
pub struct WebState {
    pub db_manager: Arc<DatabaseManager>,
    pub metrics: Arc<BridgeMetrics>,
    pub notifier: Option<Arc<dyn EventNotifier>>,
    pub started_at: Instant,
}

impl WebState {
    pub fn new(
        db_manager: Arc<DatabaseManager>,
        metrics: Arc<BridgeMetrics>,
        notifier: Option<Arc<dyn EventNotifier>>,
    ) -> Self {
        Self {
            db_manager,
            metrics,
            notifier,
            started_at: Instant::now(),
        }
    }
}

#[derive(Clone)]
pub struct WebServer {
    config: WebConfig,
    state: Arc<WebState>,
}

impl WebServer {
    pub fn new(config: WebConfig, state: WebState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let bind_addr = format!("{}:{}", self.config.bind_address, self.config.port);
        info!("starting web server on {}", bind_addr);

        let acceptor = TcpListener::new(bind_addr).bind().await;
        Server::new(acceptor)
            .serve(create_router(self.state.clone()))
            .await;

        Ok(())
    }
}
