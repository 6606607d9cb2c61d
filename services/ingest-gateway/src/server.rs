use axum::Router;
use std::{future::Future, net::SocketAddr};
use tokio::net::TcpListener;

use crate::app::build_router;
use crate::config::GatewayConfig;
use crate::state::AppState;
use crate::storage::{StorageError, UploadStore};

pub struct Gateway {
    config: GatewayConfig,
    state: AppState,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self, StorageError> {
        let store = UploadStore::open(&config.upload_dir, config.naming)?;
        let state = AppState {
            store,
            measurement_validation: config.measurement_validation,
            max_upload_bytes: config.max_upload_bytes,
        };
        Ok(Self { config, state })
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr();
        let listener = ingest_common::bind_listener(addr)
            .await
            .map_err(|err| anyhow::anyhow!("bind {addr}: {err}"))?;
        self.serve_on(listener, shutdown).await
    }

    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local: SocketAddr = listener.local_addr()?;
        tracing::info!(
            addr = %local,
            upload_dir = %self.config.upload_dir.display(),
            naming = ?self.config.naming,
            measurement_validation = ?self.config.measurement_validation,
            "listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("gateway stopped");
        Ok(())
    }
}
