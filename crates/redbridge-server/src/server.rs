use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use redbridge_core::replay::ReplayStore;
use redbridge_core::rom::RomImage;

use crate::config::ServerConfig;
use crate::registry::Registry;
use crate::{AppState, app};

pub struct ServerHandle {
    addr: SocketAddr,
    registry: Arc<Registry>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Close every session (flushing replays), then stop serving.
    pub async fn shutdown(mut self) {
        self.registry.close_all().await;
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Validate the configured ROM, bind, and serve.
pub async fn start(cfg: ServerConfig) -> anyhow::Result<ServerHandle> {
    let rom = match &cfg.rom_path {
        Some(path) => {
            let rom = RomImage::open_verified(path)
                .with_context(|| format!("ROM {}", path.display()))?;
            tracing::info!(sha256 = rom.sha256(), "ROM verified");
            Some(Arc::new(rom))
        }
        None => None,
    };

    let cfg = Arc::new(cfg);
    let registry = Arc::new(Registry::new(Arc::clone(&cfg), rom));
    let replays = Arc::new(ReplayStore::new(&cfg.replay_dir));
    let state = AppState {
        cfg: Arc::clone(&cfg),
        registry: Arc::clone(&registry),
        replays,
    };

    let listener = TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("bind {}", cfg.bind_addr))?;
    let addr = listener.local_addr().context("read bound address")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app(state))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!("serve failed: {e}");
        }
    });

    tracing::info!("listening on http://{addr}");
    Ok(ServerHandle {
        addr,
        registry,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}
