//! Background static file server with graceful shutdown.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::routes::create_router;
use crate::SupervisorError;

/// A running file server. The listener is bound by the time `start` returns.
pub struct FileServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl FileServer {
    pub async fn start(host: &str, port: u16, images_dir: &Path) -> Result<Self, SupervisorError> {
        let listener = tokio::net::TcpListener::bind((host, port))
            .await
            .map_err(|e| SupervisorError::Bind {
                addr: format!("{}:{}", host, port),
                source: e,
            })?;
        let addr = listener.local_addr()?;

        let app = create_router(images_dir);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!("Serving {} at http://{}", images_dir.display(), addr);
        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and wait up to `timeout` for open connections to
    /// finish before aborting the server task.
    pub async fn stop(&mut self, timeout: Duration) -> Result<(), SupervisorError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(Ok(()))) => {
                info!("File server on {} stopped", self.addr);
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(SupervisorError::Serve(self.addr, e.to_string())),
            Ok(Err(e)) => Err(SupervisorError::Serve(self.addr, e.to_string())),
            Err(_) => {
                warn!(
                    "File server on {} did not stop within {}s; aborting",
                    self.addr,
                    timeout.as_secs()
                );
                handle.abort();
                Ok(())
            }
        }
    }
}

impl Drop for FileServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
