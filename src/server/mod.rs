//! HTTP surface: MJPEG stream, capture control and the capture gallery API.
//!
//! # Endpoints
//!
//! | Method | Path | |
//! |--------|------|-|
//! | GET | `/camera/video_frame` | MJPEG multipart stream |
//! | GET | `/camera/frame` | one JPEG |
//! | GET | `/camera/captures/config/` | capture status |
//! | POST | `/camera/captures/config/capture_interval/` | form `capture_interval` |
//! | POST | `/camera/captures/config/set_status_capture_mode/` | form `status` |
//! | POST | `/camera/captures/remove/` | delete every capture |
//! | POST | `/camera/captures/capture/` | capture now |
//! | GET | `/camera/captures/`, `/camera/captures/page/:page/` | capture listing |
//! | GET | `/camera/capture/*path` | stored capture file |
//! | GET | `/metrics`, `/health` | Prometheus text, liveness |

mod error;
mod routes;
mod stream;

pub use error::ApiError;
pub use routes::router;

use crate::camera::CameraController;
use crate::capture::CaptureScheduler;
use crate::metrics::MetricsRegistry;
use crate::storage::CaptureStore;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while running the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The single camera handle.
    pub camera: CameraController,
    /// Capture scheduler sharing the same camera.
    pub scheduler: CaptureScheduler,
    /// Capture files and catalog.
    pub store: Arc<CaptureStore>,
    /// Metrics registry.
    pub metrics: MetricsRegistry,
    /// Page size of the captures listing.
    pub items_per_page: u32,
    closing: Arc<AtomicBool>,
}

impl AppState {
    /// Bundles the process-wide components.
    pub fn new(
        camera: CameraController,
        scheduler: CaptureScheduler,
        store: Arc<CaptureStore>,
        metrics: MetricsRegistry,
        items_per_page: u32,
    ) -> Self {
        Self {
            camera,
            scheduler,
            store,
            metrics,
            items_per_page,
            closing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes open streams finish after their current frame.
    pub fn begin_shutdown(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }
}

/// HTTP server for the camera API.
pub struct Server {
    bind_addr: SocketAddr,
    state: AppState,
}

impl Server {
    /// Creates a server for `state` listening on `bind_addr`.
    pub fn new(bind_addr: SocketAddr, state: AppState) -> Self {
        Self { bind_addr, state }
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// Once `shutdown` fires, open streams end after their next frame and
    /// in-flight requests are allowed to finish.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!(addr = %self.bind_addr, "Camera server listening");

        let state = self.state;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown requested, draining connections");
                state.begin_shutdown();
            })
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}
