//! MJPEG response body.

use super::AppState;
use crate::camera::MultipartFrames;
use crate::metrics::MetricsRegistry;
use axum::body::Body;
use futures_util::stream;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-connection bookkeeping. Dropped when the client goes away.
struct StreamClient {
    metrics: MetricsRegistry,
    closing: Arc<AtomicBool>,
}

impl StreamClient {
    fn new(metrics: MetricsRegistry, closing: Arc<AtomicBool>) -> Self {
        metrics.stream_opened();
        tracing::debug!("Stream client connected");
        Self { metrics, closing }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.metrics.stream_closed();
        tracing::debug!("Stream client disconnected");
    }
}

/// Builds an endless multipart body pulling one frame per chunk.
///
/// The body ends when the camera fails or the server starts shutting
/// down. Each pull runs on the blocking pool.
pub(crate) fn mjpeg_body(state: &AppState) -> Body {
    let client = StreamClient::new(state.metrics.clone(), Arc::clone(&state.closing));
    let frames = state.camera.frames();

    let chunks = stream::unfold(
        (frames, client),
        |(mut frames, client): (MultipartFrames, StreamClient)| async move {
            if client.closing.load(Ordering::SeqCst) {
                return None;
            }

            let pulled = tokio::task::spawn_blocking(move || {
                let next = frames.next();
                (frames, next)
            })
            .await;

            let (frames, next) = match pulled {
                Ok(pulled) => pulled,
                Err(e) => {
                    tracing::error!(error = %e, "Frame pull task failed");
                    return None;
                }
            };

            match next? {
                Ok(chunk) => {
                    client.metrics.frame_streamed();
                    Some((Ok::<_, Infallible>(chunk), (frames, client)))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Camera failed, ending stream");
                    None
                }
            }
        },
    );

    Body::from_stream(chunks)
}
