//! MJPEG-over-HTTP stream server, one per opened camera.

use crate::error::CameraError;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use huetrack_core::Frame;
use image::codecs::jpeg::JpegEncoder;
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

/// First port handed out when the stream config doesn't pick one.
const BASE_STREAM_PORT: u16 = 1181;

static NEXT_PORT: AtomicU16 = AtomicU16::new(0);

fn next_default_port() -> u16 {
    BASE_STREAM_PORT + NEXT_PORT.fetch_add(1, Ordering::Relaxed)
}

/// Recognized keys of the opaque stream config blob. `port` 0 means
/// auto-assign, `fps` 0 means serve at the capture rate.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(default)]
pub struct StreamSettings {
    pub port: u16,
    pub fps: u32,
}

impl StreamSettings {
    /// Extract recognized keys from the stream config. The blob is
    /// best-effort: a malformed one is reported and ignored.
    pub fn from_config(config: Option<&Value>) -> Self {
        match config {
            None => Self::default(),
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("bad stream config: {}", e);
                    Self::default()
                }
            },
        }
    }
}

#[derive(Clone)]
struct StreamState {
    frames: broadcast::Sender<Frame>,
    fps: u32,
}

/// Start serving this camera's frames. Returns the chosen port immediately;
/// a bind failure is reported from the background task.
pub fn spawn(name: String, frames: broadcast::Sender<Frame>, settings: StreamSettings) -> u16 {
    let port = if settings.port != 0 {
        settings.port
    } else {
        next_default_port()
    };

    tokio::spawn(async move {
        if let Err(e) = serve(&name, frames, port, settings.fps).await {
            warn!("camera '{}' stream server failed: {}", name, e);
        }
    });

    port
}

async fn serve(
    name: &str,
    frames: broadcast::Sender<Frame>,
    port: u16,
    fps: u32,
) -> Result<(), CameraError> {
    let state = StreamState { frames, fps };
    let app = Router::new()
        .route("/", get(index))
        .route("/stream.mjpg", get(mjpeg))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("camera '{}' streaming MJPEG on port {}", name, port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(r#"<html><body><img src="/stream.mjpg"/></body></html>"#)
}

async fn mjpeg(State(state): State<StreamState>) -> Response {
    let period = if state.fps > 0 {
        Duration::from_secs_f64(1.0 / f64::from(state.fps))
    } else {
        Duration::ZERO
    };

    let parts = BroadcastStream::new(state.frames.subscribe())
        .filter_map(|item| item.ok())
        .throttle(period)
        .map(|frame| Ok::<_, Infallible>(jpeg_part(&frame)));

    (
        [(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )],
        Body::from_stream(parts),
    )
        .into_response()
}

fn jpeg_part(frame: &Frame) -> Bytes {
    match encode_jpeg(frame) {
        Ok(jpeg) => {
            let mut part = Vec::with_capacity(jpeg.len() + 96);
            part.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n");
            part.extend_from_slice(format!("Content-Length: {}\r\n\r\n", jpeg.len()).as_bytes());
            part.extend_from_slice(&jpeg);
            part.extend_from_slice(b"\r\n");
            Bytes::from(part)
        }
        Err(e) => {
            warn!("dropping frame from stream: {}", e);
            Bytes::new()
        }
    }
}

/// Encode one frame as JPEG.
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, CameraError> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, 80);
    encoder
        .encode(
            &frame.pixels,
            frame.width,
            frame.height,
            image::ColorType::Rgb8,
        )
        .map_err(|e| CameraError::Stream(format!("JPEG encode failed: {e}")))?;
    Ok(out)
}
