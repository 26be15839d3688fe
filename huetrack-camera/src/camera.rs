//! One opened camera: capture task, connection policy, frame fan-out.

use crate::error::CameraError;
use crate::source::{self, FrameProducer};
use crate::stream::{self, StreamSettings};
use huetrack_config::CameraDescriptor;
use huetrack_core::Frame;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, trace, warn};

/// Frames buffered per subscriber before the oldest are dropped.
const FRAME_BACKLOG: usize = 8;

/// Pause after a failed read before trying again.
const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Recognized keys of the opaque per-camera config blob. Everything else in
/// the blob is robot-specific tuning that only the device driver understands.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl CaptureSettings {
    /// Extract the recognized keys from a camera's raw config blob.
    pub fn from_raw(raw: &Value) -> Result<Self, CameraError> {
        let settings: CaptureSettings = serde_json::from_value(raw.clone())
            .map_err(|e| CameraError::Open(format!("bad camera config: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), CameraError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::Open("resolution must be non-zero".to_string()));
        }
        if self.width > 7680 || self.height > 4320 {
            return Err(CameraError::Open("resolution too large".to_string()));
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(CameraError::Open(
                "frame rate must be between 1 and 120".to_string(),
            ));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps))
    }
}

/// What the capture loop does with the device handle after a read error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStrategy {
    /// Hold the device open and retry the read.
    #[default]
    KeepOpen,
    /// Drop the handle and reopen the device.
    AutoManage,
}

/// An opened camera device with a running capture task.
pub struct Camera {
    name: String,
    path: String,
    settings: CaptureSettings,
    strategy: Arc<RwLock<ConnectionStrategy>>,
    frames: broadcast::Sender<Frame>,
    stream_port: u16,
}

impl Camera {
    /// Open the device named in the descriptor, apply its config blob, start
    /// the capture task and the MJPEG stream server.
    pub fn open(descriptor: &CameraDescriptor) -> Result<Self, CameraError> {
        let settings = CaptureSettings::from_raw(&descriptor.raw_config)?;
        let producer = source::open_producer(&descriptor.path, settings)?;

        let (frames, _) = broadcast::channel(FRAME_BACKLOG);
        let strategy = Arc::new(RwLock::new(ConnectionStrategy::default()));

        let stream_settings = StreamSettings::from_config(descriptor.stream_config.as_ref());
        let stream_port = stream::spawn(descriptor.name.clone(), frames.clone(), stream_settings);

        spawn_capture(
            descriptor.name.clone(),
            descriptor.path.clone(),
            settings,
            producer,
            frames.clone(),
            strategy.clone(),
        );

        Ok(Self {
            name: descriptor.name.clone(),
            path: descriptor.path.clone(),
            settings,
            strategy,
            frames,
            stream_port,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn settings(&self) -> CaptureSettings {
        self.settings
    }

    /// Port the MJPEG stream server was assigned.
    pub fn stream_port(&self) -> u16 {
        self.stream_port
    }

    pub fn set_connection_strategy(&self, strategy: ConnectionStrategy) {
        *self.strategy.write() = strategy;
    }

    pub fn connection_strategy(&self) -> ConnectionStrategy {
        *self.strategy.read()
    }

    /// New independent frame cursor. Every subscriber paces itself; lagging
    /// subscribers skip frames rather than slowing the capture loop.
    pub fn subscribe(&self) -> FrameRx {
        FrameRx {
            inner: self.frames.subscribe(),
        }
    }
}

/// Receiving end of a camera's frame fan-out.
pub struct FrameRx {
    inner: broadcast::Receiver<Frame>,
}

impl FrameRx {
    /// Wait for the next frame. Returns None once the camera is gone.
    pub async fn recv(&mut self) -> Option<Frame> {
        loop {
            match self.inner.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!("subscriber lagged, skipped {} frames", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

fn spawn_capture(
    name: String,
    path: String,
    settings: CaptureSettings,
    mut producer: Box<dyn FrameProducer>,
    frames: broadcast::Sender<Frame>,
    strategy: Arc<RwLock<ConnectionStrategy>>,
) {
    tokio::spawn(async move {
        let interval = settings.frame_interval();
        let mut seq: u64 = 0;

        loop {
            let start = std::time::Instant::now();

            match producer.next_frame(seq) {
                Ok(frame) => {
                    seq = seq.wrapping_add(1);
                    // No subscribers yet is fine; frames are simply dropped.
                    let _ = frames.send(frame);
                }
                Err(e) => {
                    warn!("camera '{}' read error: {}", name, e);
                    // copy the policy out so no lock is held while sleeping
                    let strategy = *strategy.read();
                    match strategy {
                        ConnectionStrategy::KeepOpen => {
                            tokio::time::sleep(READ_RETRY_DELAY).await;
                        }
                        ConnectionStrategy::AutoManage => {
                            tokio::time::sleep(READ_RETRY_DELAY).await;
                            match source::open_producer(&path, settings) {
                                Ok(reopened) => {
                                    info!("camera '{}' reopened", name);
                                    producer = reopened;
                                }
                                Err(e) => warn!("camera '{}' reopen failed: {}", name, e),
                            }
                        }
                    }
                    continue;
                }
            }

            let elapsed = start.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(raw: Value) -> CameraDescriptor {
        CameraDescriptor {
            name: "test".to_string(),
            path: "/dev/video0".to_string(),
            raw_config: raw,
            stream_config: None,
        }
    }

    #[test]
    fn test_capture_settings_defaults() {
        let settings = CaptureSettings::from_raw(&json!({})).unwrap();
        assert_eq!(settings.width, 640);
        assert_eq!(settings.height, 480);
        assert_eq!(settings.fps, 30);
    }

    #[test]
    fn test_capture_settings_recognized_keys() {
        let settings =
            CaptureSettings::from_raw(&json!({"width": 320, "height": 240, "fps": 15})).unwrap();
        assert_eq!(settings.width, 320);
        assert_eq!(settings.height, 240);
        assert_eq!(settings.fps, 15);
    }

    #[test]
    fn test_capture_settings_ignores_unrecognized_keys() {
        let raw = json!({
            "name": "front", "path": "/dev/video0",
            "brightness": 50, "white balance": "auto", "fps": 20
        });
        let settings = CaptureSettings::from_raw(&raw).unwrap();
        assert_eq!(settings.fps, 20);
    }

    #[test]
    fn test_capture_settings_rejects_bad_types() {
        assert!(CaptureSettings::from_raw(&json!({"width": "wide"})).is_err());
    }

    #[test]
    fn test_capture_settings_rejects_zero_resolution() {
        assert!(CaptureSettings::from_raw(&json!({"width": 0})).is_err());
        assert!(CaptureSettings::from_raw(&json!({"height": 0})).is_err());
    }

    #[test]
    fn test_capture_settings_rejects_bad_fps() {
        assert!(CaptureSettings::from_raw(&json!({"fps": 0})).is_err());
        assert!(CaptureSettings::from_raw(&json!({"fps": 240})).is_err());
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let result = Camera::open(&descriptor(json!({"width": 0})));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_defaults_to_keep_open() {
        let camera = Camera::open(&descriptor(json!({}))).unwrap();
        assert_eq!(camera.connection_strategy(), ConnectionStrategy::KeepOpen);
        camera.set_connection_strategy(ConnectionStrategy::AutoManage);
        assert_eq!(camera.connection_strategy(), ConnectionStrategy::AutoManage);
    }

    #[tokio::test]
    async fn test_subscriber_receives_frames() {
        let camera = Camera::open(&descriptor(json!({"fps": 120}))).unwrap();
        let mut rx = camera.subscribe();
        let frame = rx.recv().await.expect("capture task should produce frames");
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
    }

    #[tokio::test]
    async fn test_two_subscribers_get_independent_cursors() {
        let camera = Camera::open(&descriptor(json!({"fps": 120}))).unwrap();
        let mut a = camera.subscribe();
        let mut b = camera.subscribe();
        let fa = a.recv().await.unwrap();
        let fb = b.recv().await.unwrap();
        // both see frames from the same capture loop
        assert_eq!(fa.width, fb.width);
    }
}
