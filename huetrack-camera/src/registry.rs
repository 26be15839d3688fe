//! Best-effort startup of every configured camera.

use crate::camera::{Camera, ConnectionStrategy};
use huetrack_config::CameraDescriptor;
use tracing::{error, info};

pub struct CameraRegistry;

impl CameraRegistry {
    /// Open every descriptor in order. A camera that fails to open is
    /// reported and skipped; the rest still come up. The returned handles
    /// preserve descriptor order.
    pub fn open_all(descriptors: &[CameraDescriptor]) -> Vec<Camera> {
        let mut cameras = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            match Camera::open(descriptor) {
                Ok(camera) => {
                    camera.set_connection_strategy(ConnectionStrategy::KeepOpen);
                    info!(
                        "started camera '{}' on {} ({}x{} @ {}fps, stream port {})",
                        camera.name(),
                        camera.path(),
                        camera.settings().width,
                        camera.settings().height,
                        camera.settings().fps,
                        camera.stream_port(),
                    );
                    cameras.push(camera);
                }
                Err(e) => error!("failed to start camera '{}': {}", descriptor.name, e),
            }
        }
        cameras
    }
}
