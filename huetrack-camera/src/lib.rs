//! Camera acquisition, frame fan-out and MJPEG stream serving.
//!
//! Each opened [`Camera`] runs its own capture task and fans frames out
//! through a lossy broadcast channel: every subscriber keeps its own cursor
//! and pace, and slow readers skip frames instead of applying backpressure
//! to the capture loop.

pub mod camera;
#[cfg(feature = "v4l")]
mod device;
pub mod error;
pub mod registry;
pub mod source;
pub mod stream;

pub use camera::{Camera, CaptureSettings, ConnectionStrategy, FrameRx};
pub use error::CameraError;
pub use registry::CameraRegistry;
