//! V4L2 device capture, compiled on robot builds only.

use crate::camera::CaptureSettings;
use crate::error::CameraError;
use crate::source::FrameProducer;
use huetrack_core::Frame;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, FourCC};

/// MJPEG-capable V4L2 capture device.
pub struct V4lSource {
    stream: Stream<'static>,
}

impl V4lSource {
    pub fn open(path: &str, settings: CaptureSettings) -> Result<Self, CameraError> {
        // Device handles live for the whole process; the keep-open policy
        // never closes them.
        let device: &'static Device = Box::leak(Box::new(Device::with_path(path)?));

        let mut format = device.format()?;
        format.width = settings.width;
        format.height = settings.height;
        format.fourcc = FourCC::new(b"MJPG");
        let format = device.set_format(&format)?;
        if &format.fourcc.repr != b"MJPG" {
            return Err(CameraError::Open(format!(
                "device at {path} does not support MJPEG capture"
            )));
        }

        device.set_params(&Parameters::with_fps(settings.fps))?;

        let stream = Stream::with_buffers(device, Type::VideoCapture, 4)?;
        Ok(Self { stream })
    }
}

impl FrameProducer for V4lSource {
    fn next_frame(&mut self, seq: u64) -> Result<Frame, CameraError> {
        let (buf, _meta) = self.stream.next()?;
        let decoded = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)
            .map_err(|e| CameraError::Capture(format!("MJPEG decode failed: {e}")))?
            .into_rgb8();

        let (width, height) = decoded.dimensions();
        Frame::rgb(width, height, decoded.into_raw(), seq)
            .map_err(|e| CameraError::Capture(e.to_string()))
    }
}
