//! Frame producers: the capture side of a camera.

use crate::camera::CaptureSettings;
use crate::error::CameraError;
use huetrack_core::Frame;

/// A device (or synthetic source) that yields frames on demand. The capture
/// task calls this in a paced loop and fans the result out to subscribers.
pub trait FrameProducer: Send {
    fn next_frame(&mut self, seq: u64) -> Result<Frame, CameraError>;
}

#[cfg(feature = "v4l")]
pub(crate) fn open_producer(
    path: &str,
    settings: CaptureSettings,
) -> Result<Box<dyn FrameProducer>, CameraError> {
    Ok(Box::new(crate::device::V4lSource::open(path, settings)?))
}

/// Off-robot builds have no V4L2 devices; capture falls back to a synthetic
/// test pattern so the rest of the stack stays exercisable.
#[cfg(not(feature = "v4l"))]
pub(crate) fn open_producer(
    _path: &str,
    settings: CaptureSettings,
) -> Result<Box<dyn FrameProducer>, CameraError> {
    Ok(Box::new(TestPatternSource::new(settings)))
}

/// Synthetic frames: dark background with a blue and a red square sweeping
/// horizontally in opposite directions.
pub struct TestPatternSource {
    settings: CaptureSettings,
}

impl TestPatternSource {
    pub fn new(settings: CaptureSettings) -> Self {
        Self { settings }
    }
}

impl FrameProducer for TestPatternSource {
    fn next_frame(&mut self, seq: u64) -> Result<Frame, CameraError> {
        let w = self.settings.width;
        let h = self.settings.height;
        let mut data = vec![30u8; w as usize * h as usize * 3];

        let size = (h / 6).clamp(8, w);
        let span = u64::from((w - size).max(1));
        let step = seq.wrapping_mul(4) % span;

        let blue_x = step as u32;
        let red_x = (span - 1 - step) as u32;
        draw_rect(&mut data, w, h, blue_x, h / 4, size, (0, 80, 220));
        draw_rect(&mut data, w, h, red_x, h / 2, size, (210, 40, 40));

        Frame::rgb(w, h, data, seq).map_err(|e| CameraError::Capture(e.to_string()))
    }
}

fn draw_rect(data: &mut [u8], fw: u32, fh: u32, x: u32, y: u32, size: u32, rgb: (u8, u8, u8)) {
    for yy in y..(y + size).min(fh) {
        for xx in x..(x + size).min(fw) {
            let i = (yy as usize * fw as usize + xx as usize) * 3;
            data[i] = rgb.0;
            data[i + 1] = rgb.1;
            data[i + 2] = rgb.2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_frame_dimensions() {
        let mut source = TestPatternSource::new(CaptureSettings::default());
        let frame = source.next_frame(0).unwrap();
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert_eq!(frame.seq, 0);
    }

    #[test]
    fn test_pattern_contains_blue_and_red() {
        let mut source = TestPatternSource::new(CaptureSettings::default());
        let frame = source.next_frame(0).unwrap();

        let mut saw_blue = false;
        let mut saw_red = false;
        for y in 0..frame.height {
            for x in 0..frame.width {
                let (r, g, b) = frame.pixel(x, y);
                if b > 180 && r < 60 {
                    saw_blue = true;
                }
                if r > 180 && b < 60 && g < 60 {
                    saw_red = true;
                }
            }
        }
        assert!(saw_blue, "expected a blue square in the test pattern");
        assert!(saw_red, "expected a red square in the test pattern");
    }

    #[test]
    fn test_pattern_moves_between_frames() {
        let mut source = TestPatternSource::new(CaptureSettings::default());
        let a = source.next_frame(0).unwrap();
        let b = source.next_frame(10).unwrap();
        assert_ne!(a.pixels, b.pixels);
    }
}
