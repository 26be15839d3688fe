use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One captured raster image, RGB8, row-major.
///
/// The pixel buffer is shared, so cloning a frame for fan-out never copies
/// pixel data.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
    /// Monotonic capture sequence number, per camera.
    pub seq: u64,
}

impl Frame {
    /// Build an RGB8 frame, checking that the buffer matches the dimensions.
    pub fn rgb(width: u32, height: u32, pixels: impl Into<Bytes>, seq: u64) -> Result<Self> {
        let pixels = pixels.into();
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(Error::Processing(format!(
                "frame buffer is {} bytes, expected {} for {}x{} RGB8",
                pixels.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
            seq,
        })
    }

    /// RGB triple at (x, y). Caller must stay in bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height);
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        (self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2])
    }
}

/// Axis-aligned pixel rectangle produced by a region extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Horizontal center, integer pixel math (width/2 truncates).
    #[inline]
    pub fn center_x(&self) -> u32 {
        self.x + self.width / 2
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Output of one extractor pass over one frame. Region order is
/// extractor-defined; consumers that want a single target take the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionResult {
    pub regions: Vec<BoundingBox>,
}

impl DetectionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn first(&self) -> Option<&BoundingBox> {
        self.regions.first()
    }
}

/// Telemetry networking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NtMode {
    #[default]
    Client,
    Server,
}

impl NtMode {
    /// Case-insensitive parse of the configuration value. Unrecognized
    /// strings are None so the caller can warn and fall back.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("client") {
            Some(NtMode::Client)
        } else if s.eq_ignore_ascii_case("server") {
            Some(NtMode::Server)
        } else {
            None
        }
    }
}

impl fmt::Display for NtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NtMode::Client => write!(f, "client"),
            NtMode::Server => write!(f, "server"),
        }
    }
}
