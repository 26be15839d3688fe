//! Color-target region extractors.

use huetrack_core::{BoundingBox, DetectionResult, Frame};

/// Offset math assumes this frame width regardless of what the camera
/// actually delivers. Kept fixed to preserve the scoring behavior robot
/// code was tuned against; do not derive it from the live frame.
pub const FRAME_WIDTH_PX: f64 = 640.0;

/// Signed pixel distance between frame center and a region's horizontal
/// center. Positive means the target sits left of center. The region
/// center uses integer pixel math (width/2 truncates).
pub fn offset_from_center(region: &BoundingBox) -> f64 {
    FRAME_WIDTH_PX / 2.0 - f64::from(region.center_x())
}

/// Per-pipeline detection capability: one frame in, zero or more regions
/// out. Region order is extractor-defined.
pub trait RegionExtractor: Send {
    fn process(&mut self, frame: &Frame) -> DetectionResult;
}

/// HSV-threshold ball detector. Pixels inside the hue band (wrapping
/// around 360 when `hue_lo > hue_hi`) with enough saturation and value are
/// grouped into connected regions, largest first.
pub struct ColorBallExtractor {
    hue_lo: f32,
    hue_hi: f32,
    sat_min: f32,
    val_min: f32,
    min_area: u64,
}

impl ColorBallExtractor {
    const SAT_MIN: f32 = 0.45;
    const VAL_MIN: f32 = 0.25;
    const MIN_AREA: u64 = 64;

    pub fn new(hue_lo: f32, hue_hi: f32, min_area: u64) -> Self {
        Self {
            hue_lo,
            hue_hi,
            sat_min: Self::SAT_MIN,
            val_min: Self::VAL_MIN,
            min_area,
        }
    }

    /// Blue ball preset.
    pub fn blue() -> Self {
        Self::new(190.0, 260.0, Self::MIN_AREA)
    }

    /// Red ball preset. The hue band wraps through 0.
    pub fn red() -> Self {
        Self::new(340.0, 20.0, Self::MIN_AREA)
    }

    fn matches(&self, r: u8, g: u8, b: u8) -> bool {
        let (hue, sat, val) = rgb_to_hsv(r, g, b);
        if sat < self.sat_min || val < self.val_min {
            return false;
        }
        if self.hue_lo <= self.hue_hi {
            hue >= self.hue_lo && hue <= self.hue_hi
        } else {
            hue >= self.hue_lo || hue <= self.hue_hi
        }
    }
}

impl RegionExtractor for ColorBallExtractor {
    fn process(&mut self, frame: &Frame) -> DetectionResult {
        let w = frame.width as usize;
        let h = frame.height as usize;

        let mut mask = vec![false; w * h];
        for y in 0..h {
            for x in 0..w {
                let (r, g, b) = frame.pixel(x as u32, y as u32);
                mask[y * w + x] = self.matches(r, g, b);
            }
        }

        let mut regions = collect_regions(&mask, w, h);
        regions.retain(|region| region.area() >= self.min_area);
        regions.sort_by_key(|region| std::cmp::Reverse(region.area()));
        DetectionResult { regions }
    }
}

/// Hue in degrees [0, 360), saturation and value in [0, 1].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let sat = if max == 0.0 { 0.0 } else { delta / max };

    (hue, sat, max)
}

/// 4-connected component bounding boxes over a binary mask.
fn collect_regions(mask: &[bool], w: usize, h: usize) -> Vec<BoundingBox> {
    let mut visited = vec![false; mask.len()];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);

        let (mut min_x, mut max_x) = (start % w, start % w);
        let (mut min_y, mut max_y) = (start / w, start / w);

        while let Some(idx) = stack.pop() {
            let x = idx % w;
            let y = idx / w;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            if x > 0 && mask[idx - 1] && !visited[idx - 1] {
                visited[idx - 1] = true;
                stack.push(idx - 1);
            }
            if x + 1 < w && mask[idx + 1] && !visited[idx + 1] {
                visited[idx + 1] = true;
                stack.push(idx + 1);
            }
            if y > 0 && mask[idx - w] && !visited[idx - w] {
                visited[idx - w] = true;
                stack.push(idx - w);
            }
            if y + 1 < h && mask[idx + w] && !visited[idx + w] {
                visited[idx + w] = true;
                stack.push(idx + w);
            }
        }

        regions.push(BoundingBox {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        });
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: (u8, u8, u8) = (30, 30, 30);
    const BLUE: (u8, u8, u8) = (0, 80, 220);
    const RED: (u8, u8, u8) = (210, 40, 40);

    fn frame_with_rects(w: u32, h: u32, rects: &[(u32, u32, u32, u32, (u8, u8, u8))]) -> Frame {
        let mut data = Vec::with_capacity(w as usize * h as usize * 3);
        for _ in 0..w * h {
            data.extend_from_slice(&[BACKGROUND.0, BACKGROUND.1, BACKGROUND.2]);
        }
        for &(x, y, rw, rh, rgb) in rects {
            for yy in y..(y + rh).min(h) {
                for xx in x..(x + rw).min(w) {
                    let i = (yy as usize * w as usize + xx as usize) * 3;
                    data[i] = rgb.0;
                    data[i + 1] = rgb.1;
                    data[i + 2] = rgb.2;
                }
            }
        }
        Frame::rgb(w, h, data, 0).unwrap()
    }

    #[test]
    fn test_offset_from_center_left_of_center() {
        let region = BoundingBox {
            x: 100,
            y: 0,
            width: 40,
            height: 40,
        };
        assert_eq!(offset_from_center(&region), 200.0);
    }

    #[test]
    fn test_offset_from_center_right_of_center_is_negative() {
        let region = BoundingBox {
            x: 400,
            y: 0,
            width: 40,
            height: 40,
        };
        assert_eq!(offset_from_center(&region), -100.0);
    }

    #[test]
    fn test_offset_uses_integer_center() {
        // width 41 truncates to the same center as width 40
        let region = BoundingBox {
            x: 100,
            y: 0,
            width: 41,
            height: 40,
        };
        assert_eq!(offset_from_center(&region), 200.0);
    }

    #[test]
    fn test_rgb_to_hsv_primaries() {
        let (h, s, v) = rgb_to_hsv(255, 0, 0);
        assert_eq!(h, 0.0);
        assert_eq!(s, 1.0);
        assert_eq!(v, 1.0);

        let (h, _, _) = rgb_to_hsv(0, 255, 0);
        assert!((h - 120.0).abs() < 0.5);

        let (h, _, _) = rgb_to_hsv(0, 0, 255);
        assert!((h - 240.0).abs() < 0.5);
    }

    #[test]
    fn test_rgb_to_hsv_gray_has_no_saturation() {
        let (_, s, v) = rgb_to_hsv(128, 128, 128);
        assert_eq!(s, 0.0);
        assert!((v - 0.502).abs() < 0.01);
    }

    #[test]
    fn test_blue_extractor_finds_blue_region() {
        let frame = frame_with_rects(640, 480, &[(100, 50, 40, 40, BLUE)]);
        let result = ColorBallExtractor::blue().process(&frame);
        assert_eq!(result.regions.len(), 1);
        let region = result.regions[0];
        assert_eq!(region.x, 100);
        assert_eq!(region.y, 50);
        assert_eq!(region.width, 40);
        assert_eq!(region.height, 40);
    }

    #[test]
    fn test_blue_extractor_ignores_red_region() {
        let frame = frame_with_rects(640, 480, &[(100, 50, 40, 40, RED)]);
        let result = ColorBallExtractor::blue().process(&frame);
        assert!(result.is_empty());
    }

    #[test]
    fn test_red_extractor_finds_red_region() {
        let frame = frame_with_rects(640, 480, &[(300, 200, 30, 30, RED)]);
        let result = ColorBallExtractor::red().process(&frame);
        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.regions[0].x, 300);
    }

    #[test]
    fn test_extractor_orders_largest_first() {
        let frame = frame_with_rects(
            640,
            480,
            &[(500, 100, 10, 10, BLUE), (100, 50, 40, 40, BLUE)],
        );
        let result = ColorBallExtractor::blue().process(&frame);
        assert_eq!(result.regions.len(), 2);
        assert_eq!(result.regions[0].width, 40);
        assert_eq!(result.regions[1].width, 10);
    }

    #[test]
    fn test_extractor_filters_specks() {
        let frame = frame_with_rects(640, 480, &[(100, 50, 3, 3, BLUE)]);
        let result = ColorBallExtractor::blue().process(&frame);
        assert!(result.is_empty());
    }

    #[test]
    fn test_extractor_empty_frame() {
        let frame = frame_with_rects(640, 480, &[]);
        assert!(ColorBallExtractor::blue().process(&frame).is_empty());
        assert!(ColorBallExtractor::red().process(&frame).is_empty());
    }
}
