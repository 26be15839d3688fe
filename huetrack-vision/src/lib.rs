//! Color-target detection pipelines and the shared offset cell.
//!
//! Two pipelines (blue and red) run concurrently against the same camera.
//! Each one waits for a frame, runs its extractor, and hands the result to
//! a callback that updates the shared offset and publishes to telemetry.
//! Neither pipeline ever blocks the other: the only shared datum is one
//! mutex-guarded `f64`, held just long enough to store a value.

pub mod extractor;
pub mod pipeline;
pub mod state;

pub use extractor::{offset_from_center, ColorBallExtractor, RegionExtractor, FRAME_WIDTH_PX};
pub use pipeline::{offset_publisher, VisionPipeline};
pub use state::SharedOffset;
