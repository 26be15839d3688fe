//! The detection loop and the offset-publishing callback.

use crate::extractor::{offset_from_center, RegionExtractor};
use crate::state::SharedOffset;
use huetrack_camera::FrameRx;
use huetrack_core::DetectionResult;
use huetrack_telemetry::TelemetryEntry;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct VisionPipeline;

impl VisionPipeline {
    /// Run a detection loop forever: wait for a frame, extract, hand the
    /// result to the callback. The task has no termination contract beyond
    /// process exit; it only ends early if the frame source goes away.
    pub fn spawn<E, F>(mut frames: FrameRx, mut extractor: E, mut on_result: F) -> JoinHandle<()>
    where
        E: RegionExtractor + 'static,
        F: FnMut(&DetectionResult) + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                let result = extractor.process(&frame);
                on_result(&result);
            }
            debug!("frame source closed, detection pipeline ending");
        })
    }
}

/// The per-color result callback: a non-empty result stores the first
/// region's offset in the shared cell and publishes the same value to this
/// color's telemetry entry; an empty result publishes 0 and leaves the
/// shared cell alone.
pub fn offset_publisher(
    entry: TelemetryEntry,
    shared: SharedOffset,
) -> impl FnMut(&DetectionResult) + Send {
    move |result: &DetectionResult| {
        if let Some(region) = result.first() {
            let offset = offset_from_center(region);
            shared.store(offset);
            entry.set_number(offset);
        } else {
            entry.set_number(0.0);
        }
    }
}
