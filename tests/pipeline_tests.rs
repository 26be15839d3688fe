use huetrack_camera::{Camera, CameraRegistry};
use huetrack_config::CameraDescriptor;
use huetrack_core::{BoundingBox, DetectionResult, Frame};
use huetrack_telemetry::TelemetryInstance;
use huetrack_vision::{offset_publisher, RegionExtractor, SharedOffset, VisionPipeline};
use serde_json::json;
use std::time::Duration;

struct FixedExtractor {
    regions: Vec<BoundingBox>,
}

impl RegionExtractor for FixedExtractor {
    fn process(&mut self, _frame: &Frame) -> DetectionResult {
        DetectionResult {
            regions: self.regions.clone(),
        }
    }
}

fn test_camera() -> Camera {
    Camera::open(&CameraDescriptor {
        name: "test".to_string(),
        path: "/dev/video0".to_string(),
        raw_config: json!({"fps": 120}),
        stream_config: None,
    })
    .unwrap()
}

async fn wait_for(instance: &TelemetryInstance, path: &str, expected: f64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while instance.get_number(path) != Some(expected) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "{path} never reached {expected}, last was {:?}",
            instance.get_number(path)
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_detection_offset_published_and_shared() {
    let camera = test_camera();
    let instance = TelemetryInstance::new();
    let shared = SharedOffset::new();

    VisionPipeline::spawn(
        camera.subscribe(),
        FixedExtractor {
            regions: vec![BoundingBox {
                x: 100,
                y: 0,
                width: 40,
                height: 40,
            }],
        },
        offset_publisher(instance.table("Vision").entry("BLUE"), shared.clone()),
    );

    wait_for(&instance, "Vision/BLUE", 200.0).await;
    assert_eq!(shared.load(), 200.0);
}

#[tokio::test]
async fn test_empty_detection_publishes_zero_and_keeps_shared_state() {
    let camera = test_camera();
    let instance = TelemetryInstance::new();
    let shared = SharedOffset::new();
    shared.store(123.0);

    VisionPipeline::spawn(
        camera.subscribe(),
        FixedExtractor { regions: vec![] },
        offset_publisher(instance.table("Vision").entry("RED"), shared.clone()),
    );

    wait_for(&instance, "Vision/RED", 0.0).await;
    assert_eq!(shared.load(), 123.0);
}

#[tokio::test]
async fn test_both_colors_publish_to_their_own_entries() {
    let camera = test_camera();
    let instance = TelemetryInstance::new();
    let shared = SharedOffset::new();
    let vision = instance.table("Vision");

    VisionPipeline::spawn(
        camera.subscribe(),
        FixedExtractor {
            regions: vec![BoundingBox {
                x: 100,
                y: 0,
                width: 40,
                height: 40,
            }],
        },
        offset_publisher(vision.entry("BLUE"), shared.clone()),
    );
    VisionPipeline::spawn(
        camera.subscribe(),
        FixedExtractor {
            regions: vec![BoundingBox {
                x: 400,
                y: 0,
                width: 40,
                height: 40,
            }],
        },
        offset_publisher(vision.entry("RED"), shared.clone()),
    );

    wait_for(&instance, "Vision/BLUE", 200.0).await;
    wait_for(&instance, "Vision/RED", -100.0).await;
}

#[tokio::test]
async fn test_zero_camera_startup_starts_no_pipelines() {
    let cameras = CameraRegistry::open_all(&[]);
    assert!(cameras.is_empty());

    // mirror the daemon's guard: no first camera, no pipelines
    let instance = TelemetryInstance::new();
    if let Some(_primary) = cameras.first() {
        panic!("no pipelines should start without cameras");
    }

    // the process still reaches its idle phase with nothing published
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(instance.get_number("Vision/BLUE"), None);
    assert_eq!(instance.get_number("Vision/RED"), None);
}
