use huetrack_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Open error: {0}")]
    Open(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CameraError> for CoreError {
    fn from(err: CameraError) -> Self {
        CoreError::Camera(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_error_display() {
        let err = CameraError::Open("no such device".to_string());
        assert!(err.to_string().contains("Open error"));
    }

    #[test]
    fn test_camera_error_to_core_error() {
        let err = CameraError::Capture("timed out".to_string());
        let core: CoreError = err.into();
        match core {
            CoreError::Camera(msg) => assert!(msg.contains("timed out")),
            _ => panic!("Expected Camera error"),
        }
    }
}
