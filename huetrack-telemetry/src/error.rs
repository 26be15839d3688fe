use huetrack_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Bind error: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Session error: {0}")]
    Session(String),
}

impl From<TelemetryError> for CoreError {
    fn from(err: TelemetryError) -> Self {
        CoreError::Telemetry(err.to_string())
    }
}
