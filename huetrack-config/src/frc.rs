//! Loader for the `/boot/frc.json` camera configuration file.

use crate::error::ConfigError;
use huetrack_core::NtMode;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Where the robot image keeps the camera configuration.
pub const DEFAULT_CONFIG_PATH: &str = "/boot/frc.json";

/// One configured camera. The full JSON entry is retained as an opaque blob
/// (`raw_config`) and handed to the capture layer verbatim; the loader only
/// ever interprets `name`, `path` and `stream`.
#[derive(Debug, Clone)]
pub struct CameraDescriptor {
    pub name: String,
    pub path: String,
    pub raw_config: Value,
    pub stream_config: Option<Value>,
}

/// Parsed configuration: team number, networking mode, camera list.
#[derive(Debug, Clone)]
pub struct FrcConfig {
    pub team: u16,
    pub nt_mode: NtMode,
    pub cameras: Vec<CameraDescriptor>,
}

impl FrcConfig {
    /// Read and parse the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let origin = path.as_ref().display().to_string();
        let text = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Unreadable {
            path: origin.clone(),
            source,
        })?;
        Self::parse(&origin, &text)
    }

    /// Parse configuration text. `origin` is only used in error messages.
    pub fn parse(origin: &str, text: &str) -> Result<Self, ConfigError> {
        let top: Value = serde_json::from_str(text)
            .map_err(|e| ConfigError::invalid(origin, format!("invalid JSON: {e}")))?;

        let obj = top
            .as_object()
            .ok_or_else(|| ConfigError::invalid(origin, "must be JSON object"))?;

        let team = obj
            .get("team")
            .and_then(Value::as_u64)
            .and_then(|t| u16::try_from(t).ok())
            .ok_or_else(|| ConfigError::invalid(origin, "could not read team number"))?;

        // ntmode is optional; a value we don't understand is a warning, not
        // a failure.
        let nt_mode = match obj.get("ntmode") {
            None => NtMode::default(),
            Some(value) => match value.as_str().and_then(NtMode::parse) {
                Some(mode) => mode,
                None => {
                    warn!(
                        "config warning in '{}': could not understand ntmode value '{}'",
                        origin, value
                    );
                    NtMode::default()
                }
            },
        };

        let entries = obj
            .get("cameras")
            .and_then(Value::as_array)
            .ok_or_else(|| ConfigError::invalid(origin, "could not read cameras"))?;

        let mut cameras = Vec::with_capacity(entries.len());
        for entry in entries {
            cameras.push(read_camera(origin, entry)?);
        }

        Ok(Self {
            team,
            nt_mode,
            cameras,
        })
    }
}

fn read_camera(origin: &str, entry: &Value) -> Result<CameraDescriptor, ConfigError> {
    let obj = entry
        .as_object()
        .ok_or_else(|| ConfigError::invalid(origin, "camera entry must be a JSON object"))?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ConfigError::invalid(origin, "could not read camera name"))?
        .to_string();

    let path = obj
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ConfigError::invalid(origin, format!("camera '{name}': could not read path"))
        })?
        .to_string();

    Ok(CameraDescriptor {
        name,
        path,
        raw_config: entry.clone(),
        stream_config: obj.get("stream").cloned(),
    })
}
