use huetrack_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not open '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config error in '{path}': {detail}")]
    Invalid { path: String, detail: String },
}

impl ConfigError {
    pub(crate) fn invalid(path: &str, detail: impl Into<String>) -> Self {
        ConfigError::Invalid {
            path: path.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}
