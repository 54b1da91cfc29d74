use std::path::PathBuf;

/// Central error type for radiod.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    #[error("config error: {0}")]
    Config(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },

    #[error("invalid display line {0} (expected 0-5)")]
    InvalidLine(usize),

    #[error("render error: {0}")]
    Render(String),

    #[error("font error: {path}: {message}")]
    Font { path: PathBuf, message: String },

    #[error("image error: {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("mixer error: {0}")]
    Mixer(String),

    #[error("status error: {0}")]
    Status(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("shell command failed: {command}: {message}")]
    Shell { command: String, message: String },

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("{source_name} input error: {message}")]
    Input {
        source_name: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RadioError>;
