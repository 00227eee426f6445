use std::path::PathBuf;

use thiserror::Error;

use crate::imageio::ImageFormat;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no encoder registered for {0} images")]
    UnsupportedFormat(ImageFormat),

    #[error("unrecognized image format `{0}`")]
    UnrecognizedFormat(String),

    #[error("frame has {got} bytes but the accumulator expects {expected}")]
    FrameSizeMismatch { expected: usize, got: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("could not parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("malformed PPM: {0}")]
    MalformedPpm(String),

    #[error("render backend failed: {0}")]
    Backend(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}
