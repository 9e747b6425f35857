use std::path::PathBuf;

use pixelizer_contracts::config::ConfigError;

pub type Result<T> = std::result::Result<T, PixelError>;

/// Every failure a pixelization request can run into.
#[derive(Debug, thiserror::Error)]
pub enum PixelError {
    #[error("no input image was supplied")]
    NoInput,

    #[error("unsupported image extension: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("not a valid image: {0}")]
    Decode(String),

    #[error("invalid image data: {0}")]
    InvalidImageData(String),

    #[error("payload of {len} bytes exceeds the {limit} byte limit")]
    OversizedPayload { len: usize, limit: usize },

    #[error("empty image payload")]
    EmptyPayload,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("generation client unavailable: {0}")]
    ModelUnavailable(String),

    #[error("no output produced")]
    NoOutputProduced,

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("file error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed reading image stream: {0}")]
    Read(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PixelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for PixelError {
    fn from(err: reqwest::Error) -> Self {
        PixelError::Transport(err.to_string())
    }
}
