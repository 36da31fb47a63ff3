use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid anchor: {0}")]
    Anchor(#[from] AnchorError),

    #[error("Anchor hash collision between '{first}' and '{second}'")]
    HashCollision { first: String, second: String },
}

/// Reasons a URL fragment fails to decode into an anchor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    #[error("fragment has no file hash")]
    MissingHash,

    #[error("file hash '{0}' is not {width} lowercase hex digits", width = crate::anchor::HASH_WIDTH)]
    BadHash(String),

    #[error("fragment has no line marker")]
    MissingLine,

    #[error("line '{0}' is not a number")]
    BadLine(String),

    #[error("line numbers start at 1")]
    ZeroLine,
}

pub type Result<T> = std::result::Result<T, CovError>;
