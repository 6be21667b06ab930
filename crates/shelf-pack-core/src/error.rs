use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShelfPackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid bin id: {0:?}")]
    InvalidId(String),
    #[error("Bin does not fit in the atlas")]
    OutOfSpace,
}

pub type Result<T> = std::result::Result<T, ShelfPackError>;
