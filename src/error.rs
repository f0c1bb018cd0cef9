use crate::nbt::DecodeError;

/// All errors that can occur while capturing a position.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Save file has neither '{primary}' nor '{fallback}'")]
    FieldMissing { primary: String, fallback: String },

    #[error("Field '{field}' cannot be read as x, y, z numbers")]
    FieldType { field: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
