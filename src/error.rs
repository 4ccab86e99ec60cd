use std::io;

/// All error types for the lightmap-packer pipeline.
#[derive(thiserror::Error, Debug)]
pub enum LightmapError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Layout error: {0}")]
    Layout(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LightmapError>;
