use std::path::PathBuf;
use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum MiraError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index not found at {0} (run `mira sync` or `mira rebuild` first)")]
    IndexNotFound(PathBuf),

    #[error("Entry not found in index: {0}")]
    EntryNotFound(String),

    #[error("Trash record not found: {0}")]
    TrashRecordNotFound(String),

    #[error("Remote library error: {0}")]
    Remote(#[from] RemoteError),

    #[error("User input error: {0}")]
    UserInput(String),
}

impl From<dialoguer::Error> for MiraError {
    fn from(err: dialoguer::Error) -> Self {
        MiraError::UserInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MiraError>;
