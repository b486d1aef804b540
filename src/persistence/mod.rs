use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("schedule document not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("template catalog not found: {}", .0.display())]
    TemplatesNotFound(PathBuf),
}

impl PersistenceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub mod file;

pub use file::{
    DocumentFormat, load_schedule, parse_schedule, save_schedule, save_sessions_to_csv,
    write_sessions_csv,
};
