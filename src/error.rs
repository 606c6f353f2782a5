//! Crate-wide error type

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::canonical::SourceKind;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Transformation of {kind} source data failed ({status})")]
    Transform { kind: SourceKind, status: ExitStatus },

    #[error("Malformed transformer output: {0}")]
    MalformedRecords(String),

    #[error("Column '{column}' not found in {}", file.display())]
    MissingColumn { file: PathBuf, column: String },

    #[error("Invalid value '{value}' for column '{column}' at row {row} of {}", file.display())]
    InvalidValue {
        file: PathBuf,
        column: String,
        row: usize,
        value: String,
    },

    #[error("Key references location {loc_id} but exposure has {rows} rows")]
    UnknownLocation { loc_id: u32, rows: usize },

    #[error("No accounts rows for account '{account}'")]
    MissingAccount { account: String },

    #[error("{} of the file writes failed: {}", .0.len(), describe_failures(.0))]
    WriteTasks(Vec<(String, Error)>),

    #[error("Failed to run {stage} ({status})")]
    Execution { stage: String, status: ExitStatus },
}

fn describe_failures(failures: &[(String, Error)]) -> String {
    failures
        .iter()
        .map(|(key, err)| format!("{key}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
