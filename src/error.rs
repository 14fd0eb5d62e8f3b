use std::path::PathBuf;

use thiserror::Error;

use crate::table_filter::ColumnKind;

#[derive(Error, Debug)]
pub enum Error {
    #[error("required file `{}` not found", .0.display())]
    MissingFile(PathBuf),
    #[error("no ledger CSV found in `{}`", .0.display())]
    NoLedger(PathBuf),
    #[error("failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CSV, reason: `{0}`")]
    Csv(#[from] csv::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid filter input `{input}` for {kind:?} column")]
    FilterInput { input: String, kind: ColumnKind },
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
}
