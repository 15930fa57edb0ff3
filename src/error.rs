use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("invalid window configuration for hub {hub}: {detail}")]
    Config { hub: String, detail: String },

    #[error("reference file not readable: {path:?}")]
    MissingReference {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed reference file {path:?}: {source}")]
    MalformedReference {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("history store: {0}")]
    Store(#[from] surrealdb::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
