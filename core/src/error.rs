use std::io;
use std::path::PathBuf;

use crate::DocId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot read {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: expected <title>TAB<description>")]
    MissingTab { line: usize },

    #[error("benchmark line {line}: {reason}")]
    Benchmark { line: usize, reason: String },

    #[error("unknown term '{0}'")]
    UnknownTerm(String),

    #[error("posting list of '{term}' is not strictly ascending at doc {doc_id}")]
    UnsortedPostings { term: String, doc_id: DocId },

    #[error("term '{0}' appears more than once")]
    DuplicateTerm(String),

    #[error("posting of '{term}' refers to doc {doc_id} outside 1..={num_docs}")]
    DocOutOfRange { term: String, doc_id: DocId, num_docs: u32 },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
