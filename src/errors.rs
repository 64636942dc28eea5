use thiserror::Error;

/// Errors that can occur while building the corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("file error: {message} (path: {path})")]
    File { message: String, path: String },

    #[error("parse error: {message} (path: {path})")]
    Parse { message: String, path: String },

    /// A comment token's text could not be decoded in the file's encoding.
    #[error("tokenization error: undecodable comment text (path: {path}, line: {line})")]
    Tokenization { path: String, line: u32 },

    /// The line-history query for a file failed (untracked file, bad revision, ...).
    #[error("blame unavailable: {message} (path: {path})")]
    BlameUnavailable { message: String, path: String },

    /// A blame index was queried outside of `1..=len`.
    #[error("blame index out of range: line {index} (index holds {len} lines)")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("repository list error: {message} (line: {line})")]
    RepoList { message: String, line: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

/// Convenience alias for results using `CorpusError`.
pub type Result<T> = std::result::Result<T, CorpusError>;
