use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("open output file: {0}")]
    Open(#[source] std::io::Error),
    #[error("failed to log command info: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
