/// Failure at the runner boundary.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The runner (or the program it drives) could not be reached or spawned.
    #[error("runner unavailable: {0}")]
    Unavailable(String),
    /// The runner refused the request.
    #[error("runner rejected request: {0}")]
    Rejected(String),
    /// Nothing is running in the targeted phase.
    #[error("{0} is not running")]
    NotRunning(&'static str),
    #[error("runner I/O: {0}")]
    Io(#[from] std::io::Error),
}
