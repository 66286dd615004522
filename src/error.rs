use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
pub enum TreeIndexError {
    #[error("Dimension mismatch: index has {expected} dimensions, got {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to allocate storage for {requested} nodes.")]
    Allocation { requested: usize },

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Task was cancelled before it completed.")]
    TaskCancelled,
}

pub type Result<T> = std::result::Result<T, TreeIndexError>;
