use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("unknown transformation: {0}")]
    UnknownTransformation(String),
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;
