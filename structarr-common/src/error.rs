use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("insufficient memory({0})")]
    InsufficientMemory(usize),
    #[error("index out of bound: {0}")]
    IndexOutOfBound(usize),
    #[error("Invalid format")]
    InvalidFormat,
    #[error("buffer already transferred")]
    Transferred,
}
