use thiserror::Error;

/// Error kinds surfaced at the bit-substrate / k-mer sketching API boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("domain error: {message}")]
    DomainError { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported: {message}")]
    Unsupported { message: String },

    #[error("invalid base: {found:?}")]
    InvalidBase { found: char },
}

pub type Result<T> = std::result::Result<T, Error>;
