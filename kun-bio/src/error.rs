use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("domain error: {message}")]
    DomainError { message: String },

    #[error("io error: {message}")]
    IoError { message: String },

    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    #[error("unsupported: {message}")]
    Unsupported { message: String },

    #[error("invalid base: {found:?}")]
    InvalidBase { found: char },
}

impl From<kmer_core::Error> for Error {
    fn from(e: kmer_core::Error) -> Self {
        match e {
            kmer_core::Error::InvalidArgument { message } => Error::InvalidArgument { message },
            kmer_core::Error::DomainError { message } => Error::DomainError { message },
            kmer_core::Error::Io(io) => Error::StdIo(io),
            kmer_core::Error::Unsupported { message } => Error::Unsupported { message },
            kmer_core::Error::InvalidBase { found } => Error::InvalidBase { found },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
