use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("a load is already in progress on this loader")]
    AlreadyStarted,

    #[error("a previous load on this loader failed")]
    PreviouslyFailed,

    #[error("loading was cancelled")]
    Cancelled,

    #[error("invalid file pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("file pattern `{0}` matched no files")]
    NoMatches(String),

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid endpoint address `{0}`")]
    InvalidAddress(String),

    #[error(transparent)]
    Location(#[from] wsmeta_location::LocationError),

    #[error(transparent)]
    Resolve(#[from] wsmeta_transport::ResolveError),

    #[error(transparent)]
    Document(#[from] wsmeta_model::ModelError),

    #[error("no WSDL or XSD metadata could be loaded ({} errors)", .errors.len())]
    NoMetadata { errors: Vec<LoadError> },

    #[error("configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl LoadError {
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Resolve(wsmeta_transport::ResolveError::Cancelled(_))
        )
    }
}
