use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("XML error in {location}: {message}")]
    Xml { location: String, message: String },

    #[error("unsupported document at {location}: root element {{{namespace}}}{name}")]
    UnsupportedDocument {
        location: String,
        namespace: String,
        name: String,
    },

    #[error("document at {location} is too large: {size} bytes (max {max} bytes)")]
    TooLarge {
        location: String,
        size: usize,
        max: usize,
    },

    #[error("section location already set to {0}")]
    LocationAlreadySet(String),
}
