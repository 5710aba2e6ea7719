use thiserror::Error;

pub type Result<T> = std::result::Result<T, LocationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("cannot resolve reference `{location}` relative to `{base}`")]
    Unresolved { location: String, base: String },
}
