use thiserror::Error;

/// Crate-wide failure modes. These never cross the wire directly — player-
/// facing rejections are reported through the typed `*_failed` message
/// variants in [`crate::net::message`] instead.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("malformed client frame")]
    InvalidFrame,

    #[error("deserialization failed")]
    DeserializationFailure,

    #[error("failed to bind listener on `{0}`")]
    ListenFailure(String),

    #[error("connection error: {0}")]
    Connection(String),
}

pub type ArenaResult<T> = Result<T, ArenaError>;
