//! Payload encoding for stored sessions.

use sessiondb_core::SessionData;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to turn a session into a payload, or back.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to encode session: {0}")]
    Encode(#[source] BoxError),

    #[error("failed to decode session payload: {0}")]
    Decode(#[source] BoxError),
}

impl CodecError {
    pub fn encode(err: impl Into<BoxError>) -> Self {
        CodecError::Encode(err.into())
    }

    pub fn decode(err: impl Into<BoxError>) -> Self {
        CodecError::Decode(err.into())
    }
}

/// Encode/decode pair used by the store for the `payload` column.
pub trait SessionCodec: Send + Sync + 'static {
    fn encode(&self, session: &SessionData) -> Result<String, CodecError>;

    fn decode(&self, payload: &str) -> Result<SessionData, CodecError>;
}

/// JSON payloads, the format session middleware usually writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl SessionCodec for JsonCodec {
    fn encode(&self, session: &SessionData) -> Result<String, CodecError> {
        serde_json::to_string(session).map_err(CodecError::encode)
    }

    fn decode(&self, payload: &str) -> Result<SessionData, CodecError> {
        serde_json::from_str(payload).map_err(CodecError::decode)
    }
}
