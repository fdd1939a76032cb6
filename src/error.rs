use thiserror::Error;

use crate::SequenceId;

/// Errors that can occur on the protocol read/write path.
#[derive(Error, Debug)]
pub enum Error {
    /// Received sequence ID does not match the one sent with the request.
    ///
    /// Only raised in [`ValidationMode::ThrowOnMismatch`](crate::ValidationMode);
    /// in `KeepReading` mode the mismatch is absorbed and the read continues.
    #[error("received sequence id {actual} and sent one {expected} do not match")]
    SequenceMismatch {
        /// Sequence ID of the request awaiting a response.
        expected: SequenceId,
        /// Sequence ID found in the received message header.
        actual: SequenceId,
    },

    /// The read was cancelled via its cancellation token.
    #[error("read cancelled")]
    Cancelled,

    /// The inner protocol failed to decode incoming data.
    #[error("decode error: {0}")]
    Decode(String),

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer endpoint is gone and no further messages will arrive.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;
