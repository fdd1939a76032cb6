//! Sequence-ID validation for message-oriented RPC protocols
//!
//! This library provides a protocol decorator that lets an RPC client
//! verify that each received response carries the sequence ID of the
//! request that solicited it. On a mismatch the decorator either keeps
//! reading until a matching header arrives or fails immediately, depending
//! on its configured [`ValidationMode`].
//!
//! Everything other than the correlated header read is pure delegation to
//! the wrapped [`Protocol`] implementation: wire encoding, framing, and
//! transport I/O all stay behind that trait.
//!

// Import all sub modules once...
mod domain;
mod memory;
mod validator;

mod error;
mod protocol;

mod macros;
pub(crate) use macros::{log_debug, log_error, log_warn};

// Re-export main types
pub use validator::{SequenceValidator, ValidationMode};

pub use error::{Error, Result};

pub use memory::MemoryProtocol;

// --- public re-exports
pub use domain::Protocol;

pub use protocol::{
    //
    FieldHeader,
    MessageHeader,
    MessageKind,
    SequenceCounter,
    SequenceId,
    TypeId,
};
