/// Protocol types for RPC message correlation
///
/// This module defines the message header and field marker types exchanged
/// through the [`Protocol`](crate::Protocol) trait, and the sequence ID
/// used to match responses to requests.
mod message;
mod sequence;

pub use message::{FieldHeader, MessageHeader, MessageKind, TypeId};
pub use sequence::{SequenceCounter, SequenceId};
