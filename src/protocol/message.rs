use std::fmt;
use std::sync::Arc;

use crate::protocol::SequenceId;

/// Kind of an RPC message, carried in every message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A request expecting a response.
    Call,
    /// A response to a previous call.
    Reply,
    /// A server-side failure reported in place of a reply.
    Exception,
    /// A request with no response.
    Oneway,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageKind::Call => "call",
            MessageKind::Reply => "reply",
            MessageKind::Exception => "exception",
            MessageKind::Oneway => "oneway",
        };
        f.write_str(s)
    }
}

/// Header of an RPC message.
///
/// The sequence-validating layer inspects only `sequence_id`; `name` and
/// `kind` are opaque to it and pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Method name for routing to handlers.
    pub name: Arc<str>,
    /// Message kind (call, reply, ...).
    pub kind: MessageKind,
    /// Sequence ID used to associate requests with responses.
    pub sequence_id: SequenceId,
}

impl MessageHeader {
    /// Create a message header.
    pub fn new(name: impl Into<Arc<str>>, kind: MessageKind, sequence_id: SequenceId) -> Self {
        Self {
            name: name.into(),
            kind,
            sequence_id,
        }
    }
}

/// Wire type of a struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeId {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Struct,
}

/// Header of a struct field.
///
/// `name` is optional because compact encodings identify fields by `id`
/// alone and readers may not be able to recover the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHeader {
    /// Field name, when the encoding carries one.
    pub name: Option<Arc<str>>,
    /// Wire type of the field value.
    pub type_id: TypeId,
    /// Numeric field ID.
    pub id: i16,
}

impl FieldHeader {
    /// Create a field header with a name.
    pub fn named(name: impl Into<Arc<str>>, type_id: TypeId, id: i16) -> Self {
        Self {
            name: Some(name.into()),
            type_id,
            id,
        }
    }

    /// Create an anonymous field header (compact encodings).
    pub fn anonymous(type_id: TypeId, id: i16) -> Self {
        Self {
            name: None,
            type_id,
            id,
        }
    }
}
