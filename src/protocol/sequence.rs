use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

/// Sequence identifier used to match RPC requests and responses.
///
/// A sequence ID is chosen by the sender of a request and echoed back by the
/// responder in the reply's message header. It is carried *in-band* inside
/// protocol message headers and is unique per outstanding request on a
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceId(i32);

impl SequenceId {
    /// Wrap a raw sequence ID value.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Raw integer value of the sequence ID.
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for SequenceId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic sequence ID source for the request side of a connection.
///
/// Hands out distinct IDs for concurrent callers without locking. Wraps on
/// `i32` overflow, which is harmless as long as fewer than 2^32 requests are
/// outstanding at once.
#[derive(Debug, Default)]
pub struct SequenceCounter(AtomicI32);

impl SequenceCounter {
    /// Create a counter starting at zero.
    pub const fn new() -> Self {
        Self(AtomicI32::new(0))
    }

    /// Reserve and return the next sequence ID.
    pub fn next_id(&self) -> SequenceId {
        SequenceId(self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
    }
}
