//! Domain layer public interface.
//!
//! This module defines the domain-level protocol abstraction, independent
//! of encodings, framing, or transport concerns.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod protocol;

// --- Protocol domain re-exports ---

pub use protocol::Protocol;
