// src/memory.rs

//! In-memory protocol implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `Protocol` trait. It is intended primarily for testing, local execution,
//! and as a reference for protocol semantics.
//!
//! ## Reference Semantics
//!
//! The in-memory protocol defines the **reference behavior** for the
//! protocol layer. Other protocol implementations are expected to
//! approximate this behavior as closely as their encodings and transports
//! allow and to document any unavoidable deviations.
//!
//! In particular, the in-memory protocol establishes the following
//! expectations:
//!
//! - Each written unit (header, marker, value) is delivered to the peer as
//!   a discrete item, in write order: the stream is framed, so discarding a
//!   message does not corrupt parsing of the next.
//! - Reading a unit as the wrong type fails with `Error::Decode`.
//! - A read against a closed peer fails with `Error::ConnectionClosed`.
//! - A header read against an already-cancelled token fails with
//!   `Error::Cancelled` even when data is queued.
//!
//! ## Non-Goals
//!
//! This protocol does not attempt to emulate the failure modes, buffering,
//! or backpressure of any wire encoding or broker. It exists to provide a
//! clear, deterministic baseline against which decorator behavior can be
//! validated.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[allow(unused_imports)]
use crate::{
    // ---
    log_debug,
    log_error,
    log_warn,
    Error,
    FieldHeader,
    MessageHeader,
    Protocol,
    Result,
};

/// One unit on the in-memory wire.
#[derive(Debug, Clone)]
enum Slot {
    MessageHeader(MessageHeader),
    MessageEnd,
    StructBegin(Arc<str>),
    StructEnd,
    FieldBegin(FieldHeader),
    FieldEnd,
    FieldStop,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Binary(Bytes),
}

impl Slot {
    fn kind(&self) -> &'static str {
        match self {
            Slot::MessageHeader(_) => "message header",
            Slot::MessageEnd => "message end",
            Slot::StructBegin(_) => "struct begin",
            Slot::StructEnd => "struct end",
            Slot::FieldBegin(_) => "field begin",
            Slot::FieldEnd => "field end",
            Slot::FieldStop => "field stop",
            Slot::Bool(_) => "bool",
            Slot::I8(_) => "i8",
            Slot::I16(_) => "i16",
            Slot::I32(_) => "i32",
            Slot::I64(_) => "i64",
            Slot::Double(_) => "double",
            Slot::String(_) => "string",
            Slot::Binary(_) => "binary",
        }
    }
}

fn decode_mismatch(expected: &str, found: &Slot) -> Error {
    Error::Decode(format!("expected {expected}, found {}", found.kind()))
}

/// In-process protocol endpoint.
///
/// Created in connected pairs by [`MemoryProtocol::pair`]: every unit
/// written on one endpoint becomes the next unit read on the other, exactly
/// as two nodes connected by a framed duplex transport would see it.
///
/// Channels are unbounded, so writes never block and a slow reader simply
/// accumulates queued units.
pub struct MemoryProtocol {
    // ---
    tx: mpsc::UnboundedSender<Slot>,
    rx: mpsc::UnboundedReceiver<Slot>,

    /// Number of message headers consumed on this endpoint.
    headers_read: u64,
}

impl MemoryProtocol {
    /// Create two connected endpoints.
    ///
    /// Writes on the first are reads on the second and vice versa.
    /// Dropping either endpoint closes the connection; the survivor's
    /// reads fail with `Error::ConnectionClosed` once its queue drains.
    pub fn pair() -> (MemoryProtocol, MemoryProtocol) {
        // ---
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        let a = MemoryProtocol {
            tx: a_tx,
            rx: b_rx,
            headers_read: 0,
        };
        let b = MemoryProtocol {
            tx: b_tx,
            rx: a_rx,
            headers_read: 0,
        };

        (a, b)
    }

    /// Number of message headers this endpoint has consumed.
    ///
    /// # ⚠️  Testing Only
    ///
    /// **This counter is exposed for `seqguard`'s own test suite**, where it
    /// verifies how many delegated reads a decorator performed. It may
    /// change or be removed without a deprecation cycle.
    pub fn headers_read(&self) -> u64 {
        self.headers_read
    }

    fn send(&self, slot: Slot) -> Result<()> {
        // ---
        self.tx.send(slot).map_err(|_| {
            log_error!("memory protocol: peer closed, dropping write");
            Error::ConnectionClosed
        })
    }

    async fn next_slot(&mut self) -> Result<Slot> {
        // ---
        match self.rx.recv().await {
            Some(slot) => Ok(slot),
            None => {
                log_debug!("memory protocol: peer closed, read queue drained");
                Err(Error::ConnectionClosed)
            }
        }
    }
}

#[async_trait::async_trait]
impl Protocol for MemoryProtocol {
    async fn read_message_header(&mut self, cancel: &CancellationToken) -> Result<MessageHeader> {
        // `biased` makes an already-cancelled token win over queued data,
        // so a pre-cancelled read is deterministically Cancelled.
        let slot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            slot = self.rx.recv() => slot,
        };

        match slot {
            Some(Slot::MessageHeader(header)) => {
                self.headers_read += 1;
                Ok(header)
            }
            Some(other) => {
                log_warn!(
                    "memory protocol: out-of-order unit on header read ({})",
                    other.kind()
                );
                Err(decode_mismatch("message header", &other))
            }
            None => {
                log_debug!("memory protocol: peer closed, read queue drained");
                Err(Error::ConnectionClosed)
            }
        }
    }

    async fn read_message_end(&mut self) -> Result<()> {
        match self.next_slot().await? {
            Slot::MessageEnd => Ok(()),
            other => Err(decode_mismatch("message end", &other)),
        }
    }

    async fn read_struct_begin(&mut self) -> Result<()> {
        match self.next_slot().await? {
            Slot::StructBegin(_) => Ok(()),
            other => Err(decode_mismatch("struct begin", &other)),
        }
    }

    async fn read_struct_end(&mut self) -> Result<()> {
        match self.next_slot().await? {
            Slot::StructEnd => Ok(()),
            other => Err(decode_mismatch("struct end", &other)),
        }
    }

    async fn read_field_begin(&mut self) -> Result<Option<FieldHeader>> {
        match self.next_slot().await? {
            Slot::FieldBegin(field) => Ok(Some(field)),
            Slot::FieldStop => Ok(None),
            other => Err(decode_mismatch("field begin or stop", &other)),
        }
    }

    async fn read_field_end(&mut self) -> Result<()> {
        match self.next_slot().await? {
            Slot::FieldEnd => Ok(()),
            other => Err(decode_mismatch("field end", &other)),
        }
    }

    async fn read_bool(&mut self) -> Result<bool> {
        match self.next_slot().await? {
            Slot::Bool(value) => Ok(value),
            other => Err(decode_mismatch("bool", &other)),
        }
    }

    async fn read_i8(&mut self) -> Result<i8> {
        match self.next_slot().await? {
            Slot::I8(value) => Ok(value),
            other => Err(decode_mismatch("i8", &other)),
        }
    }

    async fn read_i16(&mut self) -> Result<i16> {
        match self.next_slot().await? {
            Slot::I16(value) => Ok(value),
            other => Err(decode_mismatch("i16", &other)),
        }
    }

    async fn read_i32(&mut self) -> Result<i32> {
        match self.next_slot().await? {
            Slot::I32(value) => Ok(value),
            other => Err(decode_mismatch("i32", &other)),
        }
    }

    async fn read_i64(&mut self) -> Result<i64> {
        match self.next_slot().await? {
            Slot::I64(value) => Ok(value),
            other => Err(decode_mismatch("i64", &other)),
        }
    }

    async fn read_double(&mut self) -> Result<f64> {
        match self.next_slot().await? {
            Slot::Double(value) => Ok(value),
            other => Err(decode_mismatch("double", &other)),
        }
    }

    async fn read_string(&mut self) -> Result<String> {
        match self.next_slot().await? {
            Slot::String(value) => Ok(value),
            other => Err(decode_mismatch("string", &other)),
        }
    }

    async fn read_binary(&mut self) -> Result<Bytes> {
        match self.next_slot().await? {
            Slot::Binary(value) => Ok(value),
            other => Err(decode_mismatch("binary", &other)),
        }
    }

    async fn write_message_header(&mut self, header: &MessageHeader) -> Result<()> {
        self.send(Slot::MessageHeader(header.clone()))
    }

    async fn write_message_end(&mut self) -> Result<()> {
        self.send(Slot::MessageEnd)
    }

    async fn write_struct_begin(&mut self, name: &str) -> Result<()> {
        self.send(Slot::StructBegin(Arc::from(name)))
    }

    async fn write_struct_end(&mut self) -> Result<()> {
        self.send(Slot::StructEnd)
    }

    async fn write_field_begin(&mut self, field: &FieldHeader) -> Result<()> {
        self.send(Slot::FieldBegin(field.clone()))
    }

    async fn write_field_end(&mut self) -> Result<()> {
        self.send(Slot::FieldEnd)
    }

    async fn write_field_stop(&mut self) -> Result<()> {
        self.send(Slot::FieldStop)
    }

    async fn write_bool(&mut self, value: bool) -> Result<()> {
        self.send(Slot::Bool(value))
    }

    async fn write_i8(&mut self, value: i8) -> Result<()> {
        self.send(Slot::I8(value))
    }

    async fn write_i16(&mut self, value: i16) -> Result<()> {
        self.send(Slot::I16(value))
    }

    async fn write_i32(&mut self, value: i32) -> Result<()> {
        self.send(Slot::I32(value))
    }

    async fn write_i64(&mut self, value: i64) -> Result<()> {
        self.send(Slot::I64(value))
    }

    async fn write_double(&mut self, value: f64) -> Result<()> {
        self.send(Slot::Double(value))
    }

    async fn write_string(&mut self, value: &str) -> Result<()> {
        self.send(Slot::String(value.to_string()))
    }

    async fn write_binary(&mut self, value: Bytes) -> Result<()> {
        self.send(Slot::Binary(value))
    }
}
