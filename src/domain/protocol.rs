// src/domain/protocol.rs

//! Protocol domain abstraction.
//!
//! This module defines the capability interface that concrete protocol
//! implementations (binary, compact, in-memory, ...) must satisfy. It
//! intentionally avoids any reference to wire encodings, framing, or
//! transport I/O; those live behind the implementations.
//!
//! The protocol layer is responsible only for reading and writing message
//! headers, struct/field markers, and primitive values. Higher-level
//! semantics such as sequence validation live in decorators layered on top
//! (see [`SequenceValidator`](crate::SequenceValidator)).

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{FieldHeader, MessageHeader, Result};

/// Message-oriented RPC protocol.
///
/// A `Protocol` reads and writes the units of an RPC conversation: message
/// headers, struct and field markers, and primitive values. It defines the
/// minimal contract required by decorating layers without committing to any
/// specific encoding or transport.
///
/// Implementations must ensure that:
/// - `read_message_header` observes its cancellation token: once the token
///   is cancelled the read fails with [`Error::Cancelled`](crate::Error)
///   rather than blocking or returning data.
/// - Errors are terminal for the operation that raised them; no operation
///   retries internally.
/// - No assumptions are made about callers consuming a message's payload
///   before the next header is read. Implementations intended for use under
///   a [`SequenceValidator`](crate::SequenceValidator) in `KeepReading`
///   mode should sit on a framed transport, where each message is a
///   discrete, independently skippable unit.
///
/// The in-memory protocol serves as the reference implementation of these
/// semantics.
///
/// # Notes
///
/// This trait uses `async_trait`; the expanded documentation may show
/// explicit lifetimes and a boxed `Future`. This is an implementation
/// detail — consumers should treat methods as normal `async fn`s.
#[async_trait::async_trait]
pub trait Protocol: Send {
    // --- read path ---

    /// Read the next message header.
    ///
    /// May suspend until a message arrives. Must fail with
    /// [`Error::Cancelled`](crate::Error) once `cancel` is cancelled.
    async fn read_message_header(&mut self, cancel: &CancellationToken) -> Result<MessageHeader>;

    /// Read the end-of-message marker.
    async fn read_message_end(&mut self) -> Result<()>;

    /// Read the beginning-of-struct marker.
    async fn read_struct_begin(&mut self) -> Result<()>;

    /// Read the end-of-struct marker.
    async fn read_struct_end(&mut self) -> Result<()>;

    /// Read the next field header, or `None` at the stop marker.
    async fn read_field_begin(&mut self) -> Result<Option<FieldHeader>>;

    /// Read the end-of-field marker.
    async fn read_field_end(&mut self) -> Result<()>;

    /// Read a boolean value.
    async fn read_bool(&mut self) -> Result<bool>;

    /// Read an 8-bit signed integer.
    async fn read_i8(&mut self) -> Result<i8>;

    /// Read a 16-bit signed integer.
    async fn read_i16(&mut self) -> Result<i16>;

    /// Read a 32-bit signed integer.
    async fn read_i32(&mut self) -> Result<i32>;

    /// Read a 64-bit signed integer.
    async fn read_i64(&mut self) -> Result<i64>;

    /// Read a 64-bit float.
    async fn read_double(&mut self) -> Result<f64>;

    /// Read a UTF-8 string.
    async fn read_string(&mut self) -> Result<String>;

    /// Read an opaque byte sequence.
    async fn read_binary(&mut self) -> Result<Bytes>;

    // --- write path ---

    /// Write a message header.
    async fn write_message_header(&mut self, header: &MessageHeader) -> Result<()>;

    /// Write the end-of-message marker.
    async fn write_message_end(&mut self) -> Result<()>;

    /// Write a beginning-of-struct marker.
    async fn write_struct_begin(&mut self, name: &str) -> Result<()>;

    /// Write the end-of-struct marker.
    async fn write_struct_end(&mut self) -> Result<()>;

    /// Write a field header.
    async fn write_field_begin(&mut self, field: &FieldHeader) -> Result<()>;

    /// Write the end-of-field marker.
    async fn write_field_end(&mut self) -> Result<()>;

    /// Write the stop marker terminating a struct's field list.
    async fn write_field_stop(&mut self) -> Result<()>;

    /// Write a boolean value.
    async fn write_bool(&mut self, value: bool) -> Result<()>;

    /// Write an 8-bit signed integer.
    async fn write_i8(&mut self, value: i8) -> Result<()>;

    /// Write a 16-bit signed integer.
    async fn write_i16(&mut self, value: i16) -> Result<()>;

    /// Write a 32-bit signed integer.
    async fn write_i32(&mut self, value: i32) -> Result<()>;

    /// Write a 64-bit signed integer.
    async fn write_i64(&mut self, value: i64) -> Result<()>;

    /// Write a 64-bit float.
    async fn write_double(&mut self, value: f64) -> Result<()>;

    /// Write a UTF-8 string.
    async fn write_string(&mut self, value: &str) -> Result<()>;

    /// Write an opaque byte sequence.
    async fn write_binary(&mut self, value: Bytes) -> Result<()>;
}

// Boxed protocols forward, so `SequenceValidator<Box<dyn Protocol>>` works
// when the concrete protocol is chosen at runtime.
#[async_trait::async_trait]
impl<P: Protocol + ?Sized> Protocol for Box<P> {
    async fn read_message_header(&mut self, cancel: &CancellationToken) -> Result<MessageHeader> {
        (**self).read_message_header(cancel).await
    }

    async fn read_message_end(&mut self) -> Result<()> {
        (**self).read_message_end().await
    }

    async fn read_struct_begin(&mut self) -> Result<()> {
        (**self).read_struct_begin().await
    }

    async fn read_struct_end(&mut self) -> Result<()> {
        (**self).read_struct_end().await
    }

    async fn read_field_begin(&mut self) -> Result<Option<FieldHeader>> {
        (**self).read_field_begin().await
    }

    async fn read_field_end(&mut self) -> Result<()> {
        (**self).read_field_end().await
    }

    async fn read_bool(&mut self) -> Result<bool> {
        (**self).read_bool().await
    }

    async fn read_i8(&mut self) -> Result<i8> {
        (**self).read_i8().await
    }

    async fn read_i16(&mut self) -> Result<i16> {
        (**self).read_i16().await
    }

    async fn read_i32(&mut self) -> Result<i32> {
        (**self).read_i32().await
    }

    async fn read_i64(&mut self) -> Result<i64> {
        (**self).read_i64().await
    }

    async fn read_double(&mut self) -> Result<f64> {
        (**self).read_double().await
    }

    async fn read_string(&mut self) -> Result<String> {
        (**self).read_string().await
    }

    async fn read_binary(&mut self) -> Result<Bytes> {
        (**self).read_binary().await
    }

    async fn write_message_header(&mut self, header: &MessageHeader) -> Result<()> {
        (**self).write_message_header(header).await
    }

    async fn write_message_end(&mut self) -> Result<()> {
        (**self).write_message_end().await
    }

    async fn write_struct_begin(&mut self, name: &str) -> Result<()> {
        (**self).write_struct_begin(name).await
    }

    async fn write_struct_end(&mut self) -> Result<()> {
        (**self).write_struct_end().await
    }

    async fn write_field_begin(&mut self, field: &FieldHeader) -> Result<()> {
        (**self).write_field_begin(field).await
    }

    async fn write_field_end(&mut self) -> Result<()> {
        (**self).write_field_end().await
    }

    async fn write_field_stop(&mut self) -> Result<()> {
        (**self).write_field_stop().await
    }

    async fn write_bool(&mut self, value: bool) -> Result<()> {
        (**self).write_bool(value).await
    }

    async fn write_i8(&mut self, value: i8) -> Result<()> {
        (**self).write_i8(value).await
    }

    async fn write_i16(&mut self, value: i16) -> Result<()> {
        (**self).write_i16(value).await
    }

    async fn write_i32(&mut self, value: i32) -> Result<()> {
        (**self).write_i32(value).await
    }

    async fn write_i64(&mut self, value: i64) -> Result<()> {
        (**self).write_i64(value).await
    }

    async fn write_double(&mut self, value: f64) -> Result<()> {
        (**self).write_double(value).await
    }

    async fn write_string(&mut self, value: &str) -> Result<()> {
        (**self).write_string(value).await
    }

    async fn write_binary(&mut self, value: Bytes) -> Result<()> {
        (**self).write_binary(value).await
    }
}
