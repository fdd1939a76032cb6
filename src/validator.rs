// src/validator.rs

//! Sequence-validating protocol decorator.
//!
//! This module contains the core [`SequenceValidator`] type, a decorator
//! that wraps any [`Protocol`] implementation and checks that received
//! response headers carry the sequence ID of the request that solicited
//! them.
//!
//! # Architecture
//!
//! The validator implements [`Protocol`] itself by forwarding every
//! operation to the wrapped protocol unchanged. The one piece of added
//! behavior is [`read_correlated_header`](SequenceValidator::read_correlated_header),
//! which reads headers through the inner protocol and compares each one
//! against the caller's expected sequence ID, recovering from mismatches
//! according to the configured [`ValidationMode`].
//!
//! # Concurrency
//!
//! The validator holds no locks and supports one in-flight correlated read
//! per instance, which `&mut self` enforces at compile time. Callers that
//! multiplex concurrent requests over one connection must serialize access
//! to the validator or use one instance per logical request stream.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{
    // ---
    log_debug,
    Error,
    FieldHeader,
    MessageHeader,
    Protocol,
    Result,
    SequenceId,
};

/// Recovery policy applied when a received header's sequence ID does not
/// match the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Silently discard the mismatched header and keep reading until a
    /// matching one arrives, the read is cancelled, or the inner protocol
    /// fails.
    KeepReading,

    /// Fail immediately with [`Error::SequenceMismatch`] on the first
    /// mismatched header. The mismatched message is left unconsumed at
    /// this layer.
    ThrowOnMismatch,
}

/// Protocol decorator that validates response sequence IDs.
///
/// Wraps an inner [`Protocol`] and a [`ValidationMode`]. All protocol
/// operations pass through to the inner protocol untouched; the added
/// surface is [`read_correlated_header`](Self::read_correlated_header).
///
/// This decorator provides the most advantage over a framed transport:
/// in [`ValidationMode::KeepReading`] a discarded message's payload is not
/// explicitly consumed, so the underlying transport must treat each message
/// as a discrete, independently skippable unit for the stream to stay in
/// sync.
///
/// In `KeepReading` mode there is no bound on the number of discarded
/// headers: a misbehaving or adversarial peer that never sends the expected
/// sequence ID keeps the read looping until the inner protocol fails or the
/// cancellation token fires. Callers that need an upper bound should cancel
/// the token themselves.
///
/// The validator owns the wrapped protocol; use [`get_ref`](Self::get_ref),
/// [`get_mut`](Self::get_mut), or [`into_inner`](Self::into_inner) to reach
/// it.
///
/// # Example
///
/// ```no_run
/// # use seqguard::{
/// #     MemoryProtocol, MessageHeader, MessageKind, Protocol, SequenceId,
/// #     SequenceValidator, ValidationMode,
/// # };
/// # use tokio_util::sync::CancellationToken;
/// # async fn example() -> seqguard::Result<()> {
/// let (client, mut server) = MemoryProtocol::pair();
/// let mut client = SequenceValidator::new(client, ValidationMode::KeepReading);
///
/// let request_id = SequenceId::new(1);
/// client
///     .write_message_header(&MessageHeader::new("ping", MessageKind::Call, request_id))
///     .await?;
///
/// // ... server echoes the sequence id back in its reply ...
/// # server
/// #     .write_message_header(&MessageHeader::new("ping", MessageKind::Reply, request_id))
/// #     .await?;
///
/// let cancel = CancellationToken::new();
/// let reply = client.read_correlated_header(request_id, &cancel).await?;
/// assert_eq!(reply.sequence_id, request_id);
/// # Ok(())
/// # }
/// ```
pub struct SequenceValidator<P> {
    inner: P,
    mode: ValidationMode,
}

impl<P: Protocol> SequenceValidator<P> {
    /// Wrap `inner` with the given initial validation mode.
    pub fn new(inner: P, mode: ValidationMode) -> Self {
        Self { inner, mode }
    }

    /// Current validation mode.
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Change the validation mode.
    ///
    /// Takes effect on the next call to
    /// [`read_correlated_header`](Self::read_correlated_header); a call
    /// captures the mode once when it starts.
    pub fn set_mode(&mut self, mode: ValidationMode) {
        self.mode = mode;
    }

    /// Shared reference to the wrapped protocol.
    pub fn get_ref(&self) -> &P {
        &self.inner
    }

    /// Mutable reference to the wrapped protocol.
    pub fn get_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    /// Unwrap the validator, returning the inner protocol.
    pub fn into_inner(self) -> P {
        self.inner
    }

    /// Read the next message header whose sequence ID equals `expected`.
    ///
    /// Delegates to the inner protocol's header read and compares the
    /// result against `expected`. On a match the header is returned; on a
    /// mismatch the mode captured at call start decides:
    ///
    /// - [`ValidationMode::KeepReading`]: the mismatched header is
    ///   discarded and the read repeats until a match arrives, the token
    ///   is cancelled, or the inner protocol fails.
    /// - [`ValidationMode::ThrowOnMismatch`]: fails with
    ///   [`Error::SequenceMismatch`] without reading further.
    ///
    /// # Errors
    ///
    /// - [`Error::SequenceMismatch`] in `ThrowOnMismatch` mode.
    /// - [`Error::Cancelled`] once `cancel` fires; cancellation is checked
    ///   on every iteration and is never reported as a mismatch.
    /// - Any inner protocol error, propagated unchanged. Inner failures
    ///   terminate the loop immediately and are never retried.
    pub async fn read_correlated_header(
        &mut self,
        expected: SequenceId,
        cancel: &CancellationToken,
    ) -> Result<MessageHeader> {
        // ---
        let mode = self.mode;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let header = self.inner.read_message_header(cancel).await?;

            if header.sequence_id == expected {
                return Ok(header);
            }

            match mode {
                ValidationMode::KeepReading => {
                    log_debug!(
                        "discarding out-of-sequence header (expected {expected}, got {}, kind {})",
                        header.sequence_id,
                        header.kind,
                    );
                }
                ValidationMode::ThrowOnMismatch => {
                    return Err(Error::SequenceMismatch {
                        expected,
                        actual: header.sequence_id,
                    });
                }
            }
        }
    }
}

// Everything below is pure pass-through: the validator adds no behavior to
// any operation other than read_correlated_header above.
#[async_trait::async_trait]
impl<P: Protocol> Protocol for SequenceValidator<P> {
    async fn read_message_header(&mut self, cancel: &CancellationToken) -> Result<MessageHeader> {
        self.inner.read_message_header(cancel).await
    }

    async fn read_message_end(&mut self) -> Result<()> {
        self.inner.read_message_end().await
    }

    async fn read_struct_begin(&mut self) -> Result<()> {
        self.inner.read_struct_begin().await
    }

    async fn read_struct_end(&mut self) -> Result<()> {
        self.inner.read_struct_end().await
    }

    async fn read_field_begin(&mut self) -> Result<Option<FieldHeader>> {
        self.inner.read_field_begin().await
    }

    async fn read_field_end(&mut self) -> Result<()> {
        self.inner.read_field_end().await
    }

    async fn read_bool(&mut self) -> Result<bool> {
        self.inner.read_bool().await
    }

    async fn read_i8(&mut self) -> Result<i8> {
        self.inner.read_i8().await
    }

    async fn read_i16(&mut self) -> Result<i16> {
        self.inner.read_i16().await
    }

    async fn read_i32(&mut self) -> Result<i32> {
        self.inner.read_i32().await
    }

    async fn read_i64(&mut self) -> Result<i64> {
        self.inner.read_i64().await
    }

    async fn read_double(&mut self) -> Result<f64> {
        self.inner.read_double().await
    }

    async fn read_string(&mut self) -> Result<String> {
        self.inner.read_string().await
    }

    async fn read_binary(&mut self) -> Result<Bytes> {
        self.inner.read_binary().await
    }

    async fn write_message_header(&mut self, header: &MessageHeader) -> Result<()> {
        self.inner.write_message_header(header).await
    }

    async fn write_message_end(&mut self) -> Result<()> {
        self.inner.write_message_end().await
    }

    async fn write_struct_begin(&mut self, name: &str) -> Result<()> {
        self.inner.write_struct_begin(name).await
    }

    async fn write_struct_end(&mut self) -> Result<()> {
        self.inner.write_struct_end().await
    }

    async fn write_field_begin(&mut self, field: &FieldHeader) -> Result<()> {
        self.inner.write_field_begin(field).await
    }

    async fn write_field_end(&mut self) -> Result<()> {
        self.inner.write_field_end().await
    }

    async fn write_field_stop(&mut self) -> Result<()> {
        self.inner.write_field_stop().await
    }

    async fn write_bool(&mut self, value: bool) -> Result<()> {
        self.inner.write_bool(value).await
    }

    async fn write_i8(&mut self, value: i8) -> Result<()> {
        self.inner.write_i8(value).await
    }

    async fn write_i16(&mut self, value: i16) -> Result<()> {
        self.inner.write_i16(value).await
    }

    async fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32(value).await
    }

    async fn write_i64(&mut self, value: i64) -> Result<()> {
        self.inner.write_i64(value).await
    }

    async fn write_double(&mut self, value: f64) -> Result<()> {
        self.inner.write_double(value).await
    }

    async fn write_string(&mut self, value: &str) -> Result<()> {
        self.inner.write_string(value).await
    }

    async fn write_binary(&mut self, value: Bytes) -> Result<()> {
        self.inner.write_binary(value).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{MemoryProtocol, MessageKind};

    fn reply(seq: i32) -> MessageHeader {
        MessageHeader::new("echo", MessageKind::Reply, SequenceId::new(seq))
    }

    #[tokio::test]
    async fn test_match_on_first_read() {
        // ---
        let (client, mut server) = MemoryProtocol::pair();
        let mut validator = SequenceValidator::new(client, ValidationMode::ThrowOnMismatch);

        server.write_message_header(&reply(5)).await.unwrap();

        let cancel = CancellationToken::new();
        let header = validator
            .read_correlated_header(SequenceId::new(5), &cancel)
            .await
            .unwrap();

        assert_eq!(header, reply(5));
        assert_eq!(validator.get_ref().headers_read(), 1);
    }

    #[tokio::test]
    async fn test_set_mode_applies_to_next_call() {
        // ---
        let (client, mut server) = MemoryProtocol::pair();
        let mut validator = SequenceValidator::new(client, ValidationMode::KeepReading);

        server.write_message_header(&reply(1)).await.unwrap();
        server.write_message_header(&reply(2)).await.unwrap();

        // First call discards the stray header under KeepReading.
        let cancel = CancellationToken::new();
        validator
            .read_correlated_header(SequenceId::new(2), &cancel)
            .await
            .unwrap();

        // Mode change affects only the next call.
        validator.set_mode(ValidationMode::ThrowOnMismatch);

        server.write_message_header(&reply(9)).await.unwrap();
        let err = validator
            .read_correlated_header(SequenceId::new(3), &cancel)
            .await
            .unwrap_err();

        match err {
            Error::SequenceMismatch { expected, actual } => {
                assert_eq!(expected, SequenceId::new(3));
                assert_eq!(actual, SequenceId::new(9));
            }
            other => panic!("expected SequenceMismatch, got {other:?}"),
        }
    }
}
