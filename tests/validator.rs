use std::time::Duration;

use tokio_util::sync::CancellationToken;

use seqguard::{
    //
    Error,
    MemoryProtocol,
    MessageHeader,
    MessageKind,
    Protocol,
    Result,
    SequenceId,
    SequenceValidator,
    ValidationMode,
};

fn reply(name: &str, seq: i32) -> MessageHeader {
    MessageHeader::new(name, MessageKind::Reply, SequenceId::new(seq))
}

#[tokio::test]
async fn test_match_on_first_read_performs_one_read() -> Result<()> {
    // ---
    init_logging();

    let (client, mut server) = MemoryProtocol::pair();
    let mut client = SequenceValidator::new(client, ValidationMode::KeepReading);

    server.write_message_header(&reply("echo", 42)).await?;

    let cancel = CancellationToken::new();
    let header = client
        .read_correlated_header(SequenceId::new(42), &cancel)
        .await?;

    assert_eq!(header, reply("echo", 42));
    assert_eq!(client.get_ref().headers_read(), 1);

    Ok(())
}

#[tokio::test]
async fn test_keep_reading_discards_mismatched_headers() -> Result<()> {
    // ---
    init_logging();

    let (client, mut server) = MemoryProtocol::pair();
    let mut client = SequenceValidator::new(client, ValidationMode::KeepReading);

    // Two stale responses ahead of the one we are waiting for.
    server.write_message_header(&reply("stale", 7)).await?;
    server.write_message_header(&reply("stale", 7)).await?;
    server.write_message_header(&reply("echo", 42)).await?;

    let cancel = CancellationToken::new();
    let header = client
        .read_correlated_header(SequenceId::new(42), &cancel)
        .await?;

    assert_eq!(header.sequence_id, SequenceId::new(42));
    // Exactly two mismatched headers were consumed before the match.
    assert_eq!(client.get_ref().headers_read(), 3);

    Ok(())
}

#[tokio::test]
async fn test_throw_on_mismatch_fails_on_first_header() -> Result<()> {
    // ---
    init_logging();

    let (client, mut server) = MemoryProtocol::pair();
    let mut client = SequenceValidator::new(client, ValidationMode::ThrowOnMismatch);

    server.write_message_header(&reply("stale", 7)).await?;
    server.write_message_header(&reply("stale", 7)).await?;
    server.write_message_header(&reply("echo", 42)).await?;

    let cancel = CancellationToken::new();
    let err = client
        .read_correlated_header(SequenceId::new(42), &cancel)
        .await
        .unwrap_err();

    match err {
        Error::SequenceMismatch { expected, actual } => {
            assert_eq!(expected, SequenceId::new(42));
            assert_eq!(actual, SequenceId::new(7));
        }
        other => panic!("expected SequenceMismatch, got {other:?}"),
    }

    // No further reads were attempted: the second stale header is still
    // queued and readable through the plain pass-through.
    assert_eq!(client.get_ref().headers_read(), 1);
    let next = client.read_message_header(&cancel).await?;
    assert_eq!(next.sequence_id, SequenceId::new(7));

    Ok(())
}

#[tokio::test]
async fn test_cancelled_before_read_is_never_a_mismatch() -> Result<()> {
    // ---
    init_logging();

    for mode in [ValidationMode::KeepReading, ValidationMode::ThrowOnMismatch] {
        let (client, mut server) = MemoryProtocol::pair();
        let mut client = SequenceValidator::new(client, mode);

        // A mismatched header is already queued, but the token fired first.
        server.write_message_header(&reply("stale", 7)).await?;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client
            .read_correlated_header(SequenceId::new(42), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled), "mode {mode:?}: {err:?}");
        assert_eq!(client.get_ref().headers_read(), 0);
    }

    Ok(())
}

#[tokio::test]
async fn test_cancellation_mid_loop_aborts_keep_reading() -> Result<()> {
    // ---
    init_logging();

    let (client, mut server) = MemoryProtocol::pair();
    let mut client = SequenceValidator::new(client, ValidationMode::KeepReading);

    // One stale header, then nothing: the loop will block on the second
    // delegated read until the token fires.
    server.write_message_header(&reply("stale", 7)).await?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client
        .read_correlated_header(SequenceId::new(42), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(client.get_ref().headers_read(), 1);

    // Keep the server end alive so the loop blocked on recv, not on a
    // closed connection.
    drop(server);

    Ok(())
}

#[tokio::test]
async fn test_inner_failure_propagates_and_stops_loop() -> Result<()> {
    // ---
    init_logging();

    let (client, mut server) = MemoryProtocol::pair();
    let mut client = SequenceValidator::new(client, ValidationMode::KeepReading);

    // A stale header followed by a unit that cannot decode as a header.
    server.write_message_header(&reply("stale", 7)).await?;
    server.write_bool(true).await?;
    server.write_message_header(&reply("echo", 42)).await?;

    let cancel = CancellationToken::new();
    let err = client
        .read_correlated_header(SequenceId::new(42), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode(_)), "got {err:?}");
    // The matching header behind the failure was never touched.
    assert_eq!(client.get_ref().headers_read(), 1);

    Ok(())
}

#[tokio::test]
async fn test_peer_gone_propagates_connection_closed() -> Result<()> {
    // ---
    init_logging();

    let (client, mut server) = MemoryProtocol::pair();
    let mut client = SequenceValidator::new(client, ValidationMode::KeepReading);

    server.write_message_header(&reply("stale", 7)).await?;
    drop(server);

    let cancel = CancellationToken::new();
    let err = client
        .read_correlated_header(SequenceId::new(42), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConnectionClosed), "got {err:?}");

    Ok(())
}

#[tokio::test]
async fn test_repeated_matched_reads_are_idempotent() -> Result<()> {
    // ---
    init_logging();

    let (client, mut server) = MemoryProtocol::pair();
    let mut client = SequenceValidator::new(client, ValidationMode::ThrowOnMismatch);

    let cancel = CancellationToken::new();

    for _ in 0..3 {
        server.write_message_header(&reply("echo", 5)).await?;
        let header = client
            .read_correlated_header(SequenceId::new(5), &cancel)
            .await?;
        assert_eq!(header, reply("echo", 5));
    }

    Ok(())
}

#[tokio::test]
async fn test_mode_change_applies_to_later_calls_only() -> Result<()> {
    // ---
    init_logging();

    let (client, mut server) = MemoryProtocol::pair();
    let mut client = SequenceValidator::new(client, ValidationMode::ThrowOnMismatch);
    assert_eq!(client.mode(), ValidationMode::ThrowOnMismatch);

    let cancel = CancellationToken::new();

    server.write_message_header(&reply("stale", 1)).await?;
    server.write_message_header(&reply("echo", 2)).await?;

    let err = client
        .read_correlated_header(SequenceId::new(2), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SequenceMismatch { .. }));

    // Same stream shape succeeds once the mode is switched.
    client.set_mode(ValidationMode::KeepReading);
    assert_eq!(client.mode(), ValidationMode::KeepReading);

    let header = client
        .read_correlated_header(SequenceId::new(2), &cancel)
        .await?;
    assert_eq!(header.sequence_id, SequenceId::new(2));

    Ok(())
}

#[tokio::test]
async fn test_all_other_operations_pass_through() -> Result<()> {
    // ---
    init_logging();

    use bytes::Bytes;
    use seqguard::{FieldHeader, TypeId};

    let (client, mut server) = MemoryProtocol::pair();
    let mut client = SequenceValidator::new(client, ValidationMode::ThrowOnMismatch);

    // Write a full call through the validator...
    let call = MessageHeader::new("set_point", MessageKind::Call, SequenceId::new(9));
    client.write_message_header(&call).await?;
    client.write_struct_begin("SetPoint").await?;
    client
        .write_field_begin(&FieldHeader::named("x", TypeId::I32, 1))
        .await?;
    client.write_i32(17).await?;
    client.write_field_end().await?;
    client
        .write_field_begin(&FieldHeader::named("label", TypeId::String, 2))
        .await?;
    client.write_string("origin").await?;
    client.write_field_end().await?;
    client
        .write_field_begin(&FieldHeader::named("raw", TypeId::Binary, 3))
        .await?;
    client.write_binary(Bytes::from_static(b"\x01\x02")).await?;
    client.write_field_end().await?;
    client.write_field_stop().await?;
    client.write_struct_end().await?;
    client.write_message_end().await?;

    // ...and observe it verbatim on the peer.
    let cancel = CancellationToken::new();
    let header = server.read_message_header(&cancel).await?;
    assert_eq!(header, call);

    server.read_struct_begin().await?;

    let field = server.read_field_begin().await?.expect("field, not stop");
    assert_eq!(field, FieldHeader::named("x", TypeId::I32, 1));
    assert_eq!(server.read_i32().await?, 17);
    server.read_field_end().await?;

    let field = server.read_field_begin().await?.expect("field, not stop");
    assert_eq!(field.type_id, TypeId::String);
    assert_eq!(server.read_string().await?, "origin");
    server.read_field_end().await?;

    let field = server.read_field_begin().await?.expect("field, not stop");
    assert_eq!(field.type_id, TypeId::Binary);
    assert_eq!(server.read_binary().await?, Bytes::from_static(b"\x01\x02"));
    server.read_field_end().await?;

    assert!(server.read_field_begin().await?.is_none());
    server.read_struct_end().await?;
    server.read_message_end().await?;

    // Reads forward verbatim too.
    server.write_bool(true).await?;
    server.write_i8(-3).await?;
    server.write_i16(-300).await?;
    server.write_i64(1 << 40).await?;
    server.write_double(2.5).await?;

    assert!(client.read_bool().await?);
    assert_eq!(client.read_i8().await?, -3);
    assert_eq!(client.read_i16().await?, -300);
    assert_eq!(client.read_i64().await?, 1 << 40);
    assert_eq!(client.read_double().await?, 2.5);

    Ok(())
}

mod imp {
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "debug".into()),
                )
                .with_test_writer()
                .try_init();
        });
    }
}

pub fn init_logging() {
    imp::init();
}
