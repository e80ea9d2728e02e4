//! Integration tests for rsocket-framing.
//!
//! These tests drive frames through the writer task, a pipe, and the
//! decoder, and check what comes out the other side.

use bytes::Bytes;
use rsocket_framing::protocol::frames::{
    error_codes, CancelFrame, ErrorFrame, FrameKind, PayloadFrame, RequestChannelFrame,
    RequestFnfFrame, RequestNFrame, RequestResponseFrame, RequestStreamFrame, WithPayload,
};
use rsocket_framing::protocol::{FrameBuffer, HEADER_SIZE};
use rsocket_framing::{
    flags, run_decode_loop, spawn_writer_task, DecoderConfig, FrameBuilder, FrameDecoder,
    FrameError, FrameHeader, FrameType, TrailingBytes, TypedFrame, WriterConfig,
};
use tokio::io::{duplex, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Decode everything from `bytes` and parse each record.
async fn decode_all(bytes: &[u8]) -> Vec<TypedFrame> {
    let cancel = CancellationToken::new();
    let mut frames = Vec::new();
    run_decode_loop(bytes, &cancel, |_header, record| {
        frames.push(TypedFrame::parse(&record)?);
        Ok(())
    })
    .await
    .unwrap();
    frames
}

/// The worked example: stream 5, data "hello", metadata "meta".
#[tokio::test]
async fn test_request_response_wire_example() {
    let frame = RequestResponseFrame::new(5, b"hello", b"meta", 0).unwrap();
    let wire = frame.to_record().unwrap();

    let mut expected = vec![0x00, 0x00, 18];
    expected.extend_from_slice(&[0, 0, 0, 5]);
    expected.extend_from_slice(&(((0x04u16) << 10) | flags::METADATA).to_be_bytes());
    expected.extend_from_slice(b"\x00\x00\x04metahello");
    assert_eq!(&wire[..], &expected[..]);

    let frames = decode_all(&wire).await;
    assert_eq!(frames.len(), 1);
    assert_eq!(
        frames[0].to_string(),
        "RequestResponseFrame{FrameHeader{id=5,type=REQUEST_RESPONSE,flags=0b0100000000},data=hello,metadata=meta}"
    );
}

/// Every frame type survives writer -> pipe -> decoder.
#[tokio::test]
async fn test_writer_to_decoder_all_types() {
    let (client, server) = duplex(64 * 1024);
    let (writer, writer_task) = spawn_writer_task(client, WriterConfig::default());

    let decoder_task = tokio::spawn(async move {
        let cancel = CancellationToken::new();
        let mut frames = Vec::new();
        let result = run_decode_loop(server, &cancel, |_header, record| {
            frames.push(TypedFrame::parse(&record)?);
            Ok(())
        })
        .await;
        result.map(|_| frames)
    });

    writer
        .send(RequestResponseFrame::new(1, b"rr", b"m1", 0).unwrap().frame())
        .await
        .unwrap();
    writer
        .send(RequestFnfFrame::new(3, b"fnf", b"", 0).unwrap().frame())
        .await
        .unwrap();
    writer
        .send(RequestStreamFrame::new(5, 8, b"rs", b"", 0).unwrap().frame())
        .await
        .unwrap();
    writer
        .send(
            RequestChannelFrame::new(7, 2, b"rc", b"m7", flags::COMPLETE)
                .unwrap()
                .frame(),
        )
        .await
        .unwrap();
    writer
        .send(RequestNFrame::new(5, 32).unwrap().frame())
        .await
        .unwrap();
    writer
        .send(PayloadFrame::next_complete(1, b"reply", b"").unwrap().frame())
        .await
        .unwrap();
    writer
        .send(CancelFrame::new(5).unwrap().frame())
        .await
        .unwrap();
    writer
        .send(
            ErrorFrame::new(7, error_codes::APPLICATION_ERROR, b"nope")
                .unwrap()
                .frame(),
        )
        .await
        .unwrap();

    drop(writer);
    writer_task.await.unwrap().unwrap();
    let frames = decoder_task.await.unwrap().unwrap();

    assert_eq!(frames.len(), 8);
    let stream_ids: Vec<u32> = frames.iter().map(|f| f.header().stream_id).collect();
    assert_eq!(stream_ids, vec![1, 3, 5, 7, 5, 1, 5, 7]);

    match &frames[0] {
        TypedFrame::RequestResponse(f) => {
            assert_eq!(f.data_utf8(), "rr");
            assert_eq!(f.metadata_utf8().as_deref(), Some("m1"));
        }
        other => panic!("unexpected {}", other),
    }
    match &frames[2] {
        TypedFrame::RequestStream(f) => {
            assert_eq!(f.initial_request_n(), 8);
            assert_eq!(f.data_utf8(), "rs");
        }
        other => panic!("unexpected {}", other),
    }
    match &frames[3] {
        TypedFrame::RequestChannel(f) => {
            assert!(f.header().has_flag(flags::COMPLETE));
            assert_eq!(f.metadata_utf8().as_deref(), Some("m7"));
        }
        other => panic!("unexpected {}", other),
    }
    assert!(matches!(&frames[4], TypedFrame::RequestN(f) if f.request_n() == 32));
    assert!(matches!(&frames[5], TypedFrame::Payload(f) if f.is_next() && f.is_complete()));
    assert!(matches!(&frames[6], TypedFrame::Cancel(_)));
    match &frames[7] {
        TypedFrame::Error(f) => {
            assert_eq!(f.error_code(), error_codes::APPLICATION_ERROR);
            assert_eq!(f.message(), "nope");
        }
        other => panic!("unexpected {}", other),
    }
}

/// Empty data, absent metadata, and present-but-empty metadata are distinct.
#[tokio::test]
async fn test_empty_sections() {
    let no_metadata = RequestResponseFrame::new(1, b"", b"", 0).unwrap();
    let empty_metadata = FrameBuilder::new(FrameType::RequestResponse, 0)
        .metadata_section(b"")
        .unwrap()
        .build(3)
        .unwrap();

    let mut wire = no_metadata.to_record().unwrap().to_vec();
    wire.extend_from_slice(&empty_metadata.to_record().unwrap());

    let frames = decode_all(&wire).await;
    assert_eq!(frames.len(), 2);

    assert_eq!(frames[0].metadata(), None);
    assert!(frames[0].data().is_empty());
    assert_eq!(frames[0].frame().record_len(), HEADER_SIZE);

    assert!(frames[1].header().has_metadata());
    assert_eq!(frames[1].metadata(), Some(Bytes::new()));
    assert!(frames[1].data().is_empty());
}

/// Delivery is the same whether the stream arrives in one write or byte by byte.
#[tokio::test]
async fn test_chunking_invariance_over_pipe() {
    let mut wire = Vec::new();
    for i in 0..20u32 {
        let data = format!("item-{}", i);
        let frame = PayloadFrame::next(i * 2 + 1, data.as_bytes(), b"md").unwrap();
        wire.extend_from_slice(&frame.to_record().unwrap());
    }

    let whole: Vec<String> = decode_all(&wire).await.iter().map(|f| f.to_string()).collect();

    let (mut tx, rx) = duplex(16);
    let bytes = wire.clone();
    let feeder = tokio::spawn(async move {
        for byte in bytes {
            tx.write_all(&[byte]).await.unwrap();
        }
    });

    let cancel = CancellationToken::new();
    let mut trickled = Vec::new();
    run_decode_loop(rx, &cancel, |_header, record| {
        trickled.push(TypedFrame::parse(&record)?.to_string());
        Ok(())
    })
    .await
    .unwrap();
    feeder.await.unwrap();

    assert_eq!(whole.len(), 20);
    assert_eq!(whole, trickled);
}

/// A zero length prefix stops decoding before anything reaches the handler.
#[tokio::test]
async fn test_zero_length_over_pipe() {
    let (mut tx, rx) = duplex(64);
    tx.write_all(&[0, 0, 0]).await.unwrap();
    tx.write_all(&CancelFrame::new(1).unwrap().to_record().unwrap())
        .await
        .unwrap();
    drop(tx);

    let cancel = CancellationToken::new();
    let mut calls = 0;
    let err = run_decode_loop(rx, &cancel, |_header, _record| {
        calls += 1;
        Ok(())
    })
    .await
    .unwrap_err();

    assert!(matches!(err, FrameError::MalformedLength(0)));
    assert!(err.is_framing_error());
    assert_eq!(calls, 0);
}

/// Records above the configured cap are refused.
#[tokio::test]
async fn test_size_cap() {
    let frame = PayloadFrame::next(1, &[0xAB; 100], b"").unwrap();
    let wire = frame.to_record().unwrap();

    let config = DecoderConfig::default().max_frame_size(64);
    let err = FrameDecoder::with_config(&wire[..], config)
        .run(
            &CancellationToken::new(),
            &mut |_header: FrameHeader, _record: Bytes| -> rsocket_framing::Result<()> { Ok(()) },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FrameError::OversizeFrame { length: 109, max: 64 }));
}

/// A peer closing mid-record is reported only when asked.
#[tokio::test]
async fn test_truncated_stream_policy() {
    let frame = PayloadFrame::next(1, b"cut short", b"").unwrap();
    let wire = frame.to_record().unwrap();
    let cut = &wire[..wire.len() - 2];

    let discard = FrameDecoder::new(cut)
        .run(
            &CancellationToken::new(),
            &mut |_header: FrameHeader, _record: Bytes| -> rsocket_framing::Result<()> { Ok(()) },
        )
        .await;
    assert!(discard.is_ok());

    let config = DecoderConfig::default().trailing(TrailingBytes::Error);
    let strict = FrameDecoder::with_config(cut, config)
        .run(
            &CancellationToken::new(),
            &mut |_header: FrameHeader, _record: Bytes| -> rsocket_framing::Result<()> { Ok(()) },
        )
        .await;
    assert!(matches!(strict, Err(FrameError::TruncatedFrame { .. })));
}

/// Handlers can hand frames to another task and return immediately.
#[tokio::test]
async fn test_handler_hands_off_to_channel() {
    let mut wire = Vec::new();
    for i in 0..10u32 {
        let frame = PayloadFrame::next(i + 1, b"x", b"").unwrap();
        wire.extend_from_slice(&frame.to_record().unwrap());
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(FrameHeader, Bytes)>();
    let consumer = tokio::spawn(async move {
        let mut ids = Vec::new();
        while let Some((header, _record)) = rx.recv().await {
            ids.push(header.stream_id);
        }
        ids
    });

    let cancel = CancellationToken::new();
    run_decode_loop(&wire[..], &cancel, |header, record| {
        tx.send((header, record)).map_err(FrameError::handler)
    })
    .await
    .unwrap();
    drop(tx);

    assert_eq!(consumer.await.unwrap(), (1..=10).collect::<Vec<u32>>());
}

/// Splitting and typed parsing agree without the async layer.
#[test]
fn test_frame_buffer_with_typed_parse() {
    let stream = RequestStreamFrame::new(1, 4, b"q", b"", 0).unwrap();
    let request_n = RequestNFrame::new(1, 4).unwrap();
    let mut wire = stream.to_record().unwrap().to_vec();
    wire.extend_from_slice(&request_n.to_record().unwrap());

    let mut buffer = FrameBuffer::new();
    let (first, second) = wire.split_at(7);
    let mut records = buffer.push(first).unwrap();
    records.extend(buffer.push(second).unwrap());

    assert_eq!(records.len(), 2);
    assert!(matches!(
        TypedFrame::parse(&records[0]).unwrap(),
        TypedFrame::RequestStream(_)
    ));
    assert!(matches!(
        TypedFrame::parse(&records[1]).unwrap(),
        TypedFrame::RequestN(_)
    ));
}
