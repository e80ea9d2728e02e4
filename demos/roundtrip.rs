//! Round trip - writer task and decoder connected by an in-memory pipe.
//!
//! This example demonstrates:
//! - Building typed frames (request-stream, payloads, completion)
//! - Queueing them on a writer task from several producers
//! - Decoding the byte stream and handing frames to a consumer task
//!
//! ```text
//! cargo run --example roundtrip
//! ```

use bytes::Bytes;
use rsocket_framing::protocol::frames::{FrameKind, PayloadFrame, RequestStreamFrame};
use rsocket_framing::{
    spawn_writer_task, FrameDecoder, FrameError, FrameHeader, TypedFrame, WriterConfig,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (writer, writer_task) = spawn_writer_task(client, WriterConfig::default());

    // Consumer: prints whatever the decoder hands off
    let (tx, mut rx) = mpsc::channel::<Bytes>(32);
    let consumer = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match TypedFrame::parse(&record) {
                Ok(frame) => println!("received {}", frame),
                Err(e) => println!("bad frame: {}", e),
            }
        }
    });

    let cancel = CancellationToken::new();
    let decoder = tokio::spawn(async move {
        FrameDecoder::new(server)
            .run(
                &cancel,
                &mut |_header: FrameHeader, record: Bytes| -> rsocket_framing::Result<()> {
                    tx.try_send(record).map_err(FrameError::handler)
                },
            )
            .await
    });

    let request = RequestStreamFrame::new(1, 3, b"numbers", b"text/plain", 0)?;
    writer.send(request.frame()).await?;

    let mut producers = Vec::new();
    for i in 0..3u32 {
        let writer = writer.clone();
        producers.push(tokio::spawn(async move {
            let data = format!("item {}", i);
            let frame = PayloadFrame::next(1, data.as_bytes(), b"")?;
            writer.send(frame.frame()).await
        }));
    }
    for producer in producers {
        producer.await??;
    }

    writer.send(PayloadFrame::complete(1)?.frame()).await?;

    drop(writer);
    writer_task.await??;
    decoder.await??;
    consumer.await?;

    Ok(())
}
