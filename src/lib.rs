//! # rsocket-framing
//!
//! Wire framing and frame codec for the RSocket binary protocol.
//!
//! ## Layers
//!
//! - **Records**: a byte stream is a sequence of `[u24 length][frame]`
//!   records. [`FrameDecoder`] splits a stream and hands each record to a
//!   [`FrameHandler`]; [`WriterHandle`] queues records for a writer task.
//! - **Frames**: a 6-byte header (stream ID, type, flags) followed by a
//!   body. Payload-carrying bodies share one metadata/data layout.
//! - **Typed frames**: [`TypedFrame`] parses a record into one of the
//!   request, response, or control frame types and validates it.
//!
//! Frame bodies are borrowed from a process-wide buffer pool and returned
//! when the frame drops.
//!
//! ## Example
//!
//! ```
//! use rsocket_framing::protocol::frames::{FrameKind, RequestResponseFrame, WithPayload};
//! use rsocket_framing::{FrameDecoder, FrameHeader, TypedFrame};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rsocket_framing::Result<()> {
//! let request = RequestResponseFrame::new(5, b"hello", b"meta", 0)?;
//! let wire = request.to_record()?;
//!
//! let mut received = Vec::new();
//! FrameDecoder::new(&wire[..])
//!     .run(
//!         &CancellationToken::new(),
//!         &mut |_header: FrameHeader, record: bytes::Bytes| -> rsocket_framing::Result<()> {
//!             received.push(TypedFrame::parse(&record)?);
//!             Ok(())
//!         },
//!     )
//!     .await?;
//!
//! let TypedFrame::RequestResponse(frame) = &received[0] else {
//!     unreachable!()
//! };
//! assert_eq!(frame.data_utf8(), "hello");
//! assert_eq!(frame.metadata_utf8().as_deref(), Some("meta"));
//! # Ok(())
//! # }
//! ```

pub mod decoder;
pub mod error;
pub mod protocol;
pub mod writer;

pub use decoder::{run_decode_loop, DecoderConfig, FrameDecoder, FrameHandler};
pub use error::{FrameError, Result};
pub use protocol::frames::TypedFrame;
pub use protocol::{flags, Frame, FrameBuilder, FrameHeader, FrameType, TrailingBytes};
pub use writer::{spawn_writer_task, WriterConfig, WriterHandle};
