//! Frame relay over an async byte stream.
//!
//! The relay owns both halves of the stream. Reads go through a
//! [`FrameBuffer`] so frames split across reads, or several frames in one
//! read, come out whole and in order.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use thumper_client::protocol::Frame;
//! use thumper_client::transport::{Relay, StreamRelay};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> thumper_client::error::Result<()> {
//! let (a, b) = tokio::io::duplex(1024);
//! let (a_read, a_write) = tokio::io::split(a);
//! let (b_read, b_write) = tokio::io::split(b);
//! let mut host = StreamRelay::new(a_read, a_write);
//! let mut worker = StreamRelay::new(b_read, b_write);
//!
//! host.send(Frame::new(Bytes::new(), Bytes::from_static(b"ping"))).await?;
//! let frame = worker.receive().await?.unwrap();
//! assert_eq!(frame.body(), b"ping");
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, ThumperError};
use crate::protocol::{Frame, FrameBuffer, DEFAULT_MAX_PAYLOAD_SIZE};

/// Size of a single stream read.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// A bidirectional frame channel to the host runtime.
pub trait Relay: Send {
    /// Wait for the next frame.
    ///
    /// Returns `Ok(None)` when the host closed the stream on a frame
    /// boundary.
    fn receive(&mut self) -> impl Future<Output = Result<Option<Frame>>> + Send;

    /// Write one frame and flush it.
    fn send(&mut self, frame: Frame) -> impl Future<Output = Result<()>> + Send;
}

/// Relay over boxed stream halves, as produced by [`crate::transport::RelayAddress::connect`].
pub type DynRelay =
    StreamRelay<Box<dyn AsyncRead + Unpin + Send>, Box<dyn AsyncWrite + Unpin + Send>>;

/// [`Relay`] implementation over an `AsyncRead` / `AsyncWrite` pair.
pub struct StreamRelay<R, W> {
    reader: R,
    writer: W,
    buffer: FrameBuffer,
    /// Frames parsed but not yet handed out.
    ready: VecDeque<Frame>,
    read_buf: Vec<u8>,
}

impl<R, W> StreamRelay<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a relay with the default maximum payload size.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_max_payload(reader, writer, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a relay with a custom maximum payload size.
    pub fn with_max_payload(reader: R, writer: W, max_payload_size: u32) -> Self {
        Self {
            reader,
            writer,
            buffer: FrameBuffer::with_max_payload(max_payload_size),
            ready: VecDeque::new(),
            read_buf: vec![0u8; READ_CHUNK_SIZE],
        }
    }
}

impl<R, W> Relay for StreamRelay<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn receive(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(Some(frame));
            }

            let n = self.reader.read(&mut self.read_buf).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                tracing::error!(
                    buffered = self.buffer.len(),
                    "Relay closed in the middle of a frame"
                );
                return Err(ThumperError::ConnectionClosed);
            }

            let frames = self.buffer.push(&self.read_buf[..n])?;
            self.ready.extend(frames);
        }
    }

    async fn send(&mut self, frame: Frame) -> Result<()> {
        frame.check_lengths()?;
        self.writer.write_all(&frame.header.encode()).await?;
        if !frame.context.is_empty() {
            self.writer.write_all(&frame.context).await?;
        }
        if !frame.body.is_empty() {
            self.writer.write_all(&frame.body).await?;
        }
        self.writer.flush().await?;
        Ok(())
    }
}
