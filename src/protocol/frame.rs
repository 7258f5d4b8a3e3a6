//! Frame struct with typed accessors.
//!
//! A frame carries two opaque blobs: a context (delivery metadata or an RPC
//! method name) and a body. Both use `bytes::Bytes` for zero-copy sharing.
//!
//! # Example
//!
//! ```
//! use thumper_client::protocol::Frame;
//! use bytes::Bytes;
//!
//! let frame = Frame::new(Bytes::from_static(b"{}"), Bytes::from_static(b"hello"));
//!
//! assert_eq!(frame.context(), b"{}");
//! assert_eq!(frame.body(), b"hello");
//! assert_eq!(frame.header.body_length, 5);
//! ```

use bytes::Bytes;

use super::wire_format::{flags, Header, HEADER_SIZE};
use crate::error::{Result, ThumperError};

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Context bytes.
    pub context: Bytes,
    /// Body bytes.
    pub body: Bytes,
}

impl Frame {
    /// Create a frame with sequence 0 and no flags.
    pub fn new(context: Bytes, body: Bytes) -> Self {
        Self::with_seq(0, 0, context, body)
    }

    /// Create a frame with explicit flags and sequence number.
    pub fn with_seq(frame_flags: u8, seq: u32, context: Bytes, body: Bytes) -> Self {
        // oversized parts saturate here and are refused by `check_lengths`
        let header = Header::new(
            frame_flags,
            seq,
            u32::try_from(context.len()).unwrap_or(u32::MAX),
            u32::try_from(body.len()).unwrap_or(u32::MAX),
        );
        Self {
            header,
            context,
            body,
        }
    }

    /// Create an error reply carrying `message` as its body.
    pub fn error(seq: u32, message: &str) -> Self {
        Self::with_seq(
            flags::ERROR,
            seq,
            Bytes::new(),
            Bytes::copy_from_slice(message.as_bytes()),
        )
    }

    /// Assemble a frame from an already decoded header.
    pub(crate) fn from_parts(header: Header, context: Bytes, body: Bytes) -> Self {
        Self {
            header,
            context,
            body,
        }
    }

    /// Get a reference to the context bytes.
    #[inline]
    pub fn context(&self) -> &[u8] {
        &self.context
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the sequence number.
    #[inline]
    pub fn seq(&self) -> u32 {
        self.header.seq
    }

    /// Check if this is an error reply.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.header.is_error()
    }

    /// Check if both context and body are empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.body.is_empty()
    }

    /// Fail if the context or body cannot be described by a 32-bit length.
    pub fn check_lengths(&self) -> Result<()> {
        wire_length("context", self.context.len())?;
        wire_length("body", self.body.len())?;
        Ok(())
    }

    /// Total encoded size (header + context + body).
    #[inline]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.context.len() + self.body.len()
    }
}

fn wire_length(part: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        ThumperError::Protocol(format!("Frame {} of {} bytes exceeds the 4 GiB limit", part, len))
    })
}

/// Build a complete frame as a single byte vector.
///
/// Encodes the header and appends context and body into a contiguous buffer.
///
/// # Example
///
/// ```
/// use thumper_client::protocol::{build_frame, Frame};
/// use bytes::Bytes;
///
/// let frame = Frame::new(Bytes::new(), Bytes::from_static(b"0"));
/// let bytes = build_frame(&frame);
/// assert_eq!(bytes.len(), 13 + 1);
/// ```
pub fn build_frame(frame: &Frame) -> Vec<u8> {
    let mut buf = Vec::with_capacity(frame.size());
    buf.extend_from_slice(&frame.header.encode());
    buf.extend_from_slice(&frame.context);
    buf.extend_from_slice(&frame.body);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_lengths_follow_content() {
        let frame = Frame::new(Bytes::from_static(b"ctx"), Bytes::from_static(b"hello"));

        assert_eq!(frame.header.context_length, 3);
        assert_eq!(frame.header.body_length, 5);
        assert_eq!(frame.seq(), 0);
        assert_eq!(frame.size(), HEADER_SIZE + 8);
    }

    #[test]
    fn test_error_frame() {
        let frame = Frame::error(9, "queue not found");

        assert!(frame.is_error());
        assert_eq!(frame.seq(), 9);
        assert!(frame.context().is_empty());
        assert_eq!(frame.body(), b"queue not found");
    }

    #[test]
    fn test_empty_frame() {
        assert!(Frame::new(Bytes::new(), Bytes::new()).is_empty());
        assert!(!Frame::new(Bytes::new(), Bytes::from_static(b"x")).is_empty());
        assert!(!Frame::new(Bytes::from_static(b"x"), Bytes::new()).is_empty());
    }

    #[test]
    fn test_ordinary_frame_passes_length_check() {
        let frame = Frame::new(Bytes::from_static(b"ctx"), Bytes::from_static(b"body"));
        assert!(frame.check_lengths().is_ok());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_length_beyond_u32_is_refused() {
        assert_eq!(wire_length("body", u32::MAX as usize).unwrap(), u32::MAX);

        let err = wire_length("body", u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, ThumperError::Protocol(_)));
    }

    #[test]
    fn test_build_frame_layout() {
        let frame = Frame::with_seq(0, 3, Bytes::from_static(b"ab"), Bytes::from_static(b"cde"));
        let bytes = build_frame(&frame);

        assert_eq!(&bytes[..HEADER_SIZE], &frame.header.encode());
        assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 2], b"ab");
        assert_eq!(&bytes[HEADER_SIZE + 2..], b"cde");
    }
}
