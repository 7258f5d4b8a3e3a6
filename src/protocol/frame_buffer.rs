//! Reassembly of relay frames from arbitrary read chunks.
//!
//! Bytes accumulate in a `BytesMut`; complete frames are split off without
//! copying. Parsing alternates between two states:
//! - `WaitingForHeader`: Need at least 13 bytes
//! - `WaitingForPayload`: Header parsed, need context + body bytes

use bytes::BytesMut;

use super::wire_format::{Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
use super::Frame;
use crate::error::Result;

/// Parser position within the current frame.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for complete header.
    WaitingForHeader,
    /// Header parsed, waiting for context and body bytes.
    WaitingForPayload { header: Header },
}

/// Turns a byte stream from the host into whole [`Frame`]s.
pub struct FrameBuffer {
    /// Accumulated bytes from stream reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed context + body size.
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Buffer with the default payload limit (1 GiB).
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Buffer that rejects frames whose context + body exceed `max_payload_size`.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
            max_payload_size,
        }
    }

    /// Append `data` and return every frame it completes, in order.
    ///
    /// Trailing bytes of an unfinished frame stay buffered.
    ///
    /// # Errors
    ///
    /// Returns error if a header is invalid or the payload exceeds
    /// `max_payload_size`.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Next complete frame, if the buffer holds one.
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    let header = match Header::decode(&self.buffer) {
                        Some(header) => header,
                        None => return Ok(None),
                    };

                    header.validate(self.max_payload_size)?;

                    let _ = self.buffer.split_to(HEADER_SIZE);
                    self.state = State::WaitingForPayload { header };
                }

                State::WaitingForPayload { header } => {
                    let context_len = header.context_length as usize;
                    let body_len = header.body_length as usize;

                    if self.buffer.len() < context_len + body_len {
                        return Ok(None);
                    }

                    let context = self.buffer.split_to(context_len).freeze();
                    let body = self.buffer.split_to(body_len).freeze();
                    self.state = State::WaitingForHeader;

                    return Ok(Some(Frame::from_parts(header, context, body)));
                }
            }
        }
    }

    /// Bytes held but not yet returned as frames.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if no partial frame is pending.
    ///
    /// A header already consumed while its payload is outstanding counts as
    /// pending data.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && matches!(self.state, State::WaitingForHeader)
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
