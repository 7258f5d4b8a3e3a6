//! Wire format encoding and decoding.
//!
//! Implements the 13-byte header format:
//! ```text
//! ┌───────┬──────────┬─────────────┬──────────┐
//! │ Flags │ Seq      │ Context len │ Body len │
//! │ 1 byte│ 4 bytes  │ 4 bytes     │ 4 bytes  │
//! │       │ uint32 BE│ uint32 BE   │ uint32 BE│
//! └───────┴──────────┴─────────────┴──────────┘
//! ```
//!
//! The context bytes follow the header, then the body bytes.
//! All multi-byte integers are Big Endian.

use crate::error::{Result, ThumperError};

/// Header size in bytes (fixed, exactly 13).
pub const HEADER_SIZE: usize = 13;

/// Default maximum combined context + body size (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1_073_741_824;

/// Flag constants for the protocol.
pub mod flags {
    /// Error flag: the body is an error message from the host.
    pub const ERROR: u8 = 0b0000_0001;

    /// Reserved bits mask (bits 1-7).
    pub const RESERVED_MASK: u8 = 0b1111_1110;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Flags byte (see `flags` module).
    pub flags: u8,
    /// Sequence number (0 on the delivery relay).
    pub seq: u32,
    /// Context length in bytes.
    pub context_length: u32,
    /// Body length in bytes.
    pub body_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(flags: u8, seq: u32, context_length: u32, body_length: u32) -> Self {
        Self {
            flags,
            seq,
            context_length,
            body_length,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use thumper_client::protocol::Header;
    ///
    /// let header = Header::new(0, 7, 2, 5);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 13);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.flags;
        buf[1..5].copy_from_slice(&self.seq.to_be_bytes());
        buf[5..9].copy_from_slice(&self.context_length.to_be_bytes());
        buf[9..13].copy_from_slice(&self.body_length.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            flags: buf[0],
            seq: u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]),
            context_length: u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]),
            body_length: u32::from_be_bytes([buf[9], buf[10], buf[11], buf[12]]),
        })
    }

    /// Combined context + body length.
    #[inline]
    pub fn payload_length(&self) -> u64 {
        u64::from(self.context_length) + u64::from(self.body_length)
    }

    /// Validate the header for protocol compliance.
    ///
    /// Checks:
    /// - Reserved flag bits are 0
    /// - Context + body length doesn't exceed max
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.flags & flags::RESERVED_MASK != 0 {
            return Err(ThumperError::Protocol(
                "Reserved flag bits must be 0".to_string(),
            ));
        }

        if self.payload_length() > u64::from(max_payload_size) {
            return Err(ThumperError::Protocol(format!(
                "Payload size {} exceeds maximum {}",
                self.payload_length(),
                max_payload_size
            )));
        }

        Ok(())
    }

    /// Check if this is an error reply.
    #[inline]
    pub fn is_error(&self) -> bool {
        flags::has_flag(self.flags, flags::ERROR)
    }
}
