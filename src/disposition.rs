//! Terminal outcome of a delivered message.
//!
//! The reply to the host is a frame with an empty context and a body of one
//! ASCII digit: `0` = Ack, `1` = Nack, `2` = Reject. These tags are part of
//! the wire contract and never change.

use std::fmt;

use bytes::Bytes;

/// What the broker should do with a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Disposition {
    /// Processed; remove it from the queue.
    Ack = 0,
    /// Failed; requeue it according to broker policy.
    Nack = 1,
    /// Failed; do not requeue (poison message).
    Reject = 2,
}

impl Disposition {
    /// Stable integer tag.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a disposition by integer tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Disposition::Ack),
            1 => Some(Disposition::Nack),
            2 => Some(Disposition::Reject),
            _ => None,
        }
    }

    /// Encode as a reply body.
    ///
    /// # Example
    ///
    /// ```
    /// use thumper_client::Disposition;
    ///
    /// assert_eq!(&Disposition::Reject.encode()[..], b"2");
    /// ```
    #[inline]
    pub fn encode(self) -> Bytes {
        match self {
            Disposition::Ack => Bytes::from_static(b"0"),
            Disposition::Nack => Bytes::from_static(b"1"),
            Disposition::Reject => Bytes::from_static(b"2"),
        }
    }

    /// Decode a reply body, as the host does.
    ///
    /// Anything other than a single known digit is rejected.
    pub fn decode(body: &[u8]) -> Option<Self> {
        match body {
            [digit @ b'0'..=b'9'] => Self::from_tag(digit - b'0'),
            _ => None,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Disposition::Ack => "ack",
            Disposition::Nack => "nack",
            Disposition::Reject => "reject",
        };
        f.write_str(name)
    }
}
