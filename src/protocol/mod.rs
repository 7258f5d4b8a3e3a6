//! Protocol module - relay wire format and framing.
//!
//! Every unit exchanged with the host runtime (deliveries, dispositions and
//! RPC calls) is one frame:
//! - 13-byte header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Frame struct carrying a context blob and a body

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{flags, Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
