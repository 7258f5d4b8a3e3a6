//! Codec module - serialization of RPC request bodies.
//!
//! Management calls travel to the host runtime as MessagePack maps.
//! Delivery metadata is JSON and is handled by [`crate::envelope`].
//!
//! # Example
//!
//! ```
//! use thumper_client::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"queue1").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "queue1");
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
