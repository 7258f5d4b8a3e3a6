//! MsgPack codec using `rmp-serde`.
//!
//! **Always** use `to_vec_named`: the host decodes request bodies by field
//! name (`exchange`, `autoDelete`, ...), so structs must be written as maps,
//! never as positional arrays.

use crate::error::Result;

/// MessagePack codec for RPC request bodies.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes in struct-as-map format.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    #[serde(rename_all = "camelCase")]
    struct QueueBody {
        name: String,
        durable: bool,
        auto_delete: bool,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = QueueBody {
            name: "orders".to_string(),
            durable: true,
            auto_delete: false,
        };

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let decoded: QueueBody = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_struct_is_written_as_map() {
        let body = QueueBody {
            name: "q".to_string(),
            durable: false,
            auto_delete: false,
        };

        let encoded = MsgPackCodec::encode(&body).unwrap();

        // 0x83 = fixmap with 3 entries; an array would be 0x93
        assert_eq!(encoded[0], 0x83, "Expected fixmap, got {:02X}", encoded[0]);
    }

    #[test]
    fn test_field_names_use_camel_case() {
        let body = QueueBody {
            name: "q".to_string(),
            durable: false,
            auto_delete: true,
        };

        let encoded = MsgPackCodec::encode(&body).unwrap();
        let as_map: HashMap<String, serde_json::Value> = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(as_map["autoDelete"], serde_json::Value::Bool(true));
        assert!(!as_map.contains_key("auto_delete"));
    }

    #[test]
    fn test_integer_keys_do_not_decode_as_strings() {
        let mut map = HashMap::new();
        map.insert(7u32, "seven");

        let encoded = MsgPackCodec::encode(&map).unwrap();
        let result: Result<HashMap<String, String>> = MsgPackCodec::decode(&encoded);

        assert!(result.is_err());
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let invalid = [0xc1u8]; // never-used marker byte
        let result: Result<QueueBody> = MsgPackCodec::decode(&invalid);
        assert!(result.is_err());
    }
}
