//! Delivery envelope decoding.
//!
//! The host delivers each broker message as a body plus a JSON metadata
//! blob:
//!
//! ```text
//! { "headers"?: { <string>: [<string>, ...] },
//!   "queue": <string>, "exchange": <string>,
//!   "routingKey": <string>, "deliveryTag": <integer> }
//! ```
//!
//! An empty body together with empty metadata is the host's termination
//! signal. Required fields are checked one by one so a bad envelope reports
//! exactly what is wrong; a [`Message`] is only built once every one has
//! passed. `headers` is optional and never fails a delivery: a single string
//! becomes a one-element list and other values are kept as JSON text.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use thumper_client::envelope::{decode, Delivery};
//!
//! let meta = br#"{"queue":"q","exchange":"","routingKey":"q","deliveryTag":1}"#;
//! match decode(Bytes::from_static(b"hi"), meta).unwrap() {
//!     Delivery::Message(msg) => assert_eq!(msg.queue(), "q"),
//!     Delivery::EndOfStream => unreachable!(),
//! }
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;

/// Message headers: header name to its values, in order.
pub type Headers = HashMap<String, Vec<String>>;

/// Why an envelope could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The metadata is not valid JSON.
    #[error("malformed metadata: {0}")]
    Malformed(String),

    /// The metadata is valid JSON but not an object.
    #[error("metadata must be a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A field is present with the wrong JSON type.
    #[error("field `{field}` must be {expected}")]
    WrongType {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Description of the expected type.
        expected: &'static str,
    },
}

/// Outcome of decoding one relay unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// A fully populated message.
    Message(Message),
    /// The host asked the worker to stop.
    EndOfStream,
}

/// A message delivered from the broker.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    body: Bytes,
    headers: Headers,
    queue: String,
    exchange: String,
    routing_key: String,
    delivery_tag: u64,
}

impl Message {
    /// Create a message from its parts.
    pub fn new(
        body: Bytes,
        headers: Headers,
        queue: impl Into<String>,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        delivery_tag: u64,
    ) -> Self {
        Self {
            body,
            headers,
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            delivery_tag,
        }
    }

    /// Message body.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Message body as `Bytes` (cheap clone).
    #[inline]
    pub fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// All headers.
    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Values of a single header.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers.get(name).map(Vec::as_slice)
    }

    /// Queue the message was consumed from.
    #[inline]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Exchange the message was published to.
    #[inline]
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Routing key used by the broker.
    #[inline]
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Broker-assigned delivery tag.
    #[inline]
    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }
}

/// Decode one relay unit into a [`Delivery`].
///
/// # Errors
///
/// Returns [`DecodeError`] if the metadata is malformed or incomplete.
pub fn decode(body: Bytes, metadata: &[u8]) -> Result<Delivery, DecodeError> {
    if body.is_empty() && metadata.is_empty() {
        return Ok(Delivery::EndOfStream);
    }

    let value: Value =
        serde_json::from_slice(metadata).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let fields = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let queue = string_field(fields, "queue")?;
    let exchange = string_field(fields, "exchange")?;
    let routing_key = string_field(fields, "routingKey")?;
    let delivery_tag = match fields.get("deliveryTag") {
        None => return Err(DecodeError::MissingField("deliveryTag")),
        Some(v) => v.as_u64().ok_or(DecodeError::WrongType {
            field: "deliveryTag",
            expected: "a non-negative integer",
        })?,
    };
    let headers = headers_field(fields);

    Ok(Delivery::Message(Message {
        body,
        headers,
        queue,
        exchange,
        routing_key,
        delivery_tag,
    }))
}

fn string_field(fields: &Map<String, Value>, name: &'static str) -> Result<String, DecodeError> {
    match fields.get(name) {
        None => Err(DecodeError::MissingField(name)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DecodeError::WrongType {
            field: name,
            expected: "a string",
        }),
    }
}

/// Headers are advisory: broker tables carry arbitrary values (`x-death`
/// holds a list of tables), so a value that is not a string list is kept as
/// text rather than failing the delivery.
fn headers_field(fields: &Map<String, Value>) -> Headers {
    let object = match fields.get("headers") {
        None | Some(Value::Null) => return Headers::new(),
        Some(Value::Object(object)) => object,
        Some(other) => {
            tracing::warn!(headers = %other, "Ignoring headers that are not an object");
            return Headers::new();
        }
    };

    let mut headers = Headers::with_capacity(object.len());
    for (name, value) in object {
        let values = match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| header_text(name, item))
                .collect(),
            single => header_text(name, single).into_iter().collect(),
        };
        headers.insert(name.clone(), values);
    }
    headers
}

/// One header value as text; `null` is dropped.
fn header_text(name: &str, value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => {
            tracing::warn!(header = name, value = %other, "Header value is not a string, keeping its JSON text");
            Some(other.to_string())
        }
    }
}
