//! Broker management calls.
//!
//! [`ManagementClient`] turns publish and topology operations into named
//! remote calls on an [`RpcTransport`]. It keeps no state between calls:
//! every method validates its input, issues exactly one call, and returns
//! when the host has answered.
//!
//! # Example
//!
//! ```ignore
//! use thumper_client::management::{ExchangeOptions, ManagementClient, QueueOptions};
//! use thumper_client::rpc::FramedRpc;
//!
//! let rpc = FramedRpc::connect(&"tcp://127.0.0.1:6001".parse()?).await?;
//! let client = ManagementClient::new(rpc);
//!
//! client.queue_declare("orders", &QueueOptions { durable: true, ..Default::default() }).await?;
//! client.exchange_declare("shop", "topic", &ExchangeOptions::default()).await?;
//! client.bind_queue("orders", "shop", "order.*", &Default::default()).await?;
//! client.publish("shop", "order.created", "application/json", "{}", Default::default()).await?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::MsgPackCodec;
use crate::error::{Result, ThumperError};
use crate::rpc::RpcTransport;

/// Extra arguments or headers attached to a management call.
///
/// Keys are always strings. Maps built from arbitrary serializable values go
/// through [`Arguments::from_serialize`], which refuses anything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// An empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build arguments from any serializable map.
    ///
    /// `None`/unit yields an empty map. Anything that is not a map, or a map
    /// with a non-string key at any depth, fails with
    /// [`ThumperError::InvalidArgument`].
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let encoded = MsgPackCodec::encode(value).map_err(|e| {
            ThumperError::InvalidArgument(format!("arguments cannot be encoded: {}", e))
        })?;

        // 0xc0 = nil
        if encoded == [0xc0] {
            return Ok(Self::new());
        }

        rmp_serde::from_slice::<Map<String, Value>>(&encoded)
            .map(Self)
            .map_err(|e| {
                ThumperError::InvalidArgument(format!(
                    "arguments must be a map with string keys: {}",
                    e
                ))
            })
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.0.values_mut()
    }

    /// `Some(self)` when there is anything to send.
    fn non_empty(&self) -> Option<&Self> {
        (!self.is_empty()).then_some(self)
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Flags for [`ManagementClient::exchange_declare`]. All default to `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeOptions {
    /// Survive a broker restart.
    pub durable: bool,
    /// Delete once the last consumer or binding is gone.
    pub auto_delete: bool,
    /// Only reachable from other exchanges, not by publishers.
    pub internal: bool,
    /// Do not wait for the broker to confirm.
    pub no_wait: bool,
    /// Extra broker arguments; omitted from the call when empty.
    pub args: Arguments,
}

/// Flags for [`ManagementClient::queue_declare`]. All default to `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueOptions {
    /// Survive a broker restart.
    pub durable: bool,
    /// Delete once the last consumer or binding is gone.
    pub auto_delete: bool,
    /// Usable only by the declaring connection.
    pub exclusive: bool,
    /// Do not wait for the broker to confirm.
    pub no_wait: bool,
    /// Extra broker arguments; omitted from the call when empty.
    pub args: Arguments,
}

/// Flags for [`ManagementClient::bind_queue`]. All default to `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindOptions {
    /// Do not wait for the broker to confirm.
    pub no_wait: bool,
    /// Extra broker arguments; omitted from the call when empty.
    pub args: Arguments,
}

/// Remote method names.
pub mod methods {
    pub const PUBLISH: &str = "Publish";
    pub const EXCHANGE_DECLARE: &str = "ExchangeDeclare";
    pub const QUEUE_DECLARE: &str = "QueueDeclare";
    pub const BIND_QUEUE: &str = "BindQueue";
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest<'a> {
    exchange: &'a str,
    key: &'a str,
    content_type: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<&'a Arguments>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeDeclareRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    durable: bool,
    auto_delete: bool,
    internal: bool,
    no_wait: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<&'a Arguments>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueDeclareRequest<'a> {
    name: &'a str,
    durable: bool,
    auto_delete: bool,
    exclusive: bool,
    no_wait: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<&'a Arguments>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BindQueueRequest<'a> {
    queue: &'a str,
    exchange: &'a str,
    key: &'a str,
    no_wait: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<&'a Arguments>,
}

/// Stateless client for publish and topology calls.
pub struct ManagementClient<T> {
    transport: T,
}

impl<T: RpcTransport> ManagementClient<T> {
    /// Client issuing calls over `transport`.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Publish `message` to `exchange` with routing `key`.
    pub async fn publish(
        &self,
        exchange: &str,
        key: &str,
        content_type: &str,
        message: &str,
        headers: Arguments,
    ) -> Result<()> {
        let request = PublishRequest {
            exchange,
            key,
            content_type,
            message,
            headers: headers.non_empty(),
        };
        self.transport.call(methods::PUBLISH, &request).await
    }

    /// [`publish`](Self::publish) with headers from any serializable map.
    ///
    /// Fails with [`ThumperError::InvalidArgument`] before anything is sent
    /// if a header key is not a string.
    pub async fn publish_with_headers<H: Serialize + ?Sized>(
        &self,
        exchange: &str,
        key: &str,
        content_type: &str,
        message: &str,
        headers: &H,
    ) -> Result<()> {
        let headers = Arguments::from_serialize(headers)?;
        self.publish(exchange, key, content_type, message, headers)
            .await
    }

    /// Declare exchange `name` of the given kind (`direct`, `topic`, ...).
    pub async fn exchange_declare(
        &self,
        name: &str,
        kind: &str,
        options: &ExchangeOptions,
    ) -> Result<()> {
        let request = ExchangeDeclareRequest {
            name,
            kind,
            durable: options.durable,
            auto_delete: options.auto_delete,
            internal: options.internal,
            no_wait: options.no_wait,
            args: options.args.non_empty(),
        };
        self.transport.call(methods::EXCHANGE_DECLARE, &request).await
    }

    /// Declare queue `name`.
    pub async fn queue_declare(&self, name: &str, options: &QueueOptions) -> Result<()> {
        let request = QueueDeclareRequest {
            name,
            durable: options.durable,
            auto_delete: options.auto_delete,
            exclusive: options.exclusive,
            no_wait: options.no_wait,
            args: options.args.non_empty(),
        };
        self.transport.call(methods::QUEUE_DECLARE, &request).await
    }

    /// Bind `queue` to `exchange` with routing `key`.
    pub async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        key: &str,
        options: &BindOptions,
    ) -> Result<()> {
        let request = BindQueueRequest {
            queue,
            exchange,
            key,
            no_wait: options.no_wait,
            args: options.args.non_empty(),
        };
        self.transport.call(methods::BIND_QUEUE, &request).await
    }
}
