//! RPC transport to the host runtime.
//!
//! Management calls are named remote procedures. Each call is one request
//! frame (method name in the context, MsgPack body) answered by one reply
//! frame carrying the same sequence number. An `ERROR` reply carries the
//! host's error message as its body.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::codec::MsgPackCodec;
use crate::error::{Result, ThumperError};
use crate::protocol::Frame;
use crate::transport::{DynRelay, Relay, RelayAddress};

/// Default service the management methods live under.
pub const DEFAULT_SERVICE: &str = "thumper";

/// A request/response channel for named remote calls.
pub trait RpcTransport: Send + Sync {
    /// Invoke `method` with `payload` and wait for the reply.
    fn call<P>(&self, method: &str, payload: &P) -> impl Future<Output = Result<()>> + Send
    where
        P: Serialize + Sync;
}

/// [`RpcTransport`] over a framed relay.
///
/// The relay sits behind an async mutex held for exactly one request/reply
/// exchange, so a single `FramedRpc` can be shared by many callers. Replies
/// left over from cancelled calls are skipped by sequence number.
pub struct FramedRpc<R> {
    relay: Mutex<R>,
    service: Option<String>,
    next_seq: AtomicU32,
}

impl FramedRpc<DynRelay> {
    /// Connect to the host's RPC endpoint.
    pub async fn connect(address: &RelayAddress) -> Result<Self> {
        if address.is_pipes() {
            return Err(ThumperError::Config(
                "RPC cannot use pipes: stdio is reserved for deliveries".to_string(),
            ));
        }
        let relay = address.connect(crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE).await?;
        Ok(Self::new(relay))
    }
}

impl<R: Relay> FramedRpc<R> {
    /// Wrap a relay; methods are prefixed with the default service name.
    pub fn new(relay: R) -> Self {
        Self {
            relay: Mutex::new(relay),
            service: Some(DEFAULT_SERVICE.to_string()),
            next_seq: AtomicU32::new(1),
        }
    }

    /// Prefix method names with `service.` (or send them bare with `None`).
    pub fn with_service_prefix(mut self, service: Option<&str>) -> Self {
        self.service = service.map(str::to_string);
        self
    }

    /// Full method name as sent on the wire.
    fn method_name(&self, method: &str) -> String {
        match &self.service {
            Some(service) => format!("{}.{}", service, method),
            None => method.to_string(),
        }
    }
}

impl<R: Relay> RpcTransport for FramedRpc<R> {
    async fn call<P>(&self, method: &str, payload: &P) -> Result<()>
    where
        P: Serialize + Sync,
    {
        let name = self.method_name(method);
        let body = MsgPackCodec::encode(payload)?;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let mut relay = self.relay.lock().await;
        relay
            .send(Frame::with_seq(0, seq, Bytes::from(name.clone()), Bytes::from(body)))
            .await?;

        let reply = loop {
            let reply = relay.receive().await?.ok_or(ThumperError::ConnectionClosed)?;
            if reply.seq() < seq {
                // answer to a call whose caller gave up waiting
                tracing::debug!(method = %name, stale = reply.seq(), seq, "Discarding stale RPC reply");
                continue;
            }
            break reply;
        };
        drop(relay);

        if reply.seq() != seq {
            return Err(ThumperError::Protocol(format!(
                "RPC reply sequence {} is ahead of request {}",
                reply.seq(),
                seq
            )));
        }

        if reply.is_error() {
            let message = String::from_utf8_lossy(reply.body()).into_owned();
            tracing::debug!(method = %name, error = %message, "RPC call failed");
            return Err(ThumperError::Remote(message));
        }

        tracing::debug!(method = %name, seq, "RPC call completed");
        Ok(())
    }
}
