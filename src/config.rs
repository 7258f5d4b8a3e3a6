//! Environment-driven configuration.
//!
//! The host runtime tells the worker where to find it through environment
//! variables:
//!
//! | Variable              | Meaning                         | Default   |
//! |-----------------------|---------------------------------|-----------|
//! | `RR_RELAY`            | Delivery relay address          | `pipes`   |
//! | `RR_RPC`              | Management RPC address          | none      |
//! | `THUMPER_MAX_PAYLOAD` | Max frame payload, in bytes     | 1 GB      |

use crate::error::{Result, ThumperError};
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;
use crate::transport::RelayAddress;

/// Delivery relay address variable.
pub const RELAY_ENV: &str = "RR_RELAY";

/// Management RPC address variable.
pub const RPC_ENV: &str = "RR_RPC";

/// Maximum payload size variable.
pub const MAX_PAYLOAD_ENV: &str = "THUMPER_MAX_PAYLOAD";

/// Worker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where deliveries arrive.
    pub relay: RelayAddress,
    /// Where management calls go, if configured.
    pub rpc: Option<RelayAddress>,
    /// Maximum accepted frame payload (context + body).
    pub max_payload_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay: RelayAddress::Pipes,
            rpc: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(relay) = lookup(RELAY_ENV) {
            config.relay = relay.parse()?;
        }

        if let Some(rpc) = lookup(RPC_ENV) {
            let address: RelayAddress = rpc.parse()?;
            if address.is_pipes() {
                return Err(ThumperError::Config(format!(
                    "{} cannot be `pipes`: stdio is reserved for deliveries",
                    RPC_ENV
                )));
            }
            config.rpc = Some(address);
        }

        if let Some(limit) = lookup(MAX_PAYLOAD_ENV) {
            config.max_payload_size = limit.trim().parse().map_err(|_| {
                ThumperError::Config(format!("{} must be a number of bytes, got {:?}", MAX_PAYLOAD_ENV, limit))
            })?;
        }

        Ok(config)
    }

    /// The RPC address, or an error naming the missing variable.
    pub fn rpc_address(&self) -> Result<&RelayAddress> {
        self.rpc
            .as_ref()
            .ok_or_else(|| ThumperError::Config(format!("{} is not set", RPC_ENV)))
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references in `input`.
///
/// Unset variables without a default expand to the empty string. An
/// unterminated `${` is kept as-is.
///
/// # Example
///
/// ```
/// use thumper_client::config::expand_vars;
///
/// let lookup = |key: &str| (key == "APP").then(|| "billing".to_string());
/// assert_eq!(expand_vars("${APP}.events", lookup), "billing.events");
/// assert_eq!(expand_vars("${ENV:-dev}-queue", lookup), "dev-queue");
/// ```
pub fn expand_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = match after.find('}') {
            Some(end) => end,
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        };

        let expr = &after[..end];
        let value = match expr.split_once(":-") {
            Some((name, default)) => lookup(name)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string()),
            None => lookup(expr).unwrap_or_default(),
        };
        out.push_str(&value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(env(&[])).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.relay, RelayAddress::Pipes);
        assert!(config.rpc_address().is_err());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = Config::from_lookup(env(&[
            ("RR_RELAY", "unix:///run/rr.sock"),
            ("RR_RPC", "tcp://127.0.0.1:6001"),
            ("THUMPER_MAX_PAYLOAD", "65536"),
        ]))
        .unwrap();

        assert_eq!(config.relay.to_string(), "unix:///run/rr.sock");
        assert_eq!(
            config.rpc_address().unwrap(),
            &RelayAddress::Tcp("127.0.0.1:6001".to_string())
        );
        assert_eq!(config.max_payload_size, 65536);
    }

    #[test]
    fn test_rpc_over_pipes_rejected() {
        let err = Config::from_lookup(env(&[("RR_RPC", "pipes")])).unwrap_err();
        assert!(matches!(err, ThumperError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_lookup(env(&[("RR_RELAY", "ftp://x")])).is_err());
        assert!(Config::from_lookup(env(&[("THUMPER_MAX_PAYLOAD", "lots")])).is_err());
    }

    #[test]
    fn test_expand_vars() {
        let lookup = env(&[("QUEUE", "orders"), ("EMPTY", "")]);

        assert_eq!(expand_vars("plain", &lookup), "plain");
        assert_eq!(expand_vars("${QUEUE}", &lookup), "orders");
        assert_eq!(expand_vars("a.${QUEUE}.${QUEUE}", &lookup), "a.orders.orders");
        assert_eq!(expand_vars("${MISSING}", &lookup), "");
        assert_eq!(expand_vars("${MISSING:-fallback}", &lookup), "fallback");
        assert_eq!(expand_vars("${EMPTY:-fallback}", &lookup), "fallback");
        assert_eq!(expand_vars("${QUEUE:-fallback}", &lookup), "orders");
        assert_eq!(expand_vars("broken ${QUEUE", &lookup), "broken ${QUEUE");
    }
}
