//! Declarative broker topology.
//!
//! A topology lists the queues, exchanges and bindings a worker needs before
//! it starts consuming. It is usually loaded from JSON:
//!
//! ```json
//! {
//!   "queue":     [{ "name": "orders", "durable": true }],
//!   "exchange":  [{ "name": "shop", "kind": "topic" }],
//!   "queueBind": [{ "queue": "orders", "exchange": "shop", "key": "order.*" }]
//! }
//! ```
//!
//! String fields may reference environment variables as `${VAR}` or
//! `${VAR:-default}`; see [`Topology::expand_env`].

use serde::Deserialize;
use serde_json::Value;

use crate::config::expand_vars;
use crate::error::{Result, ThumperError};
use crate::management::{Arguments, BindOptions, ExchangeOptions, ManagementClient, QueueOptions};
use crate::rpc::RpcTransport;

/// Queue entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueueConfig {
    pub name: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub exclusive: bool,
    pub no_wait: bool,
    pub args: Arguments,
}

/// Exchange entry. The exchange type is read from `kind` (or `type`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExchangeConfig {
    pub name: String,
    #[serde(alias = "type")]
    pub kind: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub no_wait: bool,
    pub args: Arguments,
}

/// Binding entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueueBindConfig {
    pub queue: String,
    pub exchange: String,
    pub key: String,
    pub no_wait: bool,
    pub args: Arguments,
}

/// Everything to declare, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Topology {
    pub queue: Vec<QueueConfig>,
    pub exchange: Vec<ExchangeConfig>,
    pub queue_bind: Vec<QueueBindConfig>,
}

impl QueueConfig {
    fn options(&self) -> QueueOptions {
        QueueOptions {
            durable: self.durable,
            auto_delete: self.auto_delete,
            exclusive: self.exclusive,
            no_wait: self.no_wait,
            args: self.args.clone(),
        }
    }
}

impl ExchangeConfig {
    fn options(&self) -> ExchangeOptions {
        ExchangeOptions {
            durable: self.durable,
            auto_delete: self.auto_delete,
            internal: self.internal,
            no_wait: self.no_wait,
            args: self.args.clone(),
        }
    }
}

impl QueueBindConfig {
    fn options(&self) -> BindOptions {
        BindOptions {
            no_wait: self.no_wait,
            args: self.args.clone(),
        }
    }
}

impl Topology {
    /// Parse a topology from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a topology from a JSON file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.exchange.is_empty() && self.queue_bind.is_empty()
    }

    /// Substitute variables in names, kinds, routing keys and top-level
    /// string argument values.
    pub fn expand_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let expand = |s: &mut String| *s = expand_vars(s, &lookup);

        for queue in &mut self.queue {
            expand(&mut queue.name);
            expand_args(&mut queue.args, &lookup);
        }
        for exchange in &mut self.exchange {
            expand(&mut exchange.name);
            expand(&mut exchange.kind);
            expand_args(&mut exchange.args, &lookup);
        }
        for bind in &mut self.queue_bind {
            expand(&mut bind.queue);
            expand(&mut bind.exchange);
            expand(&mut bind.key);
            expand_args(&mut bind.args, &lookup);
        }
    }

    /// Declare queues, then exchanges, then bindings.
    ///
    /// Stops at the first failure with [`ThumperError::Declare`] naming the
    /// entity.
    pub async fn declare<T: RpcTransport>(&self, client: &ManagementClient<T>) -> Result<()> {
        for queue in &self.queue {
            tracing::debug!(name = %queue.name, "Declaring queue");
            client
                .queue_declare(&queue.name, &queue.options())
                .await
                .map_err(|e| declare_error(format!("queue {}", queue.name), e))?;
        }

        for exchange in &self.exchange {
            tracing::debug!(name = %exchange.name, kind = %exchange.kind, "Declaring exchange");
            client
                .exchange_declare(&exchange.name, &exchange.kind, &exchange.options())
                .await
                .map_err(|e| declare_error(format!("exchange {}", exchange.name), e))?;
        }

        for bind in &self.queue_bind {
            tracing::debug!(
                queue = %bind.queue,
                exchange = %bind.exchange,
                key = %bind.key,
                "Binding queue"
            );
            client
                .bind_queue(&bind.queue, &bind.exchange, &bind.key, &bind.options())
                .await
                .map_err(|e| {
                    declare_error(format!("binding {} -> {}", bind.exchange, bind.queue), e)
                })?;
        }

        tracing::info!(
            queues = self.queue.len(),
            exchanges = self.exchange.len(),
            bindings = self.queue_bind.len(),
            "Topology declared"
        );
        Ok(())
    }
}

fn expand_args<F>(args: &mut Arguments, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    for value in args.values_mut() {
        if let Value::String(s) = value {
            *s = expand_vars(s, lookup);
        }
    }
}

fn declare_error(entity: String, source: ThumperError) -> ThumperError {
    ThumperError::Declare {
        entity,
        source: Box::new(source),
    }
}
