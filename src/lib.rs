//! # thumper-client
//!
//! Worker-side client for an AMQP broker reached through a host runtime.
//!
//! The host owns the broker connection. This crate covers the two sides a
//! worker process sees:
//!
//! - **Deliveries** (relay): the host hands the worker one message at a
//!   time, and the worker answers each with exactly one disposition
//!   (`Ack`, `Nack` or `Reject`). See [`Worker`].
//! - **Management** (RPC): publish and topology calls forwarded to the
//!   broker through the host. See [`ManagementClient`] and [`Topology`].
//!
//! ## Example
//!
//! ```ignore
//! use thumper_client::{Config, Message, Worker, WorkerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     thumper_client::logging::init();
//!
//!     let config = Config::from_env()?;
//!     let mut worker = WorkerBuilder::from_config(&config).connect().await?;
//!
//!     worker
//!         .run(|msg: Message| async move {
//!             println!("{}", String::from_utf8_lossy(msg.body()));
//!             Ok(())
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod disposition;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod logging;
pub mod management;
pub mod protocol;
pub mod rpc;
pub mod topology;
pub mod transport;
pub mod worker;

pub use config::Config;
pub use disposition::Disposition;
pub use envelope::{DecodeError, Delivery, Headers, Message};
pub use error::{BoxError, ThumperError};
pub use handler::{HandlerResult, MessageHandler};
pub use management::{Arguments, BindOptions, ExchangeOptions, ManagementClient, QueueOptions};
pub use rpc::{FramedRpc, RpcTransport};
pub use topology::Topology;
pub use worker::{RunSummary, Worker, WorkerBuilder};
