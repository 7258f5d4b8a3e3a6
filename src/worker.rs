//! Worker and delivery loop.
//!
//! A [`Worker`] owns the relay to the host runtime and processes one
//! message at a time:
//!
//! ```text
//! AwaitingUnit ─► Decoding ─► Processing ─► Responding ─► AwaitingUnit
//!      │              │                         │
//!      ▼              ▼                         ▼
//!   Stopped        Faulted                   Faulted
//! (end of stream) (bad envelope)   (handler failed, after Reject)
//! ```
//!
//! Every decoded message gets exactly one disposition, in arrival order,
//! before the next unit is requested. A handler failure sends `Reject` and
//! ends the loop: the worker's own state may be inconsistent after a
//! failure, so it stops consuming and the host restarts it.
//!
//! # Example
//!
//! ```ignore
//! use thumper_client::{Message, Worker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut worker = Worker::builder().connect().await?;
//!
//!     let summary = worker
//!         .run(|msg: Message| async move {
//!             tracing::info!(queue = msg.queue(), "got {} bytes", msg.body().len());
//!             Ok(())
//!         })
//!         .await?;
//!
//!     tracing::info!(acked = summary.acked, "worker stopped");
//!     Ok(())
//! }
//! ```

use bytes::Bytes;

use crate::config::Config;
use crate::disposition::Disposition;
use crate::envelope::{self, Delivery, Message};
use crate::error::{BoxError, Result, ThumperError};
use crate::handler::MessageHandler;
use crate::protocol::{Frame, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::transport::{DynRelay, Relay, RelayAddress};

/// Builder for connecting a [`Worker`] to the host runtime.
#[derive(Debug, Clone)]
pub struct WorkerBuilder {
    relay: RelayAddress,
    max_payload_size: u32,
}

impl WorkerBuilder {
    /// Create a builder using stdin/stdout as the relay.
    pub fn new() -> Self {
        Self {
            relay: RelayAddress::Pipes,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Create a builder from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            relay: config.relay.clone(),
            max_payload_size: config.max_payload_size,
        }
    }

    /// Set the relay address.
    ///
    /// Default: `pipes`
    pub fn relay(mut self, address: RelayAddress) -> Self {
        self.relay = address;
        self
    }

    /// Set the maximum accepted frame payload (context + body).
    ///
    /// Default: 1 GB
    pub fn max_payload_size(mut self, limit: u32) -> Self {
        self.max_payload_size = limit;
        self
    }

    /// Connect the relay and build the worker.
    pub async fn connect(self) -> Result<Worker<DynRelay>> {
        let relay = self.relay.connect(self.max_payload_size).await?;
        tracing::info!(relay = %self.relay, "Worker connected");
        Ok(Worker::new(relay))
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters reported when the delivery loop stops cleanly.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Messages acknowledged.
    pub acked: u64,
}

/// Delivery loop state.
enum LoopState {
    AwaitingUnit,
    Decoding(Option<Frame>),
    Processing(Message),
    Responding {
        delivery_tag: u64,
        disposition: Disposition,
        /// Handler error that forces the loop to stop once the reply is out.
        failure: Option<BoxError>,
    },
    Stopped,
    Faulted(ThumperError),
}

/// A worker bound to one relay.
pub struct Worker<R> {
    relay: R,
    /// Delivery tag still owed a disposition.
    outstanding: Option<u64>,
}

impl Worker<DynRelay> {
    /// Create a new worker builder.
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::new()
    }
}

impl<R: Relay> Worker<R> {
    /// Wrap an already connected relay.
    pub fn new(relay: R) -> Self {
        Self {
            relay,
            outstanding: None,
        }
    }

    /// Delivery tag of the message still awaiting a disposition.
    pub fn outstanding(&self) -> Option<u64> {
        self.outstanding
    }

    /// Consume the worker and return the relay.
    pub fn into_inner(self) -> R {
        self.relay
    }

    /// Wait for the next message.
    ///
    /// Returns `Ok(None)` when the host ends the stream. Every returned
    /// message must be answered with [`Worker::respond`] before this is
    /// called again.
    pub async fn wait_message(&mut self) -> Result<Option<Message>> {
        let frame = self.fetch().await?;
        self.accept(frame)
    }

    /// Send the disposition for the outstanding message.
    pub async fn respond(&mut self, disposition: Disposition) -> Result<()> {
        let delivery_tag = self.outstanding.ok_or_else(|| {
            ThumperError::Protocol("No delivery is awaiting a disposition".to_string())
        })?;

        self.relay
            .send(Frame::new(Bytes::new(), disposition.encode()))
            .await?;
        self.outstanding = None;

        tracing::debug!(delivery_tag, %disposition, "Disposition sent");
        Ok(())
    }

    /// Run the delivery loop until the host ends the stream.
    ///
    /// Successful messages are acked. If the handler fails, the message is
    /// rejected and the loop returns [`ThumperError::Handler`] without
    /// fetching another unit. Decode and transport failures end the loop
    /// with no disposition sent.
    pub async fn run<H: MessageHandler>(&mut self, mut handler: H) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut state = LoopState::AwaitingUnit;

        loop {
            state = match state {
                LoopState::AwaitingUnit => match self.fetch().await {
                    Ok(frame) => LoopState::Decoding(frame),
                    Err(e) => LoopState::Faulted(e),
                },

                LoopState::Decoding(frame) => match self.accept(frame) {
                    Ok(Some(message)) => LoopState::Processing(message),
                    Ok(None) => LoopState::Stopped,
                    Err(e) => LoopState::Faulted(e),
                },

                LoopState::Processing(message) => {
                    let delivery_tag = message.delivery_tag();
                    match handler.handle(message).await {
                        Ok(()) => LoopState::Responding {
                            delivery_tag,
                            disposition: Disposition::Ack,
                            failure: None,
                        },
                        Err(e) => {
                            tracing::error!(delivery_tag, error = %e, "Handler failed, rejecting message");
                            LoopState::Responding {
                                delivery_tag,
                                disposition: Disposition::Reject,
                                failure: Some(e),
                            }
                        }
                    }
                }

                LoopState::Responding {
                    delivery_tag,
                    disposition,
                    failure,
                } => match self.respond(disposition).await {
                    Err(e) => LoopState::Faulted(e),
                    Ok(()) => match failure {
                        None => {
                            summary.acked += 1;
                            LoopState::AwaitingUnit
                        }
                        Some(source) => {
                            tracing::warn!(
                                delivery_tag,
                                acked = summary.acked,
                                "Stopping delivery loop after handler failure"
                            );
                            LoopState::Faulted(ThumperError::Handler {
                                delivery_tag,
                                source,
                            })
                        }
                    },
                },

                LoopState::Stopped => {
                    tracing::info!(acked = summary.acked, "Delivery loop stopped");
                    return Ok(summary);
                }

                LoopState::Faulted(e) => {
                    if !matches!(e, ThumperError::Handler { .. }) {
                        tracing::error!(error = %e, acked = summary.acked, "Delivery loop faulted");
                    }
                    return Err(e);
                }
            };
        }
    }

    /// Request the next unit from the host.
    async fn fetch(&mut self) -> Result<Option<Frame>> {
        if let Some(tag) = self.outstanding {
            return Err(ThumperError::Protocol(format!(
                "Delivery {} has not been answered yet",
                tag
            )));
        }
        self.relay.receive().await
    }

    /// Decode a unit; a closed relay counts as end of stream.
    fn accept(&mut self, frame: Option<Frame>) -> Result<Option<Message>> {
        let frame = match frame {
            Some(frame) => frame,
            None => {
                tracing::debug!("Relay closed by host");
                return Ok(None);
            }
        };

        match envelope::decode(frame.body, &frame.context)? {
            Delivery::EndOfStream => {
                tracing::debug!("Received end-of-stream");
                Ok(None)
            }
            Delivery::Message(message) => {
                tracing::debug!(
                    delivery_tag = message.delivery_tag(),
                    queue = message.queue(),
                    routing_key = message.routing_key(),
                    "Received message"
                );
                self.outstanding = Some(message.delivery_tag());
                Ok(Some(message))
            }
        }
    }
}
