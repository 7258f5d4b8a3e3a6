//! Consumer worker: logs every delivery and acknowledges it.
//!
//! The host runtime starts this binary and feeds it deliveries over the relay
//! named by `RR_RELAY` (stdin/stdout by default). Logs go to stderr.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example consumer
//! ```

use thumper_client::{Config, Message, WorkerBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    thumper_client::logging::init();

    let config = Config::from_env()?;
    let mut worker = WorkerBuilder::from_config(&config).connect().await?;

    let summary = worker
        .run(|msg: Message| async move {
            tracing::info!(
                queue = msg.queue(),
                routing_key = msg.routing_key(),
                delivery_tag = msg.delivery_tag(),
                body = %String::from_utf8_lossy(msg.body()),
                "Received"
            );
            Ok::<(), thumper_client::BoxError>(())
        })
        .await?;

    tracing::info!(acked = summary.acked, "Consumer finished");
    Ok(())
}
