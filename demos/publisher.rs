//! Publisher: declares a small topology and publishes one message.
//!
//! Management calls go to the host runtime at `RR_RPC`:
//!
//! ```sh
//! RR_RPC=tcp://127.0.0.1:6001 APP=demo cargo run --example publisher
//! ```

use std::collections::HashMap;

use thumper_client::{Config, FramedRpc, ManagementClient, Topology};

const TOPOLOGY: &str = r#"{
    "queue": [{ "name": "${APP:-demo}-jobs", "durable": true }],
    "exchange": [{ "name": "${APP:-demo}", "kind": "direct", "durable": true }],
    "queueBind": [{ "queue": "${APP:-demo}-jobs", "exchange": "${APP:-demo}", "key": "jobs" }]
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    thumper_client::logging::init();

    let config = Config::from_env()?;
    let rpc = FramedRpc::connect(config.rpc_address()?).await?;
    let client = ManagementClient::new(rpc);

    let mut topology = Topology::from_json_str(TOPOLOGY)?;
    topology.expand_env(|key| std::env::var(key).ok());
    topology.declare(&client).await?;

    let exchange = &topology.exchange[0].name;
    let mut headers = HashMap::new();
    headers.insert("x-source", "publisher-demo");

    client
        .publish_with_headers(exchange, "jobs", "text/plain", "hello", &headers)
        .await?;

    tracing::info!(exchange = %exchange, "Message published");
    Ok(())
}
