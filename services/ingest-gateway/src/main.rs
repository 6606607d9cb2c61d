use anyhow::Context;
use ingest_common::{init_tracing, shutdown_signal};
use ingest_gateway::{Gateway, GatewayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guards = init_tracing("ingest-gateway");

    let config = GatewayConfig::from_env();
    let gateway = Gateway::new(config).context("prepare upload directory")?;

    gateway.serve(shutdown_signal()).await
}
