//! Zenoh bridge for EtherNet/IP.
//!
//! Connects to a controller, enumerates its tags and serves read/write
//! requests arriving on Zenoh until Ctrl+C or SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use zenoh_bridge_ethernetip::router::{self, Router};
use zenoh_bridge_ethernetip::{BridgeContext, DeviceSession, EthernetIpBridgeConfig, TagDirectory};
use zensight_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = BridgeArgs::parse_with_default("ethernetip.json5");

    // Load configuration
    let config = EthernetIpBridgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Logging, Zenoh and status publishing
    let runner = BridgeRunner::new_with_args("ethernetip", config, Some(&args))
        .await
        .context("Failed to start bridge")?;
    let mut runner = runner.with_status_publishing();
    let eip = runner.config().ethernetip.clone();

    // Device session and tag directory; both are fatal on failure
    tracing::info!(endpoint = %eip.endpoint(), "Connecting to EtherNet/IP device");
    let device = match DeviceSession::connect(&eip.endpoint_ip, eip.endpoint_tcp_port, eip.timeout())
        .await
    {
        Ok(device) => device,
        Err(e) => {
            let context = format!("Failed to connect to {}", eip.endpoint());
            runner.abort(format!("{}: {}", context, e)).await;
            return Err(anyhow::Error::new(e).context(context));
        }
    };
    let directory = match TagDirectory::enumerate(&device).await {
        Ok(directory) => directory,
        Err(e) => {
            let context = format!("Failed to enumerate tags on {}", eip.endpoint());
            runner.abort(format!("{}: {}", context, e)).await;
            device.close().await;
            return Err(anyhow::Error::new(e).context(context));
        }
    };

    let mut metadata = runner.config().status_metadata();
    if let Some(fields) = metadata.as_object_mut() {
        fields.insert("tags".to_string(), directory.len().into());
    }

    // Request subscription; fatal like the device
    let (queue, jobs) = router::job_queue(eip.queue_capacity);
    let request_router = Router::new(eip.key_prefix.clone(), queue);
    let subscriber = match request_router.listen(runner.session()).await {
        Ok(subscriber) => subscriber,
        Err(e) => {
            runner.abort(&e).await;
            device.close().await;
            return Err(anyhow::Error::new(e).context("Failed to subscribe to requests"));
        }
    };

    // Worker pool
    let ctx = BridgeContext::new(device.clone(), Arc::new(directory));
    let publisher = runner.publisher();
    for id in 0..eip.workers {
        runner.spawn(router::run_worker(
            id,
            ctx.clone(),
            jobs.clone(),
            publisher.clone(),
        ));
    }

    // Request listener
    runner.spawn(router::run_listener(subscriber, request_router));

    tracing::info!(
        prefix = %eip.key_prefix,
        workers = eip.workers,
        "EtherNet/IP bridge ready"
    );

    // Run until Ctrl+C (handles shutdown gracefully)
    runner.run_with_metadata(metadata).await?;

    device.close().await;
    Ok(())
}
