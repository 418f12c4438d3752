//! Interconnect command implementation.

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use lifebase_core::guard::SessionGuard;
use lifebase_core::scan::Adapter;
use lifebase_core::{DeviceSession, collect_measurements, publish_measurements, scan};
use lifebase_mqtt::MqttPublisher;

use crate::commands::RunContext;
use crate::format::fatal_message;

/// Scan LifeBase devices and forward every measurement to the MQTT broker.
pub async fn cmd_interconnect(
    ctx: RunContext,
    hostname: Option<String>,
    port: Option<u16>,
    services: Vec<Uuid>,
    characteristics: Vec<Uuid>,
) -> Result<()> {
    let ctx = ctx.with_filters(&services, &characteristics, &[]);

    let mut mqtt = ctx.config.mqtt.clone();
    if let Some(host) = hostname {
        mqtt.broker = match port {
            Some(port) => format!("mqtt://{}:{}", host, port),
            None => format!("mqtt://{}", host),
        };
    }

    let publisher = MqttPublisher::connect(&mqtt)
        .with_context(|| format!("Failed to set up MQTT client for {}", mqtt.broker))?;

    let adapter = scan::get_adapter()
        .await
        .context("Failed to access the Bluetooth adapter")?;
    let devices = scan::discover_with_adapter(&adapter, &ctx.discover)
        .await
        .map_err(|e| anyhow::anyhow!("{}", fatal_message(&e)))?;

    for device in devices {
        println!("Scanning {}", device.address);
        match interconnect_one(&ctx, adapter.clone(), &device.address, &publisher).await {
            Ok(published) => {
                info!("{}: published {} measurement(s)", device.address, published);
            }
            Err(e) => println!("{}", fatal_message(&e)),
        }
    }

    publisher.disconnect().await;
    Ok(())
}

async fn interconnect_one(
    ctx: &RunContext,
    adapter: Adapter,
    address: &str,
    publisher: &MqttPublisher,
) -> lifebase_core::Result<usize> {
    let session =
        DeviceSession::open_with_adapter(adapter, address, ctx.session.clone()).await?;
    let guard = SessionGuard::new(session);

    let measurements = collect_measurements(&*guard, &ctx.collect).await?;
    let published = publish_measurements(publisher, &ctx.device_label, &measurements).await?;

    guard.close().await?;
    Ok(published)
}
