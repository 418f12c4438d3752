//! Scan command implementation.

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use lifebase_core::guard::SessionGuard;
use lifebase_core::scan::Adapter;
use lifebase_core::{DeviceSession, collect_measurements, collect_tree, scan};

use crate::commands::RunContext;
use crate::format::{fatal_message, format_measurements, format_tree};

/// Scan LifeBase devices and print their measurements, or with `ble_view`
/// the raw attribute tree.
///
/// Device-level failures print one message and processing continues with
/// the next device.
pub async fn cmd_scan(
    ctx: RunContext,
    ble_view: bool,
    services: Vec<Uuid>,
    characteristics: Vec<Uuid>,
    descriptors: Vec<Uuid>,
) -> Result<()> {
    let ctx = ctx.with_filters(&services, &characteristics, &descriptors);

    let adapter = scan::get_adapter()
        .await
        .context("Failed to access the Bluetooth adapter")?;
    let devices = scan::discover_with_adapter(&adapter, &ctx.discover)
        .await
        .map_err(|e| anyhow::anyhow!("{}", fatal_message(&e)))?;

    for device in devices {
        println!("Scanning {}", device.address);
        if let Err(e) = scan_one(&ctx, adapter.clone(), &device.address, ble_view).await {
            println!("{}", fatal_message(&e));
        }
    }

    Ok(())
}

async fn scan_one(
    ctx: &RunContext,
    adapter: Adapter,
    address: &str,
    ble_view: bool,
) -> lifebase_core::Result<()> {
    let session =
        DeviceSession::open_with_adapter(adapter, address, ctx.session.clone()).await?;
    let guard = SessionGuard::new(session);

    if ble_view {
        let tree = collect_tree(&*guard, &ctx.collect, true).await?;
        print!("{}", format_tree(&tree));
    } else {
        let measurements = collect_measurements(&*guard, &ctx.collect).await?;
        print!("{}", format_measurements(&measurements));
        info!("{}: {} measurement(s)", address, measurements.len());
    }

    guard.close().await
}
