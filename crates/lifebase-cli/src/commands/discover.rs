//! Discover command implementation.

use anyhow::Result;

use lifebase_core::scan;

use crate::commands::RunContext;
use crate::format::fatal_message;

/// Scan the air for LifeBase devices and list them.
pub async fn cmd_discover(ctx: &RunContext) -> Result<()> {
    match scan::discover(&ctx.discover).await {
        Ok(devices) => {
            for device in devices {
                println!("{} {}", device.address, ctx.discover.device_name);
            }
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{}", fatal_message(&e))),
    }
}
