//! Device discovery.
//!
//! A discovery pass runs one time-bounded scan cycle: start scanning, let
//! advertisements accumulate, collect the adapter's peripherals, stop
//! scanning, and keep the devices whose advertised name matches exactly.
//! The whole cycle runs under the caller's deadline; an adapter that cannot
//! complete a cycle in time surfaces [`Error::DiscoveryTimeout`], while a
//! completed cycle with zero matches is an ordinary empty result.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Manager, Peripheral, PeripheralId};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

pub use btleplug::platform::Adapter;

use crate::error::{Error, Result};
use crate::util::{address_eq, create_identifier};

/// The advertised name LifeBase devices share.
pub const DEFAULT_DEVICE_NAME: &str = "LifeBaseMeter";

/// Margin reserved at the end of the deadline for stopping the scan and
/// collecting peripherals.
const SCAN_SETTLE: Duration = Duration::from_millis(500);

/// A device matched during a discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Connection identifier (MAC address on Linux/Windows, UUID on macOS).
    pub address: String,
    /// The peripheral ID for connecting.
    pub id: PeripheralId,
    /// The advertised device name.
    pub name: Option<String>,
    /// RSSI signal strength, if reported.
    pub rssi: Option<i16>,
}

/// Options for a discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    /// Advertised name a device must match exactly.
    pub device_name: String,
    /// Optional explicit allow-list of addresses. Non-empty narrows the
    /// result; it never force-includes a device that was not observed.
    pub allow_list: Vec<String>,
    /// Deadline for the whole discovery pass.
    pub deadline: Duration,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            allow_list: Vec::new(),
            deadline: Duration::from_secs(30),
        }
    }
}

impl DiscoverOptions {
    /// Create new discover options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device name to match.
    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Set the address allow-list.
    #[must_use]
    pub fn allow_list(mut self, addresses: impl IntoIterator<Item = String>) -> Self {
        self.allow_list = addresses.into_iter().collect();
        self
    }

    /// Set the deadline.
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the deadline in seconds.
    #[must_use]
    pub fn deadline_secs(mut self, secs: u64) -> Self {
        self.deadline = Duration::from_secs(secs);
        self
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters.into_iter().next().ok_or(Error::AdapterUnavailable)
}

/// Run a discovery pass with the default adapter.
///
/// Returns the matched devices in observation order. An empty list means no
/// device advertised the configured name within the deadline (not an error).
///
/// # Errors
///
/// - [`Error::AdapterUnavailable`] / [`Error::Transport`] if the radio
///   cannot be accessed
/// - [`Error::DiscoveryTimeout`] if the deadline elapses before the scan
///   cycle completes
pub async fn discover(options: &DiscoverOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter().await?;
    discover_with_adapter(&adapter, options).await
}

/// Run a discovery pass on a specific adapter.
///
/// The adapter's scan is stopped on every exit path, including timeout and
/// transport errors.
pub async fn discover_with_adapter(
    adapter: &Adapter,
    options: &DiscoverOptions,
) -> Result<Vec<DiscoveredDevice>> {
    info!(
        "Scanning for '{}' devices ({}s deadline)...",
        options.device_name,
        options.deadline.as_secs()
    );

    match timeout(options.deadline, scan_cycle(adapter, options)).await {
        Ok(Ok(devices)) => {
            info!("Scan complete. Matched {} device(s)", devices.len());
            Ok(devices)
        }
        Ok(Err(e)) => {
            stop_scan_best_effort(adapter).await;
            Err(e)
        }
        Err(_) => {
            warn!("Discovery deadline elapsed before the scan cycle completed");
            stop_scan_best_effort(adapter).await;
            Err(Error::DiscoveryTimeout {
                duration: options.deadline,
            })
        }
    }
}

/// One scan cycle: start, accumulate, collect, stop, filter.
async fn scan_cycle(adapter: &Adapter, options: &DiscoverOptions) -> Result<Vec<DiscoveredDevice>> {
    adapter.start_scan(ScanFilter::default()).await?;

    let window = options.deadline.saturating_sub(SCAN_SETTLE);
    sleep(window).await;

    let peripherals = adapter.peripherals().await?;
    adapter.stop_scan().await?;

    let mut discovered: Vec<DiscoveredDevice> = Vec::new();
    for peripheral in peripherals {
        let Some(properties) = peripheral.properties().await? else {
            continue;
        };

        let address = create_identifier(&properties.address.to_string(), &peripheral.id());
        let name = properties.local_name.clone();

        if !accepts(name.as_deref(), &address, options) {
            continue;
        }
        if discovered.iter().any(|d| address_eq(&d.address, &address)) {
            continue;
        }

        debug!("Matched device {} ({:?})", address, name);
        discovered.push(DiscoveredDevice {
            address,
            id: peripheral.id(),
            name,
            rssi: properties.rssi,
        });
    }

    Ok(discovered)
}

async fn stop_scan_best_effort(adapter: &Adapter) {
    if let Err(e) = adapter.stop_scan().await {
        debug!("Failed to stop scan during cleanup: {}", e);
    }
}

/// Whether an observed advertisement passes the name filter and allow-list.
///
/// The name must match exactly; there is no substring or fuzzy matching.
/// A non-empty allow-list narrows the result to listed addresses.
fn accepts(name: Option<&str>, address: &str, options: &DiscoverOptions) -> bool {
    if name != Some(options.device_name.as_str()) {
        return false;
    }
    options.allow_list.is_empty()
        || options
            .allow_list
            .iter()
            .any(|allowed| address_eq(allowed, address))
}

/// Search the adapter's known peripherals for one matching the address.
pub async fn find_peripheral_by_address(
    adapter: &Adapter,
    address: &str,
) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        if let Ok(Some(properties)) = peripheral.properties().await {
            let identifier =
                create_identifier(&properties.address.to_string(), &peripheral.id());
            if address_eq(&identifier, address) {
                return Ok(Some(peripheral));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> DiscoverOptions {
        DiscoverOptions::new().deadline_secs(5)
    }

    #[test]
    fn test_accepts_exact_name_only() {
        let opts = options();
        assert!(accepts(Some("LifeBaseMeter"), "AA:01", &opts));
        assert!(!accepts(Some("Other"), "BB:02", &opts));
        assert!(!accepts(Some("LifeBaseMeter2"), "AA:01", &opts));
        assert!(!accepts(Some("lifebasemeter"), "AA:01", &opts));
        assert!(!accepts(None, "AA:01", &opts));
    }

    #[test]
    fn test_accepts_discovery_scenario() {
        // Advertisements ["LifeBaseMeter", "Other"] at ["AA:01", "BB:02"]
        // must narrow to {"AA:01"}.
        let opts = options();
        let observed = [(Some("LifeBaseMeter"), "AA:01"), (Some("Other"), "BB:02")];

        let matched: Vec<&str> = observed
            .iter()
            .filter(|(name, address)| accepts(*name, address, &opts))
            .map(|(_, address)| *address)
            .collect();

        assert_eq!(matched, vec!["AA:01"]);
    }

    #[test]
    fn test_allow_list_narrows() {
        let opts = options().allow_list(["AA:01".to_string()]);
        assert!(accepts(Some("LifeBaseMeter"), "AA:01", &opts));
        assert!(!accepts(Some("LifeBaseMeter"), "BB:02", &opts));
    }

    #[test]
    fn test_allow_list_is_case_and_separator_insensitive() {
        let opts = options().allow_list(["aa:bb:cc:dd:ee:ff".to_string()]);
        assert!(accepts(Some("LifeBaseMeter"), "AA:BB:CC:DD:EE:FF", &opts));
        assert!(accepts(Some("LifeBaseMeter"), "AABBCCDDEEFF", &opts));
    }

    #[test]
    fn test_allow_list_never_force_includes() {
        // An allow-listed address that does not advertise the configured
        // name stays excluded; the allow-list only narrows.
        let opts = options().allow_list(["BB:02".to_string()]);
        assert!(!accepts(Some("Other"), "BB:02", &opts));
        assert!(!accepts(None, "BB:02", &opts));
    }

    #[test]
    fn test_options_builder() {
        let opts = DiscoverOptions::new()
            .device_name("GreenhouseMeter")
            .deadline_secs(7)
            .allow_list(["AA:01".to_string(), "BB:02".to_string()]);

        assert_eq!(opts.device_name, "GreenhouseMeter");
        assert_eq!(opts.deadline, Duration::from_secs(7));
        assert_eq!(opts.allow_list.len(), 2);
    }
}
