//! Device connection lifecycle.
//!
//! A [`DeviceSession`] owns exactly one connection to one device. Every
//! operation on the session shares the deadline budget established at open
//! time; an operation still pending when the deadline elapses fails with
//! [`Error::SessionTimeout`] and the connection is torn down. Wrap the
//! session in a [`crate::guard::SessionGuard`] to guarantee disconnection
//! on every exit path.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{self as ble, CharPropFlags, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use lifebase_types::{CharProperty, Characteristic, Descriptor, Service};

use crate::error::{ConnectReason, Error, Result};
use crate::scan;
use crate::traits::GattSession;
use crate::util::{create_identifier, format_peripheral_id};

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline budget shared by connection establishment and every
    /// subsequent operation on the session.
    pub deadline: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    /// Create a new session config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deadline budget.
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the deadline budget in seconds.
    #[must_use]
    pub fn deadline_secs(mut self, secs: u64) -> Self {
        self.deadline = Duration::from_secs(secs);
        self
    }
}

/// One open connection to one LifeBase device.
///
/// This struct intentionally does not implement `Clone`: a session
/// represents an active connection, and cloning would create ambiguity
/// about who closes it. Call [`close`](GattSession::close) (or hold the
/// session in a [`crate::guard::SessionGuard`]) before dropping it.
pub struct DeviceSession {
    /// Kept alive for the lifetime of the peripheral connection; the
    /// peripheral may hold internal references to the adapter.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    address: String,
    name: Option<String>,
    deadline: Instant,
    budget: Duration,
    services: Vec<Service>,
    characteristics: HashMap<Uuid, ble::Characteristic>,
    descriptors: HashMap<(Uuid, Uuid), ble::Descriptor>,
    closed: AtomicBool,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("services", &self.services.len())
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Open a session to a device by address.
    ///
    /// Acquires the default adapter, locates the peripheral among the
    /// adapter's known devices, and connects. The peripheral must have been
    /// observed by a prior discovery pass on this adapter.
    pub async fn open(address: &str, config: SessionConfig) -> Result<Self> {
        check_budget(&config)?;
        let adapter = scan::get_adapter().await?;
        Self::open_with_adapter(adapter, address, config).await
    }

    /// Open a session on a specific adapter, typically the one a discovery
    /// pass just ran on.
    pub async fn open_with_adapter(
        adapter: Adapter,
        address: &str,
        config: SessionConfig,
    ) -> Result<Self> {
        check_budget(&config)?;
        let deadline = Instant::now() + config.deadline;

        let peripheral =
            match timeout_at(deadline, scan::find_peripheral_by_address(&adapter, address)).await {
                Ok(Ok(Some(peripheral))) => peripheral,
                Ok(Ok(None)) => return Err(Error::connection(address, ConnectReason::NotFound)),
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(Error::session_timeout("locate peripheral", config.deadline)),
            };

        Self::establish(adapter, peripheral, config, deadline).await
    }

    /// Open a session over an already-located peripheral.
    pub async fn from_peripheral(
        adapter: Adapter,
        peripheral: Peripheral,
        config: SessionConfig,
    ) -> Result<Self> {
        check_budget(&config)?;
        let deadline = Instant::now() + config.deadline;
        Self::establish(adapter, peripheral, config, deadline).await
    }

    async fn establish(
        adapter: Adapter,
        peripheral: Peripheral,
        config: SessionConfig,
        deadline: Instant,
    ) -> Result<Self> {
        let properties = match timeout_at(deadline, peripheral.properties()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::session_timeout(
                    "read peripheral properties",
                    config.deadline,
                ));
            }
        };

        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_else(|| format_peripheral_id(&peripheral.id()));
        let name = properties.and_then(|p| p.local_name);

        info!("Connecting to {}...", address);
        match timeout_at(deadline, peripheral.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(Error::connection(
                    &address,
                    ConnectReason::Ble(e.to_string()),
                ));
            }
            Err(_) => {
                let _ = peripheral.disconnect().await;
                return Err(Error::session_timeout("connect", config.deadline));
            }
        }

        debug!("Discovering services on {}...", address);
        let discovery = match timeout_at(deadline, peripheral.discover_services()).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::session_timeout("discover services", config.deadline)),
        };
        if let Err(e) = discovery {
            let _ = peripheral.disconnect().await;
            return Err(e);
        }

        let (services, characteristics, descriptors) = snapshot_tree(&peripheral);
        debug!(
            "Captured {} service(s), {} characteristic(s) on {}",
            services.len(),
            characteristics.len(),
            address
        );

        Ok(Self {
            adapter,
            peripheral,
            address,
            name,
            deadline,
            budget: config.deadline,
            services,
            characteristics,
            descriptors,
            closed: AtomicBool::new(false),
        })
    }

    /// Check if the device is still connected (queries BLE stack state).
    pub async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    /// Run a BLE operation under the session deadline.
    ///
    /// On expiry the session is torn down before the error is returned, so
    /// no connection outlives its deadline.
    async fn guarded<T, F>(&self, operation: &str, attribute: Uuid, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, btleplug::Error>> + Send,
    {
        match timeout_at(self.deadline, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(btleplug::Error::NotConnected)) => {
                Err(Error::connection(&self.address, ConnectReason::Dropped))
            }
            Ok(Err(e)) => Err(Error::read(attribute, e.to_string())),
            Err(_) => {
                self.teardown().await;
                Err(Error::session_timeout(operation, self.budget))
            }
        }
    }

    async fn teardown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.peripheral.disconnect().await {
                debug!("Failed to disconnect {} during teardown: {}", self.address, e);
            }
        }
    }
}

#[async_trait]
impl GattSession for DeviceSession {
    fn address(&self) -> &str {
        &self.address
    }

    fn device_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn services(&self) -> &[Service] {
        &self.services
    }

    async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>> {
        let characteristic = self
            .characteristics
            .get(&uuid)
            .ok_or(Error::AttributeNotFound { uuid })?;
        self.guarded(
            &format!("read characteristic {}", uuid),
            uuid,
            self.peripheral.read(characteristic),
        )
        .await
    }

    async fn read_descriptor(&self, characteristic: Uuid, descriptor: Uuid) -> Result<Vec<u8>> {
        let target = self
            .descriptors
            .get(&(characteristic, descriptor))
            .ok_or(Error::AttributeNotFound { uuid: descriptor })?;
        self.guarded(
            &format!("read descriptor {}", descriptor),
            descriptor,
            self.peripheral.read_descriptor(target),
        )
        .await
    }

    async fn close(&self) -> Result<()> {
        info!("Disconnecting from {}...", self.address);
        self.closed.store(true, Ordering::SeqCst);
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            warn!(
                "DeviceSession for {} dropped without close; connection may leak",
                self.address
            );
        }
    }
}

fn check_budget(config: &SessionConfig) -> Result<()> {
    if config.deadline.is_zero() {
        return Err(Error::session_timeout("open", config.deadline));
    }
    Ok(())
}

/// Convert the peripheral's discovered services into the session's
/// attribute tree, assigning sequential enumeration ordinals as handles.
///
/// The platform BLE stack does not surface ATT handles; ordinals keep the
/// service/characteristic/descriptor numbering stable for one connection.
fn snapshot_tree(
    peripheral: &Peripheral,
) -> (
    Vec<Service>,
    HashMap<Uuid, ble::Characteristic>,
    HashMap<(Uuid, Uuid), ble::Descriptor>,
) {
    let mut services = Vec::new();
    let mut characteristics = HashMap::new();
    let mut descriptors = HashMap::new();
    let mut next_handle: u16 = 0;
    let mut alloc = move || {
        next_handle += 1;
        next_handle
    };

    for service in peripheral.services() {
        let service_handle = alloc();
        let mut chars = Vec::new();

        for characteristic in &service.characteristics {
            let char_handle = alloc();
            let mut descs = Vec::new();

            for descriptor in &characteristic.descriptors {
                descs.push(Descriptor {
                    uuid: descriptor.uuid,
                    handle: alloc(),
                    value: None,
                });
                descriptors.insert(
                    (characteristic.uuid, descriptor.uuid),
                    descriptor.clone(),
                );
            }

            chars.push(Characteristic {
                uuid: characteristic.uuid,
                handle: char_handle,
                properties: properties_from_flags(characteristic.properties),
                description: None,
                value: None,
                descriptors: descs,
            });
            characteristics.insert(characteristic.uuid, characteristic.clone());
        }

        services.push(Service {
            uuid: service.uuid,
            handle: service_handle,
            description: None,
            characteristics: chars,
        });
    }

    (services, characteristics, descriptors)
}

/// Convert the BLE stack's property flags into model capability flags.
fn properties_from_flags(flags: CharPropFlags) -> Vec<CharProperty> {
    const MAPPING: [(CharPropFlags, CharProperty); 8] = [
        (CharPropFlags::BROADCAST, CharProperty::Broadcast),
        (CharPropFlags::READ, CharProperty::Read),
        (
            CharPropFlags::WRITE_WITHOUT_RESPONSE,
            CharProperty::WriteWithoutResponse,
        ),
        (CharPropFlags::WRITE, CharProperty::Write),
        (CharPropFlags::NOTIFY, CharProperty::Notify),
        (CharPropFlags::INDICATE, CharProperty::Indicate),
        (
            CharPropFlags::AUTHENTICATED_SIGNED_WRITES,
            CharProperty::AuthenticatedSignedWrites,
        ),
        (
            CharPropFlags::EXTENDED_PROPERTIES,
            CharProperty::ExtendedProperties,
        ),
    ];

    MAPPING
        .into_iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, property)| property)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_with_zero_deadline_times_out_immediately() {
        // Must fail before touching the adapter, leaving nothing to leak.
        let result = DeviceSession::open(
            "AA:BB:CC:DD:EE:FF",
            SessionConfig::new().deadline(Duration::ZERO),
        )
        .await;

        match result {
            Err(Error::SessionTimeout { operation, budget }) => {
                assert_eq!(operation, "open");
                assert_eq!(budget, Duration::ZERO);
            }
            other => panic!("expected SessionTimeout, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new().deadline_secs(5);
        assert_eq!(config.deadline, Duration::from_secs(5));

        let config = SessionConfig::default();
        assert_eq!(config.deadline, Duration::from_secs(30));
    }

    #[test]
    fn test_properties_from_flags() {
        let props = properties_from_flags(CharPropFlags::READ | CharPropFlags::NOTIFY);
        assert_eq!(props, vec![CharProperty::Read, CharProperty::Notify]);

        assert!(properties_from_flags(CharPropFlags::empty()).is_empty());

        let props = properties_from_flags(CharPropFlags::WRITE_WITHOUT_RESPONSE);
        assert_eq!(props, vec![CharProperty::WriteWithoutResponse]);
    }
}
