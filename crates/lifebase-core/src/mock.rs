//! Mock session implementation for testing.
//!
//! [`MockSession`] implements [`GattSession`] over a canned attribute tree,
//! so walker, resolver, and pipeline logic can be exercised without BLE
//! hardware.
//!
//! # Features
//!
//! - **Failure injection**: mark individual attributes to fail their reads,
//!   either as absorbable read errors or as device-fatal errors
//! - **Read log**: every attempted read is recorded, so tests can assert
//!   that an attribute was never touched

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use lifebase_types::Service;

use crate::error::{ConnectReason, Error, Result};
use crate::traits::GattSession;

/// A mock GATT session for testing.
pub struct MockSession {
    address: String,
    name: Option<String>,
    services: Vec<Service>,
    char_values: HashMap<Uuid, Vec<u8>>,
    descriptor_values: HashMap<(Uuid, Uuid), Vec<u8>>,
    failing_reads: HashSet<Uuid>,
    fatal_reads: HashSet<Uuid>,
    closed: AtomicBool,
    reads: Mutex<Vec<Uuid>>,
}

impl std::fmt::Debug for MockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSession")
            .field("address", &self.address)
            .field("services", &self.services.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockSession {
    /// Start building a mock session for the given address.
    pub fn builder(address: impl Into<String>) -> MockSessionBuilder {
        MockSessionBuilder {
            address: address.into(),
            name: Some(crate::scan::DEFAULT_DEVICE_NAME.to_string()),
            services: Vec::new(),
            char_values: HashMap::new(),
            descriptor_values: HashMap::new(),
            failing_reads: HashSet::new(),
            fatal_reads: HashSet::new(),
        }
    }

    /// UUIDs of every read attempted so far, in order.
    pub fn reads(&self) -> Vec<Uuid> {
        self.reads.lock().expect("reads lock poisoned").clone()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record_read(&self, uuid: Uuid) -> Result<()> {
        self.reads.lock().expect("reads lock poisoned").push(uuid);

        if self.fatal_reads.contains(&uuid) {
            return Err(Error::connection(
                self.address.clone(),
                ConnectReason::Dropped,
            ));
        }
        if self.failing_reads.contains(&uuid) {
            return Err(Error::read(uuid, "injected read failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl GattSession for MockSession {
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
        self.record_read(uuid)?;
        self.char_values
            .get(&uuid)
            .cloned()
            .ok_or(Error::AttributeNotFound { uuid })
    }

    async fn read_descriptor(&self, characteristic: Uuid, descriptor: Uuid) -> Result<Vec<u8>> {
        self.record_read(descriptor)?;
        self.descriptor_values
            .get(&(characteristic, descriptor))
            .cloned()
            .ok_or(Error::AttributeNotFound { uuid: descriptor })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Builder for [`MockSession`].
pub struct MockSessionBuilder {
    address: String,
    name: Option<String>,
    services: Vec<Service>,
    char_values: HashMap<Uuid, Vec<u8>>,
    descriptor_values: HashMap<(Uuid, Uuid), Vec<u8>>,
    failing_reads: HashSet<Uuid>,
    fatal_reads: HashSet<Uuid>,
}

impl MockSessionBuilder {
    /// Set the advertised device name (`None` for an anonymous device).
    #[must_use]
    pub fn name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(str::to_string);
        self
    }

    /// Append a service to the attribute tree, preserving insertion order.
    #[must_use]
    pub fn service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    /// Provide the bytes a characteristic read returns.
    #[must_use]
    pub fn characteristic_value(mut self, uuid: Uuid, value: impl Into<Vec<u8>>) -> Self {
        self.char_values.insert(uuid, value.into());
        self
    }

    /// Provide the bytes a descriptor read returns.
    #[must_use]
    pub fn descriptor_value(
        mut self,
        characteristic: Uuid,
        descriptor: Uuid,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.descriptor_values
            .insert((characteristic, descriptor), value.into());
        self
    }

    /// Make reads of this attribute fail with an absorbable read error.
    #[must_use]
    pub fn failing_read(mut self, uuid: Uuid) -> Self {
        self.failing_reads.insert(uuid);
        self
    }

    /// Make reads of this attribute fail with a device-fatal error, as if
    /// the link dropped mid-walk.
    #[must_use]
    pub fn fatal_read(mut self, uuid: Uuid) -> Self {
        self.fatal_reads.insert(uuid);
        self
    }

    /// Finish building the mock session.
    pub fn build(self) -> MockSession {
        MockSession {
            address: self.address,
            name: self.name,
            services: self.services,
            char_values: self.char_values,
            descriptor_values: self.descriptor_values,
            failing_reads: self.failing_reads,
            fatal_reads: self.fatal_reads,
            closed: AtomicBool::new(false),
            reads: Mutex::new(Vec::new()),
        }
    }
}
