//! Trait abstractions at the pipeline's seams.
//!
//! [`GattSession`] abstracts one open connection's attribute tree and reads,
//! implemented by the real [`crate::session::DeviceSession`] and by
//! [`crate::mock::MockSession`] for tests. [`Publisher`] is the outbound
//! seam: the pipeline hands it (topic, payload) pairs and stays agnostic of
//! the broker transport.

use async_trait::async_trait;
use uuid::Uuid;

use lifebase_types::Service;

use crate::error::Result;

/// One open connection to one device, for the duration of a walk.
///
/// The attribute tree is captured when the session opens; [`services`] is
/// structure only, values arrive through the read methods. All operations
/// share the deadline budget established at open time.
///
/// [`services`]: GattSession::services
#[async_trait]
pub trait GattSession: Send + Sync {
    /// Device address or identifier this session is connected to.
    fn address(&self) -> &str;

    /// Advertised device name, if known.
    fn device_name(&self) -> Option<&str>;

    /// The attribute tree in enumeration order, without values.
    fn services(&self) -> &[Service];

    /// Read a characteristic value by UUID.
    async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>>;

    /// Read a descriptor value, addressed by its characteristic and its own UUID.
    async fn read_descriptor(&self, characteristic: Uuid, descriptor: Uuid) -> Result<Vec<u8>>;

    /// Close the session, disconnecting from the device.
    async fn close(&self) -> Result<()>;
}

/// Outbound sink for extracted measurements.
///
/// Implementations own connection and transport concerns; the pipeline only
/// ever calls [`publish`](Publisher::publish) with a finished topic path and
/// serialized payload.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish one payload under the given topic.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}
