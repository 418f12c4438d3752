//! Attribute-tree traversal.
//!
//! The walker applies three independent UUID filter sets, one per attribute
//! level. An empty set never excludes anything; a non-empty set excludes
//! every UUID not listed. A fixed set of service UUIDs is ignored regardless
//! of filters. Traversal preserves enumeration order.
//!
//! Value reads are fault-isolated per attribute: a failed read records an
//! absent value and the walk continues, so a device with one misbehaving
//! characteristic still yields readings for all others. Only device-fatal
//! errors ([`Error::SessionTimeout`], [`Error::Connection`]) abort the walk.

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use lifebase_types::{Service, uuid::GENERIC_ATTRIBUTE_SERVICE};

use crate::error::Result;
use crate::traits::GattSession;

/// Filter sets applied during a walk.
#[derive(Debug, Clone)]
pub struct WalkFilter {
    /// Service UUIDs of interest; empty means all services.
    pub services: HashSet<Uuid>,
    /// Characteristic UUIDs of interest; empty means all characteristics.
    pub characteristics: HashSet<Uuid>,
    /// Descriptor UUIDs of interest; empty means all descriptors.
    pub descriptors: HashSet<Uuid>,
    /// Service UUIDs always excluded, regardless of the filter sets.
    pub ignored_services: HashSet<Uuid>,
}

impl Default for WalkFilter {
    fn default() -> Self {
        Self {
            services: HashSet::new(),
            characteristics: HashSet::new(),
            descriptors: HashSet::new(),
            ignored_services: HashSet::from([GENERIC_ATTRIBUTE_SERVICE]),
        }
    }
}

impl WalkFilter {
    /// Create a new filter with empty sets and the default ignore list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service filter.
    #[must_use]
    pub fn services(mut self, uuids: impl IntoIterator<Item = Uuid>) -> Self {
        self.services = uuids.into_iter().collect();
        self
    }

    /// Set the characteristic filter.
    #[must_use]
    pub fn characteristics(mut self, uuids: impl IntoIterator<Item = Uuid>) -> Self {
        self.characteristics = uuids.into_iter().collect();
        self
    }

    /// Set the descriptor filter.
    #[must_use]
    pub fn descriptors(mut self, uuids: impl IntoIterator<Item = Uuid>) -> Self {
        self.descriptors = uuids.into_iter().collect();
        self
    }

    /// Add a service UUID to the ignore list.
    #[must_use]
    pub fn ignore_service(mut self, uuid: Uuid) -> Self {
        self.ignored_services.insert(uuid);
        self
    }
}

/// Whether a UUID passes one filter set: empty never excludes, non-empty
/// excludes every UUID not listed.
fn passes(filter: &HashSet<Uuid>, uuid: Uuid) -> bool {
    filter.is_empty() || filter.contains(&uuid)
}

/// Traverse the session's attribute tree, applying `filter` and optionally
/// reading values.
///
/// Returns the filtered tree in enumeration order. With `want_values`, each
/// readable characteristic and each included descriptor is read; a failed
/// read is recorded as an absent value. Characteristics without read
/// capability are never read.
///
/// # Errors
///
/// Only device-fatal errors propagate; per-attribute read failures are
/// absorbed.
pub async fn walk<S>(session: &S, filter: &WalkFilter, want_values: bool) -> Result<Vec<Service>>
where
    S: GattSession + ?Sized,
{
    let mut services = Vec::new();

    for service in session.services() {
        if filter.ignored_services.contains(&service.uuid) {
            continue;
        }
        if !passes(&filter.services, service.uuid) {
            continue;
        }

        let mut out = Service {
            uuid: service.uuid,
            handle: service.handle,
            description: service.description.clone(),
            characteristics: Vec::new(),
        };

        for characteristic in &service.characteristics {
            if !passes(&filter.characteristics, characteristic.uuid) {
                continue;
            }

            let mut out_char = characteristic.clone();
            out_char.value = None;
            out_char.descriptors = Vec::new();

            if want_values && characteristic.is_readable() {
                out_char.value = read_characteristic_or_absent(session, characteristic.uuid).await?;
            }

            for descriptor in &characteristic.descriptors {
                if !passes(&filter.descriptors, descriptor.uuid) {
                    continue;
                }

                let mut out_desc = descriptor.clone();
                out_desc.value = if want_values {
                    read_descriptor_or_absent(session, characteristic.uuid, descriptor.uuid).await?
                } else {
                    None
                };
                out_char.descriptors.push(out_desc);
            }

            out.characteristics.push(out_char);
        }

        services.push(out);
    }

    Ok(services)
}

async fn read_characteristic_or_absent<S>(session: &S, uuid: Uuid) -> Result<Option<Vec<u8>>>
where
    S: GattSession + ?Sized,
{
    match session.read_characteristic(uuid).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.is_device_fatal() => Err(e),
        Err(e) => {
            debug!(%uuid, error = %e, "characteristic read failed, recording absent value");
            Ok(None)
        }
    }
}

async fn read_descriptor_or_absent<S>(
    session: &S,
    characteristic: Uuid,
    descriptor: Uuid,
) -> Result<Option<Vec<u8>>>
where
    S: GattSession + ?Sized,
{
    match session.read_descriptor(characteristic, descriptor).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.is_device_fatal() => Err(e),
        Err(e) => {
            debug!(%descriptor, error = %e, "descriptor read failed, recording absent value");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use lifebase_types::{CharProperty, Characteristic, Descriptor};
    use uuid::uuid;

    use crate::mock::MockSession;

    use super::*;

    const SVC_ENV: Uuid = uuid!("54010000-e337-46ca-9690-cdd6d309e7b1");
    const SVC_LIGHT: Uuid = uuid!("54020000-e337-46ca-9690-cdd6d309e7b1");
    const CHAR_MOISTURE: Uuid = uuid!("54010001-e337-46ca-9690-cdd6d309e7b1");
    const CHAR_MODE: Uuid = uuid!("54010002-e337-46ca-9690-cdd6d309e7b1");
    const CHAR_BROKEN: Uuid = uuid!("54010003-e337-46ca-9690-cdd6d309e7b1");
    const CHAR_LUX: Uuid = uuid!("54020001-e337-46ca-9690-cdd6d309e7b1");
    const DESC_LABEL: Uuid = uuid!("00002901-0000-1000-8000-00805f9b34fb");
    const DESC_CCCD: Uuid = uuid!("00002902-0000-1000-8000-00805f9b34fb");

    fn readable(uuid: Uuid, handle: u16, descriptors: Vec<Descriptor>) -> Characteristic {
        Characteristic {
            uuid,
            handle,
            properties: vec![CharProperty::Read],
            description: None,
            value: None,
            descriptors,
        }
    }

    fn descriptor(uuid: Uuid, handle: u16) -> Descriptor {
        Descriptor {
            uuid,
            handle,
            value: None,
        }
    }

    /// Tree: generic-attribute service (ignored), an environment service
    /// with three characteristics, and a light service with one.
    fn session() -> MockSession {
        MockSession::builder("AA:01")
            .service(Service {
                uuid: GENERIC_ATTRIBUTE_SERVICE,
                handle: 1,
                description: None,
                characteristics: Vec::new(),
            })
            .service(Service {
                uuid: SVC_ENV,
                handle: 2,
                description: None,
                characteristics: vec![
                    readable(
                        CHAR_MOISTURE,
                        3,
                        vec![descriptor(DESC_LABEL, 4), descriptor(DESC_CCCD, 5)],
                    ),
                    Characteristic {
                        uuid: CHAR_MODE,
                        handle: 6,
                        properties: vec![CharProperty::Write],
                        description: None,
                        value: None,
                        descriptors: Vec::new(),
                    },
                    readable(CHAR_BROKEN, 7, Vec::new()),
                ],
            })
            .service(Service {
                uuid: SVC_LIGHT,
                handle: 8,
                description: None,
                characteristics: vec![readable(CHAR_LUX, 9, Vec::new())],
            })
            .characteristic_value(CHAR_MOISTURE, b"42.5".as_slice())
            .characteristic_value(CHAR_LUX, b"810".as_slice())
            .descriptor_value(CHAR_MOISTURE, DESC_LABEL, b"Soil moisture".as_slice())
            .descriptor_value(CHAR_MOISTURE, DESC_CCCD, [0u8, 0u8])
            .failing_read(CHAR_BROKEN)
            .build()
    }

    fn uuids(services: &[Service]) -> Vec<Uuid> {
        services.iter().map(|s| s.uuid).collect()
    }

    #[tokio::test]
    async fn test_empty_filters_include_everything_except_ignored() {
        let session = session();
        let tree = walk(&session, &WalkFilter::default(), false).await.unwrap();

        assert_eq!(uuids(&tree), vec![SVC_ENV, SVC_LIGHT]);
        assert_eq!(tree[0].characteristics.len(), 3);
        assert_eq!(tree[1].characteristics.len(), 1);
        // Structure-only walk performs no reads at all.
        assert!(session.reads().is_empty());
    }

    #[tokio::test]
    async fn test_service_filter_is_exact_intersection() {
        let session = session();
        let absent = uuid!("54990000-e337-46ca-9690-cdd6d309e7b1");

        let filter = WalkFilter::new().services([SVC_LIGHT, absent]);
        let tree = walk(&session, &filter, false).await.unwrap();
        assert_eq!(uuids(&tree), vec![SVC_LIGHT]);

        let filter = WalkFilter::new().services([absent]);
        let tree = walk(&session, &filter, false).await.unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn test_ignore_list_wins_over_filters() {
        let session = session();
        // Explicitly asking for the ignored service still excludes it.
        let filter = WalkFilter::new().services([GENERIC_ATTRIBUTE_SERVICE, SVC_ENV]);
        let tree = walk(&session, &filter, false).await.unwrap();
        assert_eq!(uuids(&tree), vec![SVC_ENV]);
    }

    #[tokio::test]
    async fn test_characteristic_filter() {
        let session = session();
        let filter = WalkFilter::new().characteristics([CHAR_MOISTURE, CHAR_LUX]);
        let tree = walk(&session, &filter, false).await.unwrap();

        assert_eq!(tree[0].characteristics.len(), 1);
        assert_eq!(tree[0].characteristics[0].uuid, CHAR_MOISTURE);
        assert_eq!(tree[1].characteristics.len(), 1);
        assert_eq!(tree[1].characteristics[0].uuid, CHAR_LUX);
    }

    #[tokio::test]
    async fn test_descriptor_filter() {
        let session = session();
        let filter = WalkFilter::new().descriptors([DESC_LABEL]);
        let tree = walk(&session, &filter, false).await.unwrap();

        let moisture = tree[0].characteristic(CHAR_MOISTURE).unwrap();
        assert_eq!(moisture.descriptors.len(), 1);
        assert_eq!(moisture.descriptors[0].uuid, DESC_LABEL);
    }

    #[tokio::test]
    async fn test_values_read_with_fault_isolation() {
        let session = session();
        let tree = walk(&session, &WalkFilter::default(), true).await.unwrap();

        let env = &tree[0];
        assert_eq!(
            env.characteristic(CHAR_MOISTURE).unwrap().value,
            Some(b"42.5".to_vec())
        );
        // The failing characteristic records an absent value...
        assert_eq!(env.characteristic(CHAR_BROKEN).unwrap().value, None);
        // ...without losing its siblings, in this or other services.
        assert_eq!(
            tree[1].characteristic(CHAR_LUX).unwrap().value,
            Some(b"810".to_vec())
        );
    }

    #[tokio::test]
    async fn test_non_readable_characteristic_is_never_read() {
        let session = session();
        let tree = walk(&session, &WalkFilter::default(), true).await.unwrap();

        assert_eq!(tree[0].characteristic(CHAR_MODE).unwrap().value, None);
        assert!(!session.reads().contains(&CHAR_MODE));
    }

    #[tokio::test]
    async fn test_descriptor_values_and_isolation() {
        let session = MockSession::builder("AA:01")
            .service(Service {
                uuid: SVC_ENV,
                handle: 1,
                description: None,
                characteristics: vec![readable(
                    CHAR_MOISTURE,
                    2,
                    vec![descriptor(DESC_LABEL, 3), descriptor(DESC_CCCD, 4)],
                )],
            })
            .characteristic_value(CHAR_MOISTURE, b"42.5".as_slice())
            .descriptor_value(CHAR_MOISTURE, DESC_LABEL, b"Soil moisture".as_slice())
            .failing_read(DESC_CCCD)
            .build();

        let tree = walk(&session, &WalkFilter::default(), true).await.unwrap();
        let moisture = tree[0].characteristic(CHAR_MOISTURE).unwrap();

        assert_eq!(
            moisture.descriptor(DESC_LABEL).unwrap().value,
            Some(b"Soil moisture".to_vec())
        );
        assert_eq!(moisture.descriptor(DESC_CCCD).unwrap().value, None);
    }

    #[tokio::test]
    async fn test_enumeration_order_preserved() {
        let session = session();
        let filter = WalkFilter::new().characteristics([CHAR_BROKEN, CHAR_MODE, CHAR_MOISTURE]);
        let tree = walk(&session, &filter, false).await.unwrap();

        // Filtering keeps enumeration order, not filter-set order.
        let order: Vec<Uuid> = tree[0].characteristics.iter().map(|c| c.uuid).collect();
        assert_eq!(order, vec![CHAR_MOISTURE, CHAR_MODE, CHAR_BROKEN]);
    }

    #[tokio::test]
    async fn test_device_fatal_error_aborts_walk() {
        let session = MockSession::builder("AA:01")
            .service(Service {
                uuid: SVC_ENV,
                handle: 1,
                description: None,
                characteristics: vec![readable(CHAR_MOISTURE, 2, Vec::new())],
            })
            .fatal_read(CHAR_MOISTURE)
            .build();

        let err = walk(&session, &WalkFilter::default(), true)
            .await
            .unwrap_err();
        assert!(err.is_device_fatal());
    }
}
