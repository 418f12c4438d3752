//! Per-device collection pipeline.
//!
//! Ties the stages together for one open session: resolve the subject
//! identity, walk the attribute tree with the identity service excluded,
//! extract measurements, and optionally hand them to a [`Publisher`].

use time::OffsetDateTime;
use tracing::{debug, info};

use lifebase_types::{Measurement, Service};

use crate::error::{Error, Result};
use crate::measure;
use crate::subject::{self, IdentityUuids};
use crate::traits::{GattSession, Publisher};
use crate::walk::{WalkFilter, walk};

/// Options for one collection pass.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Filter sets applied during the walk.
    pub filter: WalkFilter,
    /// Identity-role UUIDs used by subject resolution.
    pub identity: IdentityUuids,
}

/// Collect measurements from one open session.
///
/// The identity service is consumed by subject resolution and excluded from
/// the walk, so it never appears as a regular service in the output.
pub async fn collect_measurements<S>(
    session: &S,
    options: &CollectOptions,
) -> Result<Vec<Measurement>>
where
    S: GattSession + ?Sized,
{
    let identity = subject::resolve(session, &options.identity).await?;

    let mut filter = options.filter.clone();
    filter.ignored_services.insert(options.identity.init);

    let services = walk(session, &filter, true).await?;
    let captured_at = OffsetDateTime::now_utc();
    let measurements = measure::extract(&services, &identity, captured_at);

    info!(
        "Collected {} measurement(s) from {}",
        measurements.len(),
        session.address()
    );
    Ok(measurements)
}

/// Walk one session's attribute tree for display, values included on demand.
pub async fn collect_tree<S>(
    session: &S,
    options: &CollectOptions,
    want_values: bool,
) -> Result<Vec<Service>>
where
    S: GattSession + ?Sized,
{
    walk(session, &options.filter, want_values).await
}

/// Publish a batch of measurements, one payload per record.
///
/// Topics are derived from the device label and each record's identity
/// fields; payloads are the JSON encoding of the record.
pub async fn publish_measurements<P>(
    publisher: &P,
    device_label: &str,
    measurements: &[Measurement],
) -> Result<usize>
where
    P: Publisher + ?Sized,
{
    for measurement in measurements {
        let topic = crate::topic::measurement_topic(device_label, measurement);
        let payload = serde_json::to_vec(measurement)
            .map_err(|e| Error::publish(topic.clone(), e.to_string()))?;

        debug!(%topic, "publishing measurement");
        publisher.publish(&topic, &payload).await?;
    }

    Ok(measurements.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use lifebase_types::{CharProperty, Characteristic};
    use uuid::{Uuid, uuid};

    use crate::mock::MockSession;

    use super::*;

    const SVC_ENV: Uuid = uuid!("54010000-e337-46ca-9690-cdd6d309e7b1");
    const CHAR_MOISTURE: Uuid = uuid!("54010001-e337-46ca-9690-cdd6d309e7b1");

    /// Publisher that records every (topic, payload) pair.
    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    fn readable(uuid: Uuid, handle: u16) -> Characteristic {
        Characteristic {
            uuid,
            handle,
            properties: vec![CharProperty::Read],
            description: None,
            value: None,
            descriptors: Vec::new(),
        }
    }

    fn session_with_identity() -> MockSession {
        let uuids = IdentityUuids::default();
        MockSession::builder("AA:01")
            .service(Service {
                uuid: uuids.init,
                handle: 1,
                description: None,
                characteristics: vec![
                    readable(uuids.subject_name, 2),
                    readable(uuids.subject_type_name, 3),
                ],
            })
            .service(Service {
                uuid: lifebase_types::uuid::GENERIC_ATTRIBUTE_SERVICE,
                handle: 4,
                description: None,
                characteristics: Vec::new(),
            })
            .service(Service {
                uuid: SVC_ENV,
                handle: 5,
                description: None,
                characteristics: vec![readable(CHAR_MOISTURE, 6)],
            })
            .characteristic_value(uuids.subject_name, b"Basil".as_slice())
            .characteristic_value(uuids.subject_type_name, b"Plant".as_slice())
            .characteristic_value(CHAR_MOISTURE, b"42.5".as_slice())
            .build()
    }

    #[tokio::test]
    async fn test_collect_consumes_identity_service() {
        let session = session_with_identity();
        let measurements = collect_measurements(&session, &CollectOptions::default())
            .await
            .unwrap();

        // Only the environment characteristic is reported; the identity
        // service was consumed and the generic-attribute service ignored.
        assert_eq!(measurements.len(), 1);
        let m = &measurements[0];
        assert_eq!(m.characteristic, CHAR_MOISTURE);
        assert_eq!(m.service, SVC_ENV);
        assert_eq!(m.subject_name.as_deref(), Some("Basil"));
        assert_eq!(m.subject_type_name.as_deref(), Some("Plant"));
        assert_eq!(m.value, Some(42.5));
    }

    #[tokio::test]
    async fn test_collect_without_identity_service() {
        let session = MockSession::builder("AA:01")
            .service(Service {
                uuid: SVC_ENV,
                handle: 1,
                description: None,
                characteristics: vec![readable(CHAR_MOISTURE, 2)],
            })
            .characteristic_value(CHAR_MOISTURE, b"42.5".as_slice())
            .build();

        let measurements = collect_measurements(&session, &CollectOptions::default())
            .await
            .unwrap();

        assert_eq!(measurements.len(), 1);
        assert!(measurements[0].subject_name.is_none());
        assert_eq!(measurements[0].value, Some(42.5));
    }

    #[tokio::test]
    async fn test_collect_tree_keeps_identity_service_visible() {
        let session = session_with_identity();
        let tree = collect_tree(&session, &CollectOptions::default(), false)
            .await
            .unwrap();

        let uuids: Vec<Uuid> = tree.iter().map(|s| s.uuid).collect();
        assert_eq!(uuids, vec![IdentityUuids::default().init, SVC_ENV]);
    }

    #[tokio::test]
    async fn test_publish_measurements() {
        let session = session_with_identity();
        let measurements = collect_measurements(&session, &CollectOptions::default())
            .await
            .unwrap();

        let publisher = RecordingPublisher::default();
        let published = publish_measurements(&publisher, "LifeBaseMeter", &measurements)
            .await
            .unwrap();
        assert_eq!(published, 1);

        let records = publisher.published.lock().unwrap();
        let (topic, payload) = &records[0];
        assert_eq!(topic, "LifeBaseMeter/Plant/Basil");

        // The payload round-trips back into the same record.
        let back: Measurement = serde_json::from_slice(payload).unwrap();
        assert_eq!(back, measurements[0]);
    }
}
