//! Subject identity resolution.
//!
//! LifeBase devices carry a well-known identity service describing the
//! real-world subject being monitored. Resolution is best-effort: a missing
//! service, a failed read, or a value that is not valid UTF-8 each leave
//! the affected field unset instead of failing the device.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use lifebase_types::{SubjectIdentity, decode_text, uuid as wellknown};

use crate::error::Result;
use crate::traits::GattSession;

/// The five identity-role UUIDs.
///
/// Defaults match the UUIDs LifeBase firmware ships with; deployments can
/// override them through configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityUuids {
    /// The identity service itself.
    pub init: Uuid,
    /// Subject name characteristic.
    pub subject_name: Uuid,
    /// Subject identifier characteristic.
    pub subject_id: Uuid,
    /// Subject type name characteristic.
    pub subject_type_name: Uuid,
    /// Subject type identifier characteristic.
    pub subject_type_id: Uuid,
}

impl Default for IdentityUuids {
    fn default() -> Self {
        Self {
            init: wellknown::SUBJECT_SERVICE,
            subject_name: wellknown::SUBJECT_NAME,
            subject_id: wellknown::SUBJECT_ID,
            subject_type_name: wellknown::SUBJECT_TYPE_NAME,
            subject_type_id: wellknown::SUBJECT_TYPE_ID,
        }
    }
}

/// Resolve the subject identity from the session's identity service.
///
/// Returns an identity with all fields unset when the service is absent.
/// Only the role characteristics the service actually exposes are read;
/// each failure leaves its field unset independently.
///
/// # Errors
///
/// Only device-fatal errors propagate; per-field read failures are absorbed.
pub async fn resolve<S>(session: &S, uuids: &IdentityUuids) -> Result<SubjectIdentity>
where
    S: GattSession + ?Sized,
{
    let Some(service) = session.services().iter().find(|s| s.uuid == uuids.init) else {
        debug!(
            "identity service {} not present on {}, proceeding without identity",
            uuids.init,
            session.address()
        );
        return Ok(SubjectIdentity::default());
    };

    let mut identity = SubjectIdentity::default();
    for characteristic in &service.characteristics {
        let slot = if characteristic.uuid == uuids.subject_id {
            &mut identity.id
        } else if characteristic.uuid == uuids.subject_name {
            &mut identity.name
        } else if characteristic.uuid == uuids.subject_type_id {
            &mut identity.type_id
        } else if characteristic.uuid == uuids.subject_type_name {
            &mut identity.type_name
        } else {
            continue;
        };

        *slot = read_text(session, characteristic.uuid).await?;
    }

    Ok(identity)
}

async fn read_text<S>(session: &S, uuid: Uuid) -> Result<Option<String>>
where
    S: GattSession + ?Sized,
{
    match session.read_characteristic(uuid).await {
        Ok(bytes) => match decode_text(&bytes) {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                debug!(%uuid, error = %e, "identity value is not text, leaving field unset");
                Ok(None)
            }
        },
        Err(e) if e.is_device_fatal() => Err(e),
        Err(e) => {
            debug!(%uuid, error = %e, "identity read failed, leaving field unset");
            Ok(None)
        }
    }
}
