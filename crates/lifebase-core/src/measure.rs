//! Measurement extraction.
//!
//! Converts a walked attribute tree into flat [`Measurement`] records: one
//! record per characteristic, whether or not its value read succeeded, so
//! consumers always see one record per attribute per pass.

use time::OffsetDateTime;
use tracing::debug;

use lifebase_types::{Measurement, Service, SubjectIdentity, decode_number};

/// Extract one measurement per characteristic of the walked tree.
///
/// `captured_at` is shared by every record of the batch, establishing one
/// consistent as-of time for the pass. Raw bytes are decoded as a textual
/// floating-point number; characteristics without a value, or whose bytes
/// do not parse, yield `value = None`.
pub fn extract(
    services: &[Service],
    identity: &SubjectIdentity,
    captured_at: OffsetDateTime,
) -> Vec<Measurement> {
    let mut measurements = Vec::new();

    for service in services {
        for characteristic in &service.characteristics {
            let value = characteristic.value.as_deref().and_then(|bytes| {
                match decode_number(bytes) {
                    Ok(number) => Some(number),
                    Err(e) => {
                        debug!(
                            uuid = %characteristic.uuid,
                            error = %e,
                            "value does not decode as a number, recording absent value"
                        );
                        None
                    }
                }
            });

            measurements.push(Measurement {
                characteristic: characteristic.uuid,
                service: service.uuid,
                subject_id: identity.id.clone(),
                subject_name: identity.name.clone(),
                subject_type_id: identity.type_id.clone(),
                subject_type_name: identity.type_name.clone(),
                captured_at,
                value,
            });
        }
    }

    measurements
}
