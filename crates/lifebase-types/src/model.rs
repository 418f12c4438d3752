//! Attribute-tree and measurement types.
//!
//! The attribute tree mirrors what a connected device exposes: services
//! containing characteristics containing descriptors. The tree is built by
//! a session during one connection and discarded when the session ends.
//! [`Measurement`] is the flattened record derived from one characteristic,
//! which is what ultimately gets published.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::DecodeError;

/// Capability flag on a characteristic.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new flags
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum CharProperty {
    /// Value may be broadcast in advertisements.
    Broadcast,
    /// Value can be read.
    Read,
    /// Value can be written without a response.
    WriteWithoutResponse,
    /// Value can be written.
    Write,
    /// Value changes are pushed via notifications.
    Notify,
    /// Value changes are pushed via indications.
    Indicate,
    /// Writes must be signed.
    AuthenticatedSignedWrites,
    /// Extended properties descriptor is present.
    ExtendedProperties,
}

impl CharProperty {
    /// Whether this flag grants read access.
    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, CharProperty::Read)
    }

    /// Short label used in tree output, matching the common GATT spelling.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CharProperty::Broadcast => "broadcast",
            CharProperty::Read => "read",
            CharProperty::WriteWithoutResponse => "write-without-response",
            CharProperty::Write => "write",
            CharProperty::Notify => "notify",
            CharProperty::Indicate => "indicate",
            CharProperty::AuthenticatedSignedWrites => "authenticated-signed-writes",
            CharProperty::ExtendedProperties => "extended-properties",
        }
    }
}

/// A service discovered on a connected device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service UUID in canonical form.
    pub uuid: Uuid,
    /// Protocol-assigned handle; encoding is implementation-specific.
    pub handle: u16,
    /// Optional human-readable label.
    pub description: Option<String>,
    /// Characteristics in enumeration order; UUIDs are unique within a service.
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    /// Look up a characteristic by UUID.
    #[must_use]
    pub fn characteristic(&self, uuid: Uuid) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.uuid == uuid)
    }
}

/// A characteristic within a service; the unit treated as one measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    /// Characteristic UUID in canonical form.
    pub uuid: Uuid,
    /// Protocol-assigned handle; encoding is implementation-specific.
    pub handle: u16,
    /// Capability flags.
    pub properties: Vec<CharProperty>,
    /// Optional human-readable label.
    pub description: Option<String>,
    /// Raw value bytes; present only when a read was attempted and succeeded.
    pub value: Option<Vec<u8>>,
    /// Descriptors in enumeration order.
    pub descriptors: Vec<Descriptor>,
}

impl Characteristic {
    /// Whether the characteristic advertises read capability.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.properties.iter().any(CharProperty::is_read)
    }

    /// Look up a descriptor by UUID.
    #[must_use]
    pub fn descriptor(&self, uuid: Uuid) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.uuid == uuid)
    }
}

/// A descriptor attached to a characteristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Descriptor UUID in canonical form.
    pub uuid: Uuid,
    /// Protocol-assigned handle; encoding is implementation-specific.
    pub handle: u16,
    /// Raw value bytes; present only when a read was attempted and succeeded.
    pub value: Option<Vec<u8>>,
}

/// Identity fields read from a device's subject identity service.
///
/// Identity enrichment is best-effort: every field is optional and absent
/// fields are substituted with placeholders downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectIdentity {
    /// Subject identifier.
    pub id: Option<String>,
    /// Human-readable subject name.
    pub name: Option<String>,
    /// Subject type identifier.
    pub type_id: Option<String>,
    /// Human-readable subject type name.
    pub type_name: Option<String>,
}

impl SubjectIdentity {
    /// Whether no identity field was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.name.is_none()
            && self.type_id.is_none()
            && self.type_name.is_none()
    }
}

/// A normalized measurement record derived from one characteristic.
///
/// Field names on the wire match the established LifeBase payload format:
/// `uuid`, `service`, `subject_uuid`, `subject_name`, `subject_type_uuid`,
/// `subject_type_name`, `timestamp` (epoch seconds), `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// UUID of the characteristic this record was derived from.
    #[serde(rename = "uuid")]
    pub characteristic: Uuid,
    /// UUID of the service the characteristic belongs to.
    pub service: Uuid,
    /// Resolved subject identifier, if any.
    #[serde(rename = "subject_uuid")]
    pub subject_id: Option<String>,
    /// Resolved subject name, if any.
    pub subject_name: Option<String>,
    /// Resolved subject type identifier, if any.
    #[serde(rename = "subject_type_uuid")]
    pub subject_type_id: Option<String>,
    /// Resolved subject type name, if any.
    pub subject_type_name: Option<String>,
    /// Capture time shared by all measurements of one walk pass.
    #[serde(rename = "timestamp", with = "time::serde::timestamp")]
    pub captured_at: OffsetDateTime,
    /// Decoded numeric value; absent when the read failed, the
    /// characteristic is not readable, or the bytes did not parse.
    pub value: Option<f64>,
}

/// Decode raw attribute bytes as UTF-8 text.
pub fn decode_text(bytes: &[u8]) -> Result<String, DecodeError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| DecodeError::NotText)
}

/// Decode raw attribute bytes as a textual floating-point number.
///
/// Surrounding whitespace is tolerated, matching the lenient float parsing
/// of the firmware's text encoding.
pub fn decode_number(bytes: &[u8]) -> Result<f64, DecodeError> {
    let text = decode_text(bytes)?;
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| DecodeError::NotNumeric(trimmed.to_string()))
}
