//! Well-known Bluetooth UUIDs for LifeBase devices.
//!
//! LifeBase devices expose a custom "subject identity" service whose
//! characteristics describe the real-world subject the device monitors.
//! These UUIDs are the built-in defaults; deployments can override them
//! through configuration.

use uuid::{Uuid, uuid};

// --- Subject identity service UUIDs ---

/// The subject identity service itself.
pub const SUBJECT_SERVICE: Uuid = uuid!("54000000-e337-46ca-9690-cdd6d309e7b1");

/// Human-readable subject name characteristic.
pub const SUBJECT_NAME: Uuid = uuid!("54000001-e337-46ca-9690-cdd6d309e7b1");

/// Subject identifier characteristic.
pub const SUBJECT_ID: Uuid = uuid!("54000002-e337-46ca-9690-cdd6d309e7b1");

/// Human-readable subject type name characteristic.
pub const SUBJECT_TYPE_NAME: Uuid = uuid!("54000003-e337-46ca-9690-cdd6d309e7b1");

/// Subject type identifier characteristic.
pub const SUBJECT_TYPE_ID: Uuid = uuid!("54000004-e337-46ca-9690-cdd6d309e7b1");

// --- Standard BLE service UUIDs ---

/// Generic Attribute service, always excluded from attribute walks.
pub const GENERIC_ATTRIBUTE_SERVICE: Uuid = uuid!("00001801-0000-1000-8000-00805f9b34fb");
