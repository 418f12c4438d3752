//! Error types for lifebase-core.
//!
//! The taxonomy mirrors the failure levels of the pipeline:
//!
//! | Level     | Variants                              | Handling |
//! |-----------|---------------------------------------|----------|
//! | scan      | [`Error::Transport`], [`Error::AdapterUnavailable`], [`Error::DiscoveryTimeout`] | fatal for the whole run |
//! | device    | [`Error::Connection`], [`Error::SessionTimeout`] | aborts one device, pipeline continues |
//! | attribute | [`Error::Read`], [`Error::AttributeNotFound`] | absorbed at the point of use, recorded as an absent value |
//!
//! The walker uses [`Error::is_device_fatal`] to decide whether a failed
//! read aborts the walk or is swallowed into `value = None`.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while discovering and reading LifeBase devices.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth transport error from the underlying stack.
    #[error("Bluetooth transport error: {0}")]
    Transport(#[from] btleplug::Error),

    /// No usable Bluetooth adapter on this host.
    #[error("Bluetooth transport error: no adapter available")]
    AdapterUnavailable,

    /// The discovery deadline elapsed before a scan cycle completed.
    ///
    /// Distinct from an empty result, which is success with zero devices.
    #[error("discovery timed out after {duration:?}")]
    DiscoveryTimeout {
        /// The deadline that elapsed.
        duration: Duration,
    },

    /// A connection to one device could not be established or was dropped.
    #[error("connection to {address} failed: {reason}")]
    Connection {
        /// The device address that failed to connect.
        address: String,
        /// The structured reason for the failure.
        reason: ConnectReason,
    },

    /// The session deadline elapsed while an operation was pending.
    ///
    /// The session is torn down before this error is returned.
    #[error("session deadline elapsed during '{operation}' (budget {budget:?})")]
    SessionTimeout {
        /// The operation that was pending when the deadline elapsed.
        operation: String,
        /// The deadline budget established at open time.
        budget: Duration,
    },

    /// A single attribute read failed.
    #[error("read of attribute {uuid} failed: {reason}")]
    Read {
        /// The attribute UUID.
        uuid: Uuid,
        /// The reason for the failure.
        reason: String,
    },

    /// An attribute UUID was requested that the connected device does not expose.
    #[error("attribute {uuid} not found on the connected device")]
    AttributeNotFound {
        /// The UUID that was not found.
        uuid: Uuid,
    },

    /// Handing a payload to the publisher failed.
    #[error("publish to topic '{topic}' failed: {reason}")]
    Publish {
        /// The topic the payload was addressed to.
        topic: String,
        /// The reason for the failure.
        reason: String,
    },
}

/// Structured reasons for connection failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectReason {
    /// The address was not observed by the adapter.
    NotFound,
    /// The peer rejected the connection attempt.
    Rejected,
    /// The link dropped before the handshake completed.
    Dropped,
    /// Generic BLE error.
    Ble(String),
}

impl std::fmt::Display for ConnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "device not observed by the adapter"),
            Self::Rejected => write!(f, "connection rejected by device"),
            Self::Dropped => write!(f, "link dropped before handshake completed"),
            Self::Ble(msg) => write!(f, "BLE error: {}", msg),
        }
    }
}

impl Error {
    /// Create a connection failure for an address with a structured reason.
    pub fn connection(address: impl Into<String>, reason: ConnectReason) -> Self {
        Self::Connection {
            address: address.into(),
            reason,
        }
    }

    /// Create a session timeout error with operation context.
    pub fn session_timeout(operation: impl Into<String>, budget: Duration) -> Self {
        Self::SessionTimeout {
            operation: operation.into(),
            budget,
        }
    }

    /// Create a single-attribute read error.
    pub fn read(uuid: Uuid, reason: impl Into<String>) -> Self {
        Self::Read {
            uuid,
            reason: reason.into(),
        }
    }

    /// Create a publish error.
    pub fn publish(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the current device's processing.
    ///
    /// Attribute-level faults are absorbed locally; everything in this set
    /// propagates out of a walk and tears down the session.
    #[must_use]
    pub fn is_device_fatal(&self) -> bool {
        matches!(self, Error::Connection { .. } | Error::SessionTimeout { .. })
    }
}

/// Result type alias using lifebase-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use uuid::uuid;

    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("AA:BB:CC:DD:EE:FF", ConnectReason::Rejected);
        assert_eq!(
            err.to_string(),
            "connection to AA:BB:CC:DD:EE:FF failed: connection rejected by device"
        );

        let err = Error::session_timeout("read characteristic", Duration::from_secs(5));
        assert!(err.to_string().contains("read characteristic"));
        assert!(err.to_string().contains("5s"));

        let err = Error::read(
            uuid!("54000001-e337-46ca-9690-cdd6d309e7b1"),
            "attribute busy",
        );
        assert!(err.to_string().contains("54000001"));
        assert!(err.to_string().contains("attribute busy"));

        let err = Error::DiscoveryTimeout {
            duration: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_device_fatal_classification() {
        assert!(Error::connection("AA:01", ConnectReason::Dropped).is_device_fatal());
        assert!(Error::session_timeout("walk", Duration::from_secs(1)).is_device_fatal());

        let read = Error::read(uuid!("54000001-e337-46ca-9690-cdd6d309e7b1"), "nope");
        assert!(!read.is_device_fatal());
        assert!(
            !Error::AttributeNotFound {
                uuid: uuid!("54000001-e337-46ca-9690-cdd6d309e7b1")
            }
            .is_device_fatal()
        );
        assert!(
            !Error::DiscoveryTimeout {
                duration: Duration::from_secs(1)
            }
            .is_device_fatal()
        );
    }

    #[test]
    fn test_btleplug_error_conversion() {
        fn _assert_from_impl<T: From<btleplug::Error>>() {}
        _assert_from_impl::<Error>();
    }
}
