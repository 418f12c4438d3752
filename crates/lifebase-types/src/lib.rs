//! Platform-agnostic types for LifeBase BLE devices.
//!
//! This crate provides the shared data model used by the BLE core
//! (lifebase-core), the MQTT publisher (lifebase-mqtt), and the CLI:
//!
//! - Attribute-tree types ([`Service`], [`Characteristic`], [`Descriptor`])
//! - Derived measurement records ([`Measurement`], [`SubjectIdentity`])
//! - Well-known UUID constants for the subject identity service
//! - Decoding of raw attribute values into text and numbers
//!
//! # Example
//!
//! ```
//! use lifebase_types::{decode_number, CharProperty};
//!
//! let value = decode_number(b"21.5").unwrap();
//! assert_eq!(value, 21.5);
//! assert!(CharProperty::Read.is_read());
//! ```

pub mod error;
pub mod model;
pub mod uuid;

pub use error::DecodeError;
pub use model::{
    decode_number, decode_text, CharProperty, Characteristic, Descriptor, Measurement, Service,
    SubjectIdentity,
};
