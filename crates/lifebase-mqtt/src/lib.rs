//! MQTT publisher for LifeBase measurements.
//!
//! Implements the [`lifebase_core::Publisher`] seam over an MQTT broker
//! connection: the pipeline hands over finished (topic, payload) pairs and
//! this crate owns the client, its background event loop, and the broker
//! options.
//!
//! # Example Configuration
//!
//! ```toml
//! [mqtt]
//! broker = "mqtt://127.0.0.1:1883"
//! client_id = "lifebase-ble-mqtt"
//! qos = 1
//! retain = false
//! ```

pub mod config;
pub mod publisher;

pub use config::{MqttConfig, MqttError, parse_broker_url};
pub use publisher::MqttPublisher;
