//! Core BLE library for LifeBase devices.
//!
//! This crate discovers LifeBase peripherals, walks their GATT attribute
//! trees, and turns readable characteristics into normalized measurement
//! records ready for publishing.
//!
//! # Pipeline
//!
//! 1. **Discovery** ([`scan`]): a time-bounded scan matches devices by their
//!    advertised name, optionally narrowed by an address allow-list.
//! 2. **Session** ([`session`], [`guard`]): one connection per device, with a
//!    single deadline budget and guaranteed disconnection on every exit path.
//! 3. **Walk** ([`walk`]): filtered traversal of the attribute tree with
//!    per-attribute fault isolation.
//! 4. **Identity** ([`subject`]): best-effort resolution of the device's
//!    subject identity service.
//! 5. **Extraction** ([`measure`], [`topic`]): one measurement per
//!    characteristic, and a deterministic broker-safe topic per measurement.
//!
//! # Quick Start
//!
//! ```no_run
//! use lifebase_core::{CollectOptions, DeviceSession, DiscoverOptions, SessionConfig};
//! use lifebase_core::guard::SessionGuard;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let devices = lifebase_core::scan::discover(&DiscoverOptions::default()).await?;
//!
//!     for device in devices {
//!         let session =
//!             DeviceSession::open(&device.address, SessionConfig::default()).await?;
//!         let guard = SessionGuard::new(session);
//!
//!         let measurements =
//!             lifebase_core::collect::collect_measurements(&*guard, &CollectOptions::default())
//!                 .await?;
//!         println!("{}: {} measurement(s)", device.address, measurements.len());
//!
//!         guard.close().await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod collect;
pub mod error;
pub mod guard;
pub mod measure;
pub mod mock;
pub mod scan;
pub mod session;
pub mod subject;
pub mod topic;
pub mod traits;
pub mod util;
pub mod walk;

// Core exports
pub use collect::{CollectOptions, collect_measurements, collect_tree, publish_measurements};
pub use error::{ConnectReason, Error, Result};
pub use guard::SessionGuard;
pub use measure::extract;
pub use mock::{MockSession, MockSessionBuilder};
pub use scan::{DEFAULT_DEVICE_NAME, DiscoverOptions, DiscoveredDevice, discover};
pub use session::{DeviceSession, SessionConfig};
pub use subject::{IdentityUuids, resolve};
pub use topic::{UNKNOWN_SEGMENT, build_topic, measurement_topic, topic_segments};
pub use traits::{GattSession, Publisher};
pub use walk::{WalkFilter, walk};

// Re-export the shared data model
pub use lifebase_types::{
    CharProperty, Characteristic, Descriptor, Measurement, Service, SubjectIdentity,
};
