//! Command implementations.

pub mod discover;
pub mod interconnect;
pub mod scan;

use std::time::Duration;

use uuid::Uuid;

use lifebase_core::{CollectOptions, DiscoverOptions, SessionConfig, WalkFilter};

use crate::config::Config;

/// Merged configuration for one invocation: file config overridden by the
/// global command-line flags.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Discovery options.
    pub discover: DiscoverOptions,
    /// Session deadline configuration.
    pub session: SessionConfig,
    /// Walk and identity options.
    pub collect: CollectOptions,
    /// Label used as the first topic segment.
    pub device_label: String,
    /// The loaded configuration file.
    pub config: Config,
}

impl RunContext {
    /// Build the context from the loaded config and global flags.
    pub fn new(config: Config, devices: &[String], device_name: Option<&str>, timeout: Option<u64>) -> Self {
        let device_name = device_name
            .map(str::to_string)
            .unwrap_or_else(|| config.scanner.device_name.clone());
        let timeout = timeout.unwrap_or(config.scanner.timeout);
        let allow_list = if devices.is_empty() {
            config.scanner.devices.clone()
        } else {
            devices.to_vec()
        };

        let deadline = Duration::from_secs(timeout);
        let mut filter = WalkFilter::default();
        filter.ignored_services.extend(config.ignore_services.iter().copied());

        Self {
            discover: DiscoverOptions::new()
                .device_name(device_name.clone())
                .allow_list(allow_list)
                .deadline(deadline),
            session: SessionConfig::new().deadline(deadline),
            collect: CollectOptions {
                filter,
                identity: config.identity.clone(),
            },
            device_label: device_name,
            config,
        }
    }

    /// Apply the per-command filter flags to the walk filter.
    pub fn with_filters(
        mut self,
        services: &[Uuid],
        characteristics: &[Uuid],
        descriptors: &[Uuid],
    ) -> Self {
        if !services.is_empty() {
            self.collect.filter.services = services.iter().copied().collect();
        }
        if !characteristics.is_empty() {
            self.collect.filter.characteristics = characteristics.iter().copied().collect();
        }
        if !descriptors.is_empty() {
            self.collect.filter.descriptors = descriptors.iter().copied().collect();
        }
        self
    }
}
