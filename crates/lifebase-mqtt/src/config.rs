//! MQTT broker configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while preparing an MQTT connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MqttError {
    /// The broker URL could not be parsed.
    #[error("invalid MQTT broker URL '{url}': {reason}")]
    InvalidBroker {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// MQTT publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker URL, `mqtt://host[:port]` or `mqtts://host[:port]`.
    pub broker: String,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Optional username credential.
    pub username: Option<String>,
    /// Optional password credential.
    pub password: Option<String>,
    /// Quality of service level (0, 1, or 2).
    pub qos: u8,
    /// Whether published payloads are retained by the broker.
    pub retain: bool,
    /// Keep-alive interval in seconds.
    pub keep_alive: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "mqtt://127.0.0.1:1883".to_string(),
            client_id: "lifebase-ble-mqtt".to_string(),
            username: None,
            password: None,
            qos: 1,
            retain: false,
            keep_alive: 30,
        }
    }
}

impl MqttConfig {
    /// Validate the configuration without connecting.
    pub fn validate(&self) -> Result<(), MqttError> {
        parse_broker_url(&self.broker).map(|_| ())
    }
}

/// Parse an MQTT broker URL into (host, port, use_tls).
///
/// `mqtt://` defaults to port 1883, `mqtts://` to 8883.
pub fn parse_broker_url(url: &str) -> Result<(String, u16, bool), MqttError> {
    let invalid = |reason: &str| MqttError::InvalidBroker {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let (use_tls, rest) = if let Some(stripped) = url.strip_prefix("mqtt://") {
        (false, stripped)
    } else if let Some(stripped) = url.strip_prefix("mqtts://") {
        (true, stripped)
    } else {
        return Err(invalid("URL must start with mqtt:// or mqtts://"));
    };

    let default_port = if use_tls { 8883 } else { 1883 };
    let (host, port) = if let Some((host, port)) = rest.rsplit_once(':') {
        let port = port
            .parse::<u16>()
            .map_err(|_| invalid(&format!("invalid port '{}'", port)))?;
        (host.to_string(), port)
    } else {
        (rest.to_string(), default_port)
    };

    if host.is_empty() {
        return Err(invalid("host cannot be empty"));
    }

    Ok((host, port, use_tls))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broker_url_mqtt() {
        let (host, port, tls) = parse_broker_url("mqtt://localhost:1883").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 1883);
        assert!(!tls);
    }

    #[test]
    fn test_parse_broker_url_mqtts() {
        let (host, port, tls) = parse_broker_url("mqtts://broker.example.com:8883").unwrap();
        assert_eq!(host, "broker.example.com");
        assert_eq!(port, 8883);
        assert!(tls);
    }

    #[test]
    fn test_parse_broker_url_default_ports() {
        let (host, port, tls) = parse_broker_url("mqtt://localhost").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 1883);
        assert!(!tls);

        let (host, port, tls) = parse_broker_url("mqtts://secure.example.com").unwrap();
        assert_eq!(host, "secure.example.com");
        assert_eq!(port, 8883);
        assert!(tls);
    }

    #[test]
    fn test_parse_broker_url_rejects_bad_input() {
        assert!(parse_broker_url("http://localhost:1883").is_err());
        assert!(parse_broker_url("localhost:1883").is_err());
        assert!(parse_broker_url("mqtt://:1883").is_err());
        assert!(parse_broker_url("mqtt://host:notaport").is_err());
    }

    #[test]
    fn test_config_defaults_validate() {
        let config = MqttConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.qos, 1);
        assert!(!config.retain);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let toml_src = r#"
            broker = "mqtts://broker.example.com"
            client_id = "greenhouse-bridge"
            username = "lifebase"
            password = "secret"
            qos = 2
            retain = true
        "#;

        let config: MqttConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.broker, "mqtts://broker.example.com");
        assert_eq!(config.client_id, "greenhouse-bridge");
        assert_eq!(config.username.as_deref(), Some("lifebase"));
        assert_eq!(config.qos, 2);
        assert!(config.retain);
        // Unset keys fall back to defaults.
        assert_eq!(config.keep_alive, 30);
    }
}
