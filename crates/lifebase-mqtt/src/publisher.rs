//! The MQTT publisher.
//!
//! Wraps a rumqttc [`AsyncClient`] with a background event-loop task. The
//! broker connection is established lazily by the event loop; publish calls
//! enqueue packets and surface client-side failures as
//! [`lifebase_core::Error::Publish`].

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lifebase_core::{Error, Publisher, Result};

use crate::config::{MqttConfig, MqttError, parse_broker_url};

/// Delay before the event loop retries after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// MQTT implementation of the [`Publisher`] seam.
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
    event_loop: JoinHandle<()>,
}

impl MqttPublisher {
    /// Create a publisher for the configured broker.
    ///
    /// Spawns the background event-loop task that drives the connection;
    /// it reconnects automatically after transient broker errors.
    pub fn connect(config: &MqttConfig) -> std::result::Result<Self, MqttError> {
        let (host, port, use_tls) = parse_broker_url(&config.broker)?;

        let mut options = MqttOptions::new(&config.client_id, host, port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }
        if use_tls {
            options.set_transport(rumqttc::Transport::tls_with_default_config());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);

        info!("MQTT publisher connecting to {}", config.broker);
        let event_loop = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!("MQTT connected: {:?}", ack.code);
                    }
                    Ok(Event::Incoming(Packet::PingResp)) => {
                        debug!("MQTT ping response received");
                    }
                    Ok(_) => {}
                    Err(rumqttc::ConnectionError::RequestsDone) => {
                        debug!("MQTT client closed, stopping event loop");
                        break;
                    }
                    Err(e) => {
                        warn!("MQTT connection error: {}. Reconnecting...", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        Ok(Self {
            client,
            qos: qos_from_level(config.qos),
            retain: config.retain,
            event_loop,
        })
    }

    /// Disconnect from the broker and stop the event loop.
    pub async fn disconnect(self) {
        if let Err(e) = self.client.disconnect().await {
            debug!("Error disconnecting MQTT client: {}", e);
        }
        self.event_loop.abort();
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.client
            .publish(topic, self.qos, self.retain, payload)
            .await
            .map_err(|e| Error::publish(topic, e.to_string()))
    }
}

fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}
