use crate::bin_state::{BinState, SensorReading, SharedBinState};
use crate::config::MqttConfig;
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions,
    Packet, Publish, QoS,
};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Pause between a transport error and the next poll, which reconnects
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Capacity of the request channel between the client handle and the event loop
const REQUEST_CAPACITY: usize = 10;

/// Errors that can occur while consuming sensor readings
#[derive(Error, Debug)]
pub enum SubscriberError {
    #[error("Invalid payload: {payload}")]
    MalformedPayload { payload: String },

    #[error("Failed to subscribe: {0}")]
    Subscribe(#[from] ClientError),
}

/// Decode a payload into a distance reading.
///
/// The payload is the decimal text of a distance in millimeters. Surrounding
/// whitespace is ignored; NaN and infinities are rejected.
pub fn parse_reading(payload: &[u8]) -> Result<SensorReading, SubscriberError> {
    let malformed = || SubscriberError::MalformedPayload {
        payload: String::from_utf8_lossy(payload).into_owned(),
    };

    let text = std::str::from_utf8(payload).map_err(|_| malformed())?;
    let distance_mm: f64 = text.trim().parse().map_err(|_| malformed())?;
    if !distance_mm.is_finite() {
        return Err(malformed());
    }

    Ok(SensorReading { distance_mm })
}

/// Applies inbound payloads to the shared bin state
#[derive(Debug, Clone)]
pub struct ReadingHandler {
    state: SharedBinState,
    bin_height_mm: f64,
}

impl ReadingHandler {
    pub fn new(state: SharedBinState, bin_height_mm: f64) -> Self {
        Self {
            state,
            bin_height_mm,
        }
    }

    /// Validate, convert and store one payload.
    ///
    /// A malformed payload leaves the state untouched.
    pub fn handle_payload(&self, payload: &[u8]) -> Result<BinState, SubscriberError> {
        let reading = parse_reading(payload)?;
        let state = self.state.apply_reading(reading, self.bin_height_mm);

        metrics::counter!("binwatch.readings.accepted").increment(1);
        metrics::gauge!("binwatch.bin.fill_percentage").set(state.fill_percentage);

        Ok(state)
    }
}

/// Long-lived MQTT subscriber feeding the shared bin state
pub struct SensorSubscriber {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    handler: ReadingHandler,
}

impl SensorSubscriber {
    /// Prepare a subscriber; no network traffic happens until [`run`](Self::run)
    pub fn new(config: &MqttConfig, state: SharedBinState, bin_height_mm: f64) -> Self {
        let client_id = format!("{}-{}", config.client_id_prefix, Uuid::new_v4().simple());

        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options.set_keep_alive(config.keep_alive());

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        info!(
            host = %config.host,
            port = config.port,
            topic = %config.topic,
            "MQTT subscriber configured"
        );

        Self {
            client,
            eventloop,
            topic: config.topic.clone(),
            handler: ReadingHandler::new(state, bin_height_mm),
        }
    }

    /// Poll the broker connection until `shutdown` is cancelled
    #[instrument(skip_all, fields(topic = %self.topic))]
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), SubscriberError> {
        info!("Starting MQTT subscriber");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Received shutdown signal");
                    break;
                }
                event = self.eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                            if ack.code == ConnectReturnCode::Success {
                                info!("Connected to MQTT broker");
                                if let Err(e) = self.subscribe() {
                                    error!(error = %e, "MQTT subscribe request not queued");
                                }
                            } else {
                                warn!(code = ?ack.code, "Failed to connect to MQTT broker");
                                metrics::counter!("binwatch.mqtt.connect_failures").increment(1);
                            }
                        }
                        Ok(Event::Incoming(Packet::SubAck(_))) => {
                            info!("Subscribed to MQTT topic");
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            self.on_publish(&publish);
                        }
                        Ok(_) => {}
                        Err(ConnectionError::ConnectionRefused(code)) => {
                            warn!(code = ?code, "Failed to connect to MQTT broker");
                            metrics::counter!("binwatch.mqtt.connect_failures").increment(1);
                            tokio::time::sleep(RECONNECT_PAUSE).await;
                        }
                        Err(e) => {
                            error!(error = %e, "MQTT connection error");
                            tokio::time::sleep(RECONNECT_PAUSE).await;
                        }
                    }
                }
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            debug!(error = %e, "MQTT disconnect request not delivered");
        }

        Ok(())
    }

    fn subscribe(&self) -> Result<(), SubscriberError> {
        self.client
            .try_subscribe(self.topic.as_str(), QoS::AtMostOnce)?;
        Ok(())
    }

    fn on_publish(&self, publish: &Publish) {
        match self.handler.handle_payload(&publish.payload) {
            Ok(state) => {
                debug!(
                    distance_mm = state.distance_mm,
                    fill_percentage = state.fill_percentage,
                    "Received distance reading"
                );
            }
            Err(e) => {
                warn!(error = %e, topic = %publish.topic, "Discarding sensor message");
                metrics::counter!("binwatch.readings.malformed").increment(1);
            }
        }
    }
}
