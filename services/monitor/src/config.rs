use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the bin monitor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// MQTT broker configuration
    #[serde(default)]
    pub mqtt: MqttConfig,
    /// Bin geometry
    #[serde(default)]
    pub bin: BinConfig,
    /// Alert threshold and alert log
    #[serde(default)]
    pub alerts: AlertConfig,
    /// Spoken announcements
    #[serde(default)]
    pub speech: SpeechConfig,
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// MQTT subscriber configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker host name
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    /// Broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Topic carrying distance readings
    #[serde(default = "default_mqtt_topic")]
    pub topic: String,
    /// Prefix for the generated client id
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

/// Bin geometry
#[derive(Debug, Clone, Deserialize)]
pub struct BinConfig {
    /// Distance from the sensor to the bin floor, in millimeters
    #[serde(default = "default_bin_height_mm")]
    pub height_mm: f64,
}

/// Alert configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Fill percentage at or above which an alert fires
    #[serde(default = "default_threshold_percentage")]
    pub threshold_percentage: f64,
    /// File receiving one timestamped line per alert
    #[serde(default = "default_alert_log_path")]
    pub log_path: String,
}

/// Speech output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// Announce alerts through the speech program
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Speech program; the message is passed as its last argument
    #[serde(default = "default_speech_command")]
    pub command: String,
    /// Extra arguments placed before the message
    #[serde(default)]
    pub args: Vec<String>,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// API listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

// Default value functions
fn default_service_name() -> String {
    "binwatch-monitor".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_mqtt_host() -> String {
    "test.mosquitto.org".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_topic() -> String {
    "sensor/distance".to_string()
}

fn default_client_id_prefix() -> String {
    "binwatch".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_bin_height_mm() -> f64 {
    600.0
}

fn default_threshold_percentage() -> f64 {
    80.0
}

fn default_alert_log_path() -> String {
    "bin_alerts.log".to_string()
}

fn default_speech_command() -> String {
    "espeak".to_string()
}

fn default_true() -> bool {
    true
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Add config file if present
            .add_source(config::File::with_name("config/monitor").required(false))
            .add_source(config::File::with_name("/etc/binwatch/monitor").required(false))
            // Override with environment variables
            // BINWATCH__MQTT__HOST -> mqtt.host
            .add_source(
                config::Environment::with_prefix("BINWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject geometry and thresholds the converter cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.bin.height_mm.is_finite() && self.bin.height_mm > 0.0) {
            anyhow::bail!("bin.height_mm must be positive, got {}", self.bin.height_mm);
        }
        if !(0.0..=100.0).contains(&self.alerts.threshold_percentage) {
            anyhow::bail!(
                "alerts.threshold_percentage must be within 0-100, got {}",
                self.alerts.threshold_percentage
            );
        }
        Ok(())
    }
}

impl MqttConfig {
    /// Get keep-alive as Duration
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            topic: default_mqtt_topic(),
            client_id_prefix: default_client_id_prefix(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            height_mm: default_bin_height_mm(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold_percentage: default_threshold_percentage(),
            log_path: default_alert_log_path(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_speech_command(),
            args: Vec::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.mqtt.host, "test.mosquitto.org");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.topic, "sensor/distance");
        assert_eq!(config.bin.height_mm, 600.0);
        assert_eq!(config.alerts.threshold_percentage, 80.0);
        assert_eq!(config.mqtt.keep_alive(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                "[mqtt]\nhost = \"localhost\"\n\n[bin]\nheight_mm = 450.0\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.bin.height_mm, 450.0);
        assert_eq!(config.alerts.log_path, "bin_alerts.log");
        assert!(config.speech.enabled);
    }

    #[test]
    fn test_validate_rejects_bad_constants() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.bin.height_mm = 0.0;
        assert!(config.validate().is_err());

        config.bin.height_mm = 600.0;
        config.alerts.threshold_percentage = 120.0;
        assert!(config.validate().is_err());
    }
}
