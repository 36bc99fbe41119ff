//! Binwatch Monitor
//!
//! Fill-level monitor for a single waste bin. An ultrasonic sensor above the
//! bin publishes its distance reading to an MQTT topic; this service converts
//! each reading into a fill percentage, keeps the latest value in memory and
//! serves it over HTTP. An alert endpoint compares the fill level against a
//! threshold, speaks a warning and appends it to an alert log.
//!
//! ## Architecture
//!
//! ```text
//! MQTT Broker                                       HTTP clients
//! ┌──────────────┐                                 ┌──────────────┐
//! │ sensor/      │                                 │ GET  status  │
//! │   distance   │                                 │ POST alert   │
//! └──────────────┘                                 └──────────────┘
//!        │                                                │
//!        ▼                                                ▼
//! ┌──────────────┐     ┌──────────────┐            ┌──────────────┐
//! │ Sensor       │────▶│ Shared       │◀───────────│ Bin API      │
//! │ Subscriber   │     │ Bin State    │            └──────────────┘
//! └──────────────┘     └──────────────┘                   │
//!                             ▲                           ▼
//!                             │                    ┌──────────────┐
//!                             └────────────────────│ Alert        │
//!                                                  │ Evaluator    │
//!                                                  └──────────────┘
//!                                                     │        │
//!                                                     ▼        ▼
//!                                               ┌────────┐ ┌────────┐
//!                                               │ Speech │ │ Alert  │
//!                                               │        │ │ log    │
//!                                               └────────┘ └────────┘
//! ```

pub mod alerts;
pub mod api;
pub mod bin_state;
pub mod config;
pub mod mqtt_subscriber;
pub mod notifier;
pub mod recorder;

pub use alerts::{AlertEvaluator, AlertResponse};
pub use api::AppState;
pub use bin_state::{fill_percentage, BinState, SensorReading, SharedBinState};
pub use config::Config;
pub use mqtt_subscriber::{ReadingHandler, SensorSubscriber, SubscriberError};
pub use notifier::{Notifier, NotifyError, SpeechNotifier};
pub use recorder::{FileRecorder, RecordError, Recorder};
