use crate::bin_state::SharedBinState;
use crate::notifier::Notifier;
use crate::recorder::Recorder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Message announced and recorded when the bin needs emptying
pub const ALERT_MESSAGE: &str = "Bin is over 80% full. Please empty it!";

/// Message returned while the bin is below the threshold
pub const BELOW_THRESHOLD_MESSAGE: &str = "Bin is below the alert threshold.";

/// Outcome of an alert check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResponse {
    pub alert: bool,
    pub message: String,
}

/// Compares the bin state against the fill threshold and raises alerts
///
/// Every check at or above the threshold announces the alert and records
/// it. There is no memory of earlier alerts between checks.
#[derive(Clone)]
pub struct AlertEvaluator {
    state: SharedBinState,
    threshold_percentage: f64,
    notifier: Arc<dyn Notifier>,
    recorder: Arc<dyn Recorder>,
}

impl AlertEvaluator {
    pub fn new(
        state: SharedBinState,
        threshold_percentage: f64,
        notifier: Arc<dyn Notifier>,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self {
            state,
            threshold_percentage,
            notifier,
            recorder,
        }
    }

    /// Evaluate the current state, announcing and recording an alert if due.
    ///
    /// The state is snapshotted before the notifier runs; no lock is held
    /// while the announcement blocks. Announcing and recording run on their
    /// own task, so dropping the returned future (a client hanging up) does
    /// not cut the announcement short or skip the record.
    #[instrument(skip(self))]
    pub async fn check_alert(&self) -> AlertResponse {
        let snapshot = self.state.read();

        if snapshot.fill_percentage < self.threshold_percentage {
            debug!(
                fill_percentage = snapshot.fill_percentage,
                threshold = self.threshold_percentage,
                "Bin below alert threshold"
            );
            return AlertResponse {
                alert: false,
                message: BELOW_THRESHOLD_MESSAGE.to_string(),
            };
        }

        let message = ALERT_MESSAGE.to_string();
        info!(
            fill_percentage = snapshot.fill_percentage,
            distance_mm = snapshot.distance_mm,
            threshold = self.threshold_percentage,
            "Bin fill alert"
        );
        metrics::counter!("binwatch.alerts.triggered").increment(1);

        let notifier = Arc::clone(&self.notifier);
        let recorder = Arc::clone(&self.recorder);
        let side_effects = tokio::spawn({
            let message = message.clone();
            async move {
                if let Err(e) = notifier.notify(&message).await {
                    error!(error = %e, "Failed to announce alert");
                }

                if let Err(e) = recorder.record(&message).await {
                    error!(error = %e, "Failed to record alert");
                }
            }
        });

        if let Err(e) = side_effects.await {
            if e.is_panic() {
                std::panic::resume_unwind(e.into_panic());
            }
            error!(error = %e, "Alert side effects task failed");
        }

        AlertResponse {
            alert: true,
            message,
        }
    }
}
