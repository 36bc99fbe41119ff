use crate::config::SpeechConfig;
use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Errors raised while announcing a message
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to start speech command {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Speech command {command} exited with {status}")]
    Failed { command: String, status: String },
}

/// Announces an alert message and returns once the announcement is over
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Speaks messages through an external text-to-speech program
pub struct SpeechNotifier {
    command: String,
    args: Vec<String>,
}

impl SpeechNotifier {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }
}

#[async_trait]
impl Notifier for SpeechNotifier {
    #[instrument(skip(self), fields(command = %self.command))]
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        debug!("Speaking alert");

        let status = Command::new(&self.command)
            .args(&self.args)
            .arg(message)
            .status()
            .await
            .map_err(|source| NotifyError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(NotifyError::Failed {
                command: self.command.clone(),
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

/// Writes alerts to the service log instead of speaking them
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        info!(message = %message, "Alert announcement (speech disabled)");
        Ok(())
    }
}

/// Pick the notifier matching the speech configuration
pub fn from_config(config: &SpeechConfig) -> Box<dyn Notifier> {
    if config.enabled {
        Box::new(SpeechNotifier::new(config))
    } else {
        Box::new(LogNotifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn speech_config(command: &str, args: &[&str]) -> SpeechConfig {
        SpeechConfig {
            enabled: true,
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_speech_command_success() {
        // `sh -c 'exit 0' <message>` stands in for a speech program
        let notifier = SpeechNotifier::new(&speech_config("sh", &["-c", "exit 0"]));
        assert_ok!(notifier.notify("Bin is over 80% full. Please empty it!").await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_speech_command_failure_is_reported() {
        let notifier = SpeechNotifier::new(&speech_config("sh", &["-c", "exit 3"]));
        let err = notifier.notify("hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_missing_speech_command() {
        let notifier =
            SpeechNotifier::new(&speech_config("binwatch-no-such-speech-program", &[]));
        let err = notifier.notify("hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::Spawn { .. }));
        assert!(err.to_string().contains("binwatch-no-such-speech-program"));
    }

    #[tokio::test]
    async fn test_disabled_speech_logs_only() {
        let mut config = speech_config("binwatch-no-such-speech-program", &[]);
        config.enabled = false;
        let notifier = from_config(&config);
        assert_ok!(notifier.notify("hello").await);
    }
}
