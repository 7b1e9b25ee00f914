use crate::{AppCommand, AppError, AppResult};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use tokio::{
    sync::{mpsc, watch},
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, instrument};

/// Periodically requests an update check.
///
/// The first tick fires after `startup_delay`, then every `interval`.
/// Ticks missed while the machine slept are not replayed.
pub struct CheckScheduler {
    command_tx: mpsc::Sender<AppCommand>,
    startup_delay: Duration,
    interval: Duration,
}

impl CheckScheduler {
    /// Create a scheduler feeding `command_tx`.
    pub fn new(
        command_tx: mpsc::Sender<AppCommand>,
        startup_delay: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            command_tx,
            startup_delay,
            interval,
        }
    }

    /// Run until `shutdown_rx` flips to `true` or the app loop goes away.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        let mut ticker = time::interval_at(Instant::now() + self.startup_delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            startup_delay_secs = self.startup_delay.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Check scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let command = AppCommand::check();
                    debug!(?command, "Scheduled check due");
                    self.command_tx.send(command).await.map_err(|e| {
                        AppError::ChannelSendFailed {
                            message: format!("Failed to send scheduled check: {}", e),
                            location: ErrorLocation::from(Location::caller()),
                        }
                    })?;
                }

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Check scheduler stopped");
                        return Ok(());
                    }
                }
            }
        }
    }
}
