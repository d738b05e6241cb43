use crate::pipeline::Pipeline;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

pub const DAILY: Duration = Duration::from_secs(24 * 60 * 60);

/// Triggers a pipeline run on a fixed cadence. Runs are awaited inline, so a
/// slow run delays the next tick rather than overlapping it, and ticks missed
/// while a run was active are dropped instead of replayed.
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn daily() -> Self {
        Self::new(DAILY)
    }

    /// Runs until ctrl-c. A failed run is logged and the schedule continues.
    pub async fn run(&self, pipeline: &Pipeline) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Scheduler started, running every {:?}", self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match pipeline.run_once().await {
                        Ok(report) => info!("Scheduled run succeeded: {:?}", report),
                        Err(e) => error!("Scheduled run failed: {}", e),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
            }
        }
    }
}
