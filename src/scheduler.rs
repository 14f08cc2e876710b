use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info};

use crate::azure::CloudApi;
use crate::monitor::Monitor;
use crate::notifier::Notifier;

/// Pause between the end of one pass and the start of the next.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(120);

/// Decides when the next pass starts, or that there is none.
#[async_trait]
pub trait Schedule: Send {
    /// Wait until the next pass is due. `false` stops the loop.
    async fn wait_next(&mut self) -> bool;
}

/// Sleeps a fixed period between passes, forever.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    period: Duration,
}

impl FixedInterval {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self::new(SCAN_INTERVAL)
    }
}

#[async_trait]
impl Schedule for FixedInterval {
    async fn wait_next(&mut self) -> bool {
        info!("Waiting {}s before next check...", self.period.as_secs());
        tokio::time::sleep(self.period).await;
        true
    }
}

/// Allows a fixed number of passes back to back.
#[derive(Debug, Clone)]
pub struct LimitedPasses {
    remaining: usize,
}

impl LimitedPasses {
    pub fn new(passes: usize) -> Self {
        Self { remaining: passes.saturating_sub(1) }
    }
}

#[async_trait]
impl Schedule for LimitedPasses {
    async fn wait_next(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Run passes sequentially until the schedule stops. Returns the pass count.
///
/// A pass that fails is logged and the loop carries on.
pub async fn run<A, N, S>(monitor: &Monitor<A, N>, schedule: &mut S) -> usize
where
    A: CloudApi,
    N: Notifier,
    S: Schedule + ?Sized,
{
    let mut passes = 0;
    loop {
        passes += 1;
        if let Err(e) = monitor.run_pass().await {
            error!("Scan pass {} failed: {:#}", passes, e);
        }
        if !schedule.wait_next().await {
            return passes;
        }
    }
}
