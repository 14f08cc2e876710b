use anyhow::{Context, Result};
use tracing::info;

use crate::azure::CloudApi;
use crate::health::Health;
use crate::inventory::InventoryWalker;
use crate::notifier::{deliver, Notifier};
use crate::report::{HealthReport, ReportSummary};
use crate::scope::ScopePlan;

/// Everything a scan pass needs, built once at startup.
pub struct Monitor<A, N> {
    api: A,
    notifier: N,
    plan: ScopePlan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    pub summary: ReportSummary,
    pub delivered: bool,
}

impl<A: CloudApi, N: Notifier> Monitor<A, N> {
    pub fn new(api: A, notifier: N, plan: ScopePlan) -> Self {
        Self { api, notifier, plan }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn plan(&self) -> &ScopePlan {
        &self.plan
    }

    /// Discover and classify every app in scope.
    pub async fn scan(&self) -> Result<HealthReport> {
        let walker = InventoryWalker::new(&self.api, self.plan.naming());
        let records = match &self.plan {
            ScopePlan::AllSubscriptions => walker
                .walk_all_subscriptions()
                .await
                .context("Failed to enumerate subscriptions")?,
            ScopePlan::Fixed(target) => walker.walk_resource_group(target).await,
        };

        let mut report = HealthReport::new(self.plan.description());
        for record in records {
            match report.buckets.insert(&record) {
                Health::Healthy => info!("Healthy: {}", record.id),
                Health::Unhealthy => info!("Unhealthy: {}: {}", record.id, record.status.text()),
            }
        }
        Ok(report)
    }

    /// One complete scan pass: discover, classify, report.
    ///
    /// Fails only when the scope itself cannot be enumerated; nothing is
    /// sent in that case.
    pub async fn run_pass(&self) -> Result<PassOutcome> {
        let report = self.scan().await?;
        let summary = report.summary();
        info!(
            "Scan complete: {} apps, {} healthy, {} unhealthy",
            summary.total_apps(),
            summary.healthy_count,
            summary.unhealthy_count
        );

        let delivered = deliver(&self.notifier, &report.to_email()).await;
        Ok(PassOutcome { summary, delivered })
    }
}
