use tracing::{info, warn};

use crate::azure::{ApiError, CloudApi};
use crate::types::{AppNaming, AppRecord, AppStatus, SubscriptionInfo, TargetScope};

/// State recorded when a detail response carries no provisioning state.
pub const UNKNOWN_STATE: &str = "Unknown";

/// Walks resource groups and looks up every container app in them.
pub struct InventoryWalker<'a, A: CloudApi + ?Sized> {
    api: &'a A,
    naming: AppNaming,
}

impl<'a, A: CloudApi + ?Sized> InventoryWalker<'a, A> {
    pub fn new(api: &'a A, naming: AppNaming) -> Self {
        Self { api, naming }
    }

    /// Records for every resource group of every visible subscription.
    ///
    /// Only the subscription listing itself can fail. Groups are walked as
    /// each page of them arrives, so a subscription whose later pages fail
    /// still reports the groups already listed.
    pub async fn walk_all_subscriptions(&self) -> Result<Vec<AppRecord>, ApiError> {
        let subscriptions = self.api.list_subscriptions().await?;
        let mut records = Vec::new();
        for sub in &subscriptions {
            records.extend(self.walk_subscription(sub).await);
        }
        Ok(records)
    }

    /// Walk one subscription page by page; a failed page ends the subscription.
    pub async fn walk_subscription(&self, sub: &SubscriptionInfo) -> Vec<AppRecord> {
        info!("Checking subscription: {} ({})", sub.display_name, sub.id);

        let mut records = Vec::new();
        let mut next_link: Option<String> = None;
        loop {
            let page = match self
                .api
                .resource_groups_page(&sub.id, next_link.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!("Error with subscription {}: {}", sub.display_name, e);
                    break;
                }
            };
            for group in page.groups {
                records.extend(self.walk_resource_group(&TargetScope::new(sub, group.name)).await);
            }
            match page.next_link {
                Some(link) => next_link = Some(link),
                None => break,
            }
        }
        records
    }

    /// A listing failure skips the whole group; a lookup failure marks only that app.
    pub async fn walk_resource_group(&self, target: &TargetScope) -> Vec<AppRecord> {
        info!("Resource group: {}", target.resource_group);

        let apps = match self
            .api
            .list_container_apps(&target.subscription_id, &target.resource_group)
            .await
        {
            Ok(apps) => apps,
            Err(e) => {
                warn!(
                    "Failed to list apps in resource group {}: {}",
                    target.resource_group, e
                );
                return Vec::new();
            }
        };

        let mut records = Vec::with_capacity(apps.len());
        for app in apps {
            let id = self.naming.app_id(target, &app.name);
            let status = match self
                .api
                .get_container_app(&target.subscription_id, &target.resource_group, &app.name)
                .await
            {
                Ok(details) => AppStatus::Reported(
                    details
                        .provisioning_state
                        .unwrap_or_else(|| UNKNOWN_STATE.to_string()),
                ),
                Err(e) => {
                    warn!("Failed to fetch details for {}: {}", id, e);
                    AppStatus::LookupFailed(e.message())
                }
            };
            records.push(AppRecord { id, status });
        }
        records
    }
}
