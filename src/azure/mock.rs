use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ApiError, CloudApi, ResourceGroupPage};
use crate::types::{ContainerAppInfo, ResourceGroupInfo, SubscriptionInfo};

#[derive(Debug, Clone)]
struct MockApp {
    subscription_id: String,
    resource_group: String,
    name: String,
    /// `Err` makes the detail lookup fail with this message.
    detail: Result<Option<String>, String>,
}

/// In-memory implementation of [`CloudApi`] for tests.
///
/// Listing order follows insertion order. Failures are injected per call site.
#[derive(Debug, Default)]
pub struct MockCloudApi {
    subscriptions: Vec<SubscriptionInfo>,
    resource_groups: Vec<(String, String)>,
    apps: Vec<MockApp>,
    resource_group_page_size: Option<usize>,
    subscription_list_error: Option<String>,
    resource_group_page_errors: HashMap<(String, usize), String>,
    app_list_errors: HashMap<(String, String), String>,
    calls: Mutex<Vec<String>>,
}

impl MockCloudApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(mut self, id: &str, display_name: &str) -> Self {
        self.subscriptions.push(SubscriptionInfo {
            id: id.to_string(),
            display_name: display_name.to_string(),
        });
        self
    }

    pub fn with_resource_group(mut self, subscription_id: &str, name: &str) -> Self {
        self.resource_groups.push((subscription_id.to_string(), name.to_string()));
        self
    }

    pub fn with_app(mut self, subscription_id: &str, resource_group: &str, name: &str, state: &str) -> Self {
        self.push_app(subscription_id, resource_group, name, Ok(Some(state.to_string())));
        self
    }

    /// App whose detail response carries no provisioning state.
    pub fn with_stateless_app(mut self, subscription_id: &str, resource_group: &str, name: &str) -> Self {
        self.push_app(subscription_id, resource_group, name, Ok(None));
        self
    }

    pub fn with_failing_app(mut self, subscription_id: &str, resource_group: &str, name: &str, message: &str) -> Self {
        self.push_app(subscription_id, resource_group, name, Err(message.to_string()));
        self
    }

    pub fn fail_subscription_list(mut self, message: &str) -> Self {
        self.subscription_list_error = Some(message.to_string());
        self
    }

    /// Split resource-group listings into pages of `size` groups.
    pub fn with_resource_group_page_size(mut self, size: usize) -> Self {
        self.resource_group_page_size = Some(size.max(1));
        self
    }

    pub fn fail_resource_group_list(self, subscription_id: &str, message: &str) -> Self {
        self.fail_resource_group_page(subscription_id, 0, message)
    }

    /// Fail the zero-based `page` of a subscription's resource-group listing.
    pub fn fail_resource_group_page(mut self, subscription_id: &str, page: usize, message: &str) -> Self {
        self.resource_group_page_errors
            .insert((subscription_id.to_string(), page), message.to_string());
        self
    }

    pub fn fail_app_list(mut self, subscription_id: &str, resource_group: &str, message: &str) -> Self {
        self.app_list_errors.insert(
            (subscription_id.to_string(), resource_group.to_string()),
            message.to_string(),
        );
        self
    }

    /// Every call made so far, formatted as `operation:args`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn push_app(&mut self, subscription_id: &str, resource_group: &str, name: &str, detail: Result<Option<String>, String>) {
        self.apps.push(MockApp {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            name: name.to_string(),
            detail,
        });
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

fn failure(message: &str) -> ApiError {
    ApiError::HttpResponse {
        status: 500,
        code: Some("InternalServerError".to_string()),
        message: Some(message.to_string()),
    }
}

fn not_found(name: &str) -> ApiError {
    ApiError::HttpResponse {
        status: 404,
        code: Some("ResourceNotFound".to_string()),
        message: Some(format!("The Resource '{}' was not found.", name)),
    }
}

#[async_trait]
impl CloudApi for MockCloudApi {
    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionInfo>, ApiError> {
        self.record("list_subscriptions".to_string());
        if let Some(message) = &self.subscription_list_error {
            return Err(failure(message));
        }
        Ok(self.subscriptions.clone())
    }

    async fn resource_groups_page(
        &self,
        subscription_id: &str,
        next_link: Option<&str>,
    ) -> Result<ResourceGroupPage, ApiError> {
        let page = match next_link {
            Some(link) => link
                .strip_prefix("page:")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| ApiError::Decode(format!("bad next link '{}'", link)))?,
            None => 0,
        };
        self.record(format!("list_resource_groups:{}#{}", subscription_id, page));
        if let Some(message) = self.resource_group_page_errors.get(&(subscription_id.to_string(), page)) {
            return Err(failure(message));
        }

        let all: Vec<ResourceGroupInfo> = self
            .resource_groups
            .iter()
            .filter(|(sub, _)| sub == subscription_id)
            .map(|(_, name)| ResourceGroupInfo { name: name.clone() })
            .collect();
        let size = self.resource_group_page_size.unwrap_or(all.len().max(1));
        let start = page * size;
        let groups: Vec<ResourceGroupInfo> = all.iter().skip(start).take(size).cloned().collect();
        let next_link = (start + size < all.len()).then(|| format!("page:{}", page + 1));

        Ok(ResourceGroupPage { groups, next_link })
    }

    async fn list_container_apps(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<Vec<ContainerAppInfo>, ApiError> {
        self.record(format!("list_container_apps:{}/{}", subscription_id, resource_group));
        let key = (subscription_id.to_string(), resource_group.to_string());
        if let Some(message) = self.app_list_errors.get(&key) {
            return Err(failure(message));
        }
        // List responses deliberately omit state so callers must fetch details.
        Ok(self
            .apps
            .iter()
            .filter(|a| a.subscription_id == subscription_id && a.resource_group == resource_group)
            .map(|a| ContainerAppInfo {
                name: a.name.clone(),
                provisioning_state: None,
            })
            .collect())
    }

    async fn get_container_app(
        &self,
        subscription_id: &str,
        resource_group: &str,
        app_name: &str,
    ) -> Result<ContainerAppInfo, ApiError> {
        self.record(format!("get_container_app:{}/{}/{}", subscription_id, resource_group, app_name));
        let app = self
            .apps
            .iter()
            .find(|a| {
                a.subscription_id == subscription_id
                    && a.resource_group == resource_group
                    && a.name == app_name
            })
            .ok_or_else(|| not_found(app_name))?;

        match &app.detail {
            Ok(state) => Ok(ContainerAppInfo {
                name: app.name.clone(),
                provisioning_state: state.clone(),
            }),
            Err(message) => Err(failure(message)),
        }
    }
}
