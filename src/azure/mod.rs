// Azure Resource Manager boundary
pub mod models;
pub mod mock;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::credential::{CredentialError, TokenCredential};
use crate::types::{ContainerAppInfo, ResourceGroupInfo, SubscriptionInfo};
use models::{ContainerApp, ErrorResponse, Page, ResourceGroup, Subscription};

pub use mock::MockCloudApi;

pub const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";
pub const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";
pub const CONTAINER_APPS_API_VERSION: &str = "2023-05-01";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success response from the management API.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("Unknown"))]
    HttpResponse {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Credential(#[from] CredentialError),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Human-readable message recorded against an app whose lookup failed.
    pub fn message(&self) -> String {
        match self {
            ApiError::HttpResponse { message, .. } => {
                message.clone().unwrap_or_else(|| "Unknown".to_string())
            }
            other => other.to_string(),
        }
    }
}

/// One page of resource groups and the link to the next, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceGroupPage {
    pub groups: Vec<ResourceGroupInfo>,
    pub next_link: Option<String>,
}

/// The management-plane operations a scan pass consumes.
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionInfo>, ApiError>;

    /// First page when `next_link` is `None`, otherwise the page it points at.
    async fn resource_groups_page(
        &self,
        subscription_id: &str,
        next_link: Option<&str>,
    ) -> Result<ResourceGroupPage, ApiError>;

    /// Every resource group of a subscription. Fails if any page fails.
    async fn list_resource_groups(&self, subscription_id: &str) -> Result<Vec<ResourceGroupInfo>, ApiError> {
        let mut groups = Vec::new();
        let mut next: Option<String> = None;
        loop {
            let page = self.resource_groups_page(subscription_id, next.as_deref()).await?;
            groups.extend(page.groups);
            match page.next_link {
                Some(link) => next = Some(link),
                None => return Ok(groups),
            }
        }
    }

    async fn list_container_apps(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<Vec<ContainerAppInfo>, ApiError>;

    async fn get_container_app(
        &self,
        subscription_id: &str,
        resource_group: &str,
        app_name: &str,
    ) -> Result<ContainerAppInfo, ApiError>;
}

/// REST client for Azure Resource Manager.
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    credential: Arc<dyn TokenCredential>,
}

impl ArmClient {
    pub fn new(endpoint: &str, credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credential,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let token = self.credential.get_token().await?;
        debug!("GET {}", url);
        let res = self
            .http
            .get(url)
            .bearer_auth(&token.token)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(http_error(status.as_u16(), &body));
        }

        let body = res.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Collect every page of a list operation, following `nextLink`.
    async fn list_all<T: DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut next = Some(first_url);
        while let Some(url) = next {
            let page: Page<T> = self.get_json(&url).await?;
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }
        Ok(items)
    }

    fn container_apps_url(&self, subscription_id: &str, resource_group: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.App/containerApps",
            self.endpoint, subscription_id, resource_group
        )
    }
}

fn http_error(status: u16, body: &str) -> ApiError {
    let (code, message) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => (parsed.error.code, parsed.error.message),
        Err(_) => (None, None),
    };
    ApiError::HttpResponse { status, code, message }
}

#[async_trait]
impl CloudApi for ArmClient {
    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionInfo>, ApiError> {
        let url = format!("{}/subscriptions?api-version={}", self.endpoint, SUBSCRIPTIONS_API_VERSION);
        let subs: Vec<Subscription> = self.list_all(url).await?;
        Ok(subs.into_iter().map(Into::into).collect())
    }

    async fn resource_groups_page(
        &self,
        subscription_id: &str,
        next_link: Option<&str>,
    ) -> Result<ResourceGroupPage, ApiError> {
        let url = match next_link {
            Some(link) => link.to_string(),
            None => format!(
                "{}/subscriptions/{}/resourcegroups?api-version={}",
                self.endpoint, subscription_id, RESOURCE_GROUPS_API_VERSION
            ),
        };
        let page: Page<ResourceGroup> = self.get_json(&url).await?;
        Ok(ResourceGroupPage {
            groups: page.value.into_iter().map(Into::into).collect(),
            next_link: page.next_link.filter(|link| !link.is_empty()),
        })
    }

    async fn list_container_apps(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<Vec<ContainerAppInfo>, ApiError> {
        let url = format!(
            "{}?api-version={}",
            self.container_apps_url(subscription_id, resource_group),
            CONTAINER_APPS_API_VERSION
        );
        let apps: Vec<ContainerApp> = self.list_all(url).await?;
        Ok(apps.into_iter().map(Into::into).collect())
    }

    async fn get_container_app(
        &self,
        subscription_id: &str,
        resource_group: &str,
        app_name: &str,
    ) -> Result<ContainerAppInfo, ApiError> {
        let url = format!(
            "{}/{}?api-version={}",
            self.container_apps_url(subscription_id, resource_group),
            app_name,
            CONTAINER_APPS_API_VERSION
        );
        let app: ContainerApp = self.get_json(&url).await?;
        Ok(app.into())
    }
}
