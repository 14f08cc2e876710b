use serde::Deserialize;

use crate::types::{ContainerAppInfo, ResourceGroupInfo, SubscriptionInfo};

/// One page of an ARM list response.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: String,
    pub display_name: Option<String>,
}

impl From<Subscription> for SubscriptionInfo {
    fn from(s: Subscription) -> Self {
        let display_name = s.display_name.unwrap_or_else(|| s.subscription_id.clone());
        SubscriptionInfo {
            id: s.subscription_id,
            display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResourceGroup {
    pub name: String,
}

impl From<ResourceGroup> for ResourceGroupInfo {
    fn from(rg: ResourceGroup) -> Self {
        ResourceGroupInfo { name: rg.name }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContainerApp {
    pub name: String,
    pub properties: Option<ContainerAppProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppProperties {
    pub provisioning_state: Option<String>,
}

impl From<ContainerApp> for ContainerAppInfo {
    fn from(app: ContainerApp) -> Self {
        ContainerAppInfo {
            name: app.name,
            provisioning_state: app.properties.and_then(|p| p.provisioning_state),
        }
    }
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_app_page_decoding() {
        let body = r#"{
            "value": [
                {"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.App/containerApps/api",
                 "name": "api",
                 "properties": {"provisioningState": "Succeeded", "runningStatus": "Running"}},
                {"name": "worker"}
            ],
            "nextLink": "https://management.azure.com/next"
        }"#;
        let page: Page<ContainerApp> = serde_json::from_str(body).unwrap();
        assert_eq!(page.next_link.as_deref(), Some("https://management.azure.com/next"));

        let apps: Vec<ContainerAppInfo> = page.value.into_iter().map(Into::into).collect();
        assert_eq!(apps[0].name, "api");
        assert_eq!(apps[0].provisioning_state.as_deref(), Some("Succeeded"));
        assert_eq!(apps[1].provisioning_state, None);
    }

    #[test]
    fn test_subscription_without_display_name_uses_id() {
        let sub: Subscription = serde_json::from_str(r#"{"subscriptionId": "abc", "state": "Enabled"}"#).unwrap();
        let info: SubscriptionInfo = sub.into();
        assert_eq!(info.id, "abc");
        assert_eq!(info.display_name, "abc");
    }

    #[test]
    fn test_empty_page() {
        let page: Page<ResourceGroup> = serde_json::from_str("{}").unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }
}
