use std::fmt;

#[derive(Debug, Clone)]
pub struct Config {
    pub email_sender: String,
    pub email_password: String,
    pub email_recipient: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub scan_mode: ScanMode,
    pub auth_method: AuthMethod,
    pub service_principal: Option<ServicePrincipalSecret>,
    pub authority_host: String,
    pub resource_manager_url: String,
}

/// Which subscriptions and resource groups a scan pass covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    AllSubscriptions,
    ResourceGroup {
        subscription_id: String,
        resource_group: String,
    },
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    AzureCli,
    ServicePrincipal,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServicePrincipalSecret {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

// Keep the secret out of logs.
impl fmt::Debug for ServicePrincipalSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePrincipalSecret")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerAppInfo {
    pub name: String,
    pub provisioning_state: Option<String>,
}

/// One (subscription, resource group) pair visited by a scan pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetScope {
    pub subscription_id: String,
    pub subscription_name: String,
    pub resource_group: String,
}

impl TargetScope {
    pub fn new(subscription: &SubscriptionInfo, resource_group: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription.id.clone(),
            subscription_name: subscription.display_name.clone(),
            resource_group: resource_group.into(),
        }
    }
}

/// How app identifiers are rendered in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppNaming {
    /// `<subscription name>/<resource group>/<app>`
    Qualified,
    /// Bare app name, used when the whole pass covers one resource group.
    Bare,
}

impl AppNaming {
    pub fn app_id(&self, scope: &TargetScope, app_name: &str) -> String {
        match self {
            AppNaming::Qualified => format!(
                "{}/{}/{}",
                scope.subscription_name, scope.resource_group, app_name
            ),
            AppNaming::Bare => app_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStatus {
    /// Provisioning state as reported by the platform.
    Reported(String),
    /// The detail lookup failed; holds the error message.
    LookupFailed(String),
}

impl AppStatus {
    /// Status text as it appears in the report.
    pub fn text(&self) -> String {
        match self {
            AppStatus::Reported(state) => state.clone(),
            AppStatus::LookupFailed(message) => format!("Error: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    pub id: String,
    pub status: AppStatus,
}
