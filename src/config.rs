use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use crate::types::{AuthMethod, Config, ScanMode, ServicePrincipalSecret};

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_RESOURCE_MANAGER_URL: &str = "https://management.azure.com";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let email_sender = required(env, "EMAIL")?;
    let email_password = required(env, "EMAIL_PASSWORD")?;
    let email_recipient = non_empty(env, "TO_EMAIL").unwrap_or_else(|| email_sender.clone());

    let smtp_server = non_empty(env, "SMTP_SERVER")
        .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string());
    let smtp_port: u16 = match non_empty(env, "SMTP_PORT") {
        Some(v) => v.trim().parse().context("Invalid SMTP_PORT")?,
        None => DEFAULT_SMTP_PORT,
    };

    let scan_mode = match non_empty(env, "SCAN_MODE").as_deref().map(str::trim) {
        None | Some("all") => ScanMode::AllSubscriptions,
        Some("resource-group") | Some("resource_group") | Some("fixed") => ScanMode::ResourceGroup {
            subscription_id: required(env, "AZURE_SUBSCRIPTION_ID")?,
            resource_group: required(env, "AZURE_RESOURCE_GROUP")?,
        },
        Some("interactive") => ScanMode::Interactive,
        Some(other) => {
            return Err(anyhow!(
                "Invalid SCAN_MODE '{}' (expected all, resource-group or interactive)",
                other
            ))
        }
    };

    let auth_method = match non_empty(env, "AUTH_METHOD").as_deref().map(str::trim) {
        None | Some("cli") => AuthMethod::AzureCli,
        Some("service-principal") | Some("service_principal") | Some("sp") => AuthMethod::ServicePrincipal,
        Some(other) => {
            return Err(anyhow!(
                "Invalid AUTH_METHOD '{}' (expected cli or service-principal)",
                other
            ))
        }
    };

    let service_principal = load_service_principal(env)?;

    let authority_host = non_empty(env, "AZURE_AUTHORITY_HOST")
        .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string())
        .trim_end_matches('/')
        .to_string();
    let resource_manager_url = non_empty(env, "AZURE_RESOURCE_MANAGER_URL")
        .unwrap_or_else(|| DEFAULT_RESOURCE_MANAGER_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    Ok(Config {
        email_sender,
        email_password,
        email_recipient,
        smtp_server,
        smtp_port,
        scan_mode,
        auth_method,
        service_principal,
        authority_host,
        resource_manager_url,
    })
}

/// All three service-principal variables or none of them.
fn load_service_principal<E: EnvironmentProvider>(env: &E) -> Result<Option<ServicePrincipalSecret>> {
    let tenant_id = non_empty(env, "AZURE_TENANT_ID");
    let client_id = non_empty(env, "AZURE_CLIENT_ID");
    let client_secret = non_empty(env, "AZURE_CLIENT_SECRET");

    match (tenant_id, client_id, client_secret) {
        (Some(tenant_id), Some(client_id), Some(client_secret)) => Ok(Some(ServicePrincipalSecret {
            tenant_id,
            client_id,
            client_secret,
        })),
        (None, None, None) => Ok(None),
        _ => Err(anyhow!(
            "AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET must be set together"
        )),
    }
}

fn non_empty<E: EnvironmentProvider>(env: &E, key: &str) -> Option<String> {
    env.get_var(key).filter(|v| !v.trim().is_empty())
}

fn required<E: EnvironmentProvider>(env: &E, key: &str) -> Result<String> {
    non_empty(env, key).ok_or_else(|| anyhow!("{} env var must be set", key))
}
