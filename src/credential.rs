use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::types::{AuthMethod, Config, ServicePrincipalSecret};

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Azure CLI could not be started ({0}); is `az` installed and on PATH?")]
    CliUnavailable(String),
    #[error("Azure CLI token request failed: {0}")]
    CliFailed(String),
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },
    #[error("could not parse token response: {0}")]
    Parse(String),
    #[error("no credential source succeeded: {}", .0.join("; "))]
    Exhausted(Vec<String>),
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_on - Duration::minutes(REFRESH_MARGIN_MINUTES) > now
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of bearer tokens for the management API.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self) -> Result<AccessToken, CredentialError>;

    /// Short label used in logs and chained-failure messages.
    fn name(&self) -> &'static str;
}

// Azure CLI

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenOutput {
    access_token: String,
    expires_on: Option<String>,
    #[serde(rename = "expires_on")]
    expires_on_unix: Option<i64>,
}

/// Delegates to the locally logged-in `az` session.
pub struct AzureCliCredential {
    program: String,
    resource: String,
    cache: Mutex<Option<AccessToken>>,
}

impl AzureCliCredential {
    pub fn new(resource: impl Into<String>) -> Self {
        Self::with_program("az", resource)
    }

    pub fn with_program(program: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            resource: resource.into(),
            cache: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<AccessToken, CredentialError> {
        let output = Command::new(&self.program)
            .args(["account", "get-access-token", "--resource", self.resource.as_str(), "--output", "json"])
            .output()
            .await
            .map_err(|e| CredentialError::CliUnavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CredentialError::CliFailed(if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            }));
        }

        parse_cli_token(&output.stdout)
    }
}

pub fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken, CredentialError> {
    let parsed: CliTokenOutput =
        serde_json::from_slice(stdout).map_err(|e| CredentialError::Parse(e.to_string()))?;

    // Newer CLIs emit `expires_on` as unix seconds; older ones only the local-time `expiresOn`.
    let expires_on = match (parsed.expires_on_unix, parsed.expires_on.as_deref()) {
        (Some(secs), _) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| CredentialError::Parse(format!("invalid expires_on {}", secs)))?,
        (None, Some(local)) => parse_cli_local_time(local)?,
        (None, None) => return Err(CredentialError::Parse("missing token expiry".to_string())),
    };

    Ok(AccessToken {
        token: parsed.access_token,
        expires_on,
    })
}

fn parse_cli_local_time(value: &str) -> Result<DateTime<Utc>, CredentialError> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| CredentialError::Parse(format!("invalid expiresOn '{}': {}", value, e)))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| CredentialError::Parse(format!("ambiguous expiresOn '{}'", value)))
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self) -> Result<AccessToken, CredentialError> {
        cached_or_refresh(&self.cache, || self.request_token()).await
    }

    fn name(&self) -> &'static str {
        "AzureCliCredential"
    }
}

// Service principal

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    expires_in: i64,
}

/// OAuth2 client-credentials flow against the identity platform.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority_host: String,
    scope: String,
    secret: ServicePrincipalSecret,
    cache: Mutex<Option<AccessToken>>,
}

impl ClientSecretCredential {
    pub fn new(authority_host: &str, resource: &str, secret: ServicePrincipalSecret) -> Self {
        Self {
            http: reqwest::Client::new(),
            authority_host: authority_host.trim_end_matches('/').to_string(),
            scope: format!("{}/.default", resource.trim_end_matches('/')),
            secret,
            cache: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<AccessToken, CredentialError> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority_host, self.secret.tenant_id);
        let res = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CredentialError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenEndpointResponse = res
            .json()
            .await
            .map_err(|e| CredentialError::Parse(e.to_string()))?;

        Ok(AccessToken {
            token: parsed.access_token,
            expires_on: Utc::now() + Duration::seconds(parsed.expires_in),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self) -> Result<AccessToken, CredentialError> {
        cached_or_refresh(&self.cache, || self.request_token()).await
    }

    fn name(&self) -> &'static str {
        "ClientSecretCredential"
    }
}

// Chain

/// Tries each source in order and returns the first token obtained.
///
/// The first source that succeeds is remembered and used alone afterwards.
pub struct ChainedCredential {
    sources: Vec<Arc<dyn TokenCredential>>,
    selected: Mutex<Option<usize>>,
}

impl ChainedCredential {
    pub fn new(sources: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self {
            sources,
            selected: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenCredential for ChainedCredential {
    async fn get_token(&self) -> Result<AccessToken, CredentialError> {
        let mut selected = self.selected.lock().await;
        if let Some(source) = (*selected).and_then(|i| self.sources.get(i)) {
            return source.get_token().await;
        }

        let mut failures = Vec::new();
        for (i, source) in self.sources.iter().enumerate() {
            match source.get_token().await {
                Ok(token) => {
                    debug!("Token acquired via {}", source.name());
                    *selected = Some(i);
                    return Ok(token);
                }
                Err(e) => {
                    warn!("{} unavailable: {}", source.name(), e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }
        Err(CredentialError::Exhausted(failures))
    }

    fn name(&self) -> &'static str {
        "ChainedCredential"
    }
}

async fn cached_or_refresh<F, Fut>(
    cache: &Mutex<Option<AccessToken>>,
    refresh: F,
) -> Result<AccessToken, CredentialError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<AccessToken, CredentialError>>,
{
    let mut guard = cache.lock().await;
    if let Some(token) = guard.as_ref() {
        if token.is_fresh(Utc::now()) {
            return Ok(token.clone());
        }
    }
    let token = refresh().await?;
    *guard = Some(token.clone());
    Ok(token)
}

/// Build the credential for the configured strategy.
///
/// The service-principal strategy falls back to the CLI session when the
/// secret is absent or rejected.
pub fn build_credential(cfg: &Config) -> Arc<dyn TokenCredential> {
    let cli: Arc<dyn TokenCredential> = Arc::new(AzureCliCredential::new(&cfg.resource_manager_url));
    match cfg.auth_method {
        AuthMethod::AzureCli => cli,
        AuthMethod::ServicePrincipal => {
            let mut sources: Vec<Arc<dyn TokenCredential>> = Vec::new();
            if let Some(secret) = &cfg.service_principal {
                sources.push(Arc::new(ClientSecretCredential::new(
                    &cfg.authority_host,
                    &cfg.resource_manager_url,
                    secret.clone(),
                )));
            }
            sources.push(cli);
            Arc::new(ChainedCredential::new(sources))
        }
    }
}

/// Static token source for tests.
pub struct StaticCredential {
    token: Option<String>,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()) }
    }

    pub fn failing() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenCredential for StaticCredential {
    async fn get_token(&self) -> Result<AccessToken, CredentialError> {
        match &self.token {
            Some(token) => Ok(AccessToken {
                token: token.clone(),
                expires_on: Utc::now() + Duration::hours(1),
            }),
            None => Err(CredentialError::CliFailed("not logged in".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "StaticCredential"
    }
}
