// Public modules
pub mod types;
pub mod config;
pub mod credential;
pub mod azure;
pub mod scope;
pub mod inventory;
pub mod health;
pub mod report;
pub mod notifier;
pub mod monitor;
pub mod scheduler;

// Re-export commonly used items
pub use types::*;
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use credential::{build_credential, AccessToken, CredentialError, TokenCredential};
pub use azure::{ApiError, ArmClient, CloudApi, MockCloudApi};
pub use scope::{parse_selection, ScopePlan, ScriptedSelector, Selector, TerminalSelector};
pub use inventory::InventoryWalker;
pub use health::{classify, BucketMap, Health, HealthBuckets, HEALTHY_STATES};
pub use report::{format_body, EmailReport, HealthReport, ReportSummary, REPORT_SUBJECT};
pub use notifier::{deliver, Notifier, RecordingNotifier, SmtpNotifier};
pub use monitor::{Monitor, PassOutcome};
pub use scheduler::{FixedInterval, LimitedPasses, Schedule, SCAN_INTERVAL};
