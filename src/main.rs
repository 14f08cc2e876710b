use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use container_apps_health_reporter::{
    build_credential, load_config, scheduler, ArmClient, FixedInterval, Monitor, ScopePlan,
    SmtpNotifier, TerminalSelector,
};

const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the process environment may already carry everything.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config()?;
    info!("scan mode = {:?}, auth = {:?}", cfg.scan_mode, cfg.auth_method);

    // Fail fast on credentials before the loop starts
    let credential = build_credential(&cfg);
    credential
        .get_token()
        .await
        .context("No usable Azure credential")?;

    let notifier = SmtpNotifier::from_config(&cfg)?;
    let api = ArmClient::new(&cfg.resource_manager_url, credential);
    let plan = ScopePlan::resolve(&cfg.scan_mode, &api, &TerminalSelector).await?;
    info!("{}", plan.description());

    let monitor = Monitor::new(api, notifier, plan);
    scheduler::run(&monitor, &mut FixedInterval::default()).await;

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_target(false)
        .try_init();
}

/// `RUST_LOG` when it is set and parses, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
