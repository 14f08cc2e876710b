use anyhow::{anyhow, bail, Context, Result};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::info;

use crate::azure::CloudApi;
use crate::types::{AppNaming, ScanMode, SubscriptionInfo, TargetScope};

/// Prompt capability used by interactive scope selection.
pub trait Selector {
    /// Show `options` and return the raw answer typed by the operator.
    fn prompt(&self, message: &str, options: &[String]) -> Result<String>;
}

/// Reads the selection from the terminal.
pub struct TerminalSelector;

impl Selector for TerminalSelector {
    fn prompt(&self, message: &str, options: &[String]) -> Result<String> {
        for (i, option) in options.iter().enumerate() {
            println!("  {}. {}", i + 1, option);
        }
        inquire::Text::new(message)
            .prompt()
            .context("Failed to read selection")
    }
}

/// Replays canned answers, for tests.
#[derive(Debug, Default)]
pub struct ScriptedSelector {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedSelector {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far together with their options.
    pub fn prompts(&self) -> Vec<(String, Vec<String>)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Selector for ScriptedSelector {
    fn prompt(&self, message: &str, options: &[String]) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((message.to_string(), options.to_vec()));
        }
        self.answers
            .lock()
            .map_err(|_| anyhow!("selector poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer left for '{}'", message))
    }
}

/// Parse a 1-based selection into a 0-based index.
pub fn parse_selection(input: &str, count: usize) -> Result<usize> {
    let n: usize = input
        .trim()
        .parse()
        .with_context(|| format!("Invalid selection '{}': expected a number", input.trim()))?;
    if n == 0 || n > count {
        bail!("Selection {} out of range (1-{})", n, count);
    }
    Ok(n - 1)
}

/// The resolved scope of every scan pass for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePlan {
    /// Discover subscriptions and resource groups on every pass.
    AllSubscriptions,
    /// Exactly one resource group, fixed at startup.
    Fixed(TargetScope),
}

impl ScopePlan {
    /// Resolve the configured mode. Interactive mode prompts here, once.
    pub async fn resolve<A, S>(mode: &ScanMode, api: &A, selector: &S) -> Result<Self>
    where
        A: CloudApi + ?Sized,
        S: Selector + ?Sized,
    {
        match mode {
            ScanMode::AllSubscriptions => Ok(ScopePlan::AllSubscriptions),
            ScanMode::ResourceGroup { subscription_id, resource_group } => {
                Ok(ScopePlan::Fixed(TargetScope {
                    subscription_id: subscription_id.clone(),
                    subscription_name: subscription_id.clone(),
                    resource_group: resource_group.clone(),
                }))
            }
            ScanMode::Interactive => Ok(ScopePlan::Fixed(select_interactively(api, selector).await?)),
        }
    }

    pub fn naming(&self) -> AppNaming {
        match self {
            ScopePlan::AllSubscriptions => AppNaming::Qualified,
            ScopePlan::Fixed(_) => AppNaming::Bare,
        }
    }

    /// Scope line used in the report body.
    pub fn description(&self) -> String {
        match self {
            ScopePlan::AllSubscriptions => "Below is the health status of Azure Container Apps across all subscriptions and resource groups:".to_string(),
            ScopePlan::Fixed(target) => format!(
                "Below is the health status of Azure Container Apps in resource group '{}' (subscription {}):",
                target.resource_group, target.subscription_name
            ),
        }
    }
}

pub async fn select_interactively<A, S>(api: &A, selector: &S) -> Result<TargetScope>
where
    A: CloudApi + ?Sized,
    S: Selector + ?Sized,
{
    let subscriptions = api
        .list_subscriptions()
        .await
        .context("Failed to list subscriptions")?;
    if subscriptions.is_empty() {
        bail!("No subscriptions visible to the current credential");
    }
    let options: Vec<String> = subscriptions
        .iter()
        .map(|s| format!("{} ({})", s.display_name, s.id))
        .collect();
    let answer = selector.prompt("Select a subscription by number:", &options)?;
    let subscription: &SubscriptionInfo = &subscriptions[parse_selection(&answer, subscriptions.len())?];

    let groups = api
        .list_resource_groups(&subscription.id)
        .await
        .with_context(|| format!("Failed to list resource groups in {}", subscription.display_name))?;
    if groups.is_empty() {
        bail!("Subscription {} has no resource groups", subscription.display_name);
    }
    let options: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
    let answer = selector.prompt("Select a resource group by number:", &options)?;
    let group = &groups[parse_selection(&answer, groups.len())?];

    info!(
        "Monitoring resource group {} in subscription {}",
        group.name, subscription.display_name
    );
    Ok(TargetScope::new(subscription, group.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::MockCloudApi;

    fn api() -> MockCloudApi {
        MockCloudApi::new()
            .with_subscription("sub-1", "Production")
            .with_subscription("sub-2", "Staging")
            .with_resource_group("sub-1", "rg-api")
            .with_resource_group("sub-1", "rg-jobs")
            .with_resource_group("sub-2", "rg-stage")
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("1", 3).unwrap(), 0);
        assert_eq!(parse_selection(" 3\n", 3).unwrap(), 2);
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("two", 3).is_err());
        assert!(parse_selection("", 3).is_err());
        assert!(parse_selection("-1", 3).is_err());
    }

    #[tokio::test]
    async fn test_fixed_mode_makes_no_discovery_calls() {
        let api = api();
        let mode = ScanMode::ResourceGroup {
            subscription_id: "sub-9".to_string(),
            resource_group: "rg-fixed".to_string(),
        };
        let plan = ScopePlan::resolve(&mode, &api, &ScriptedSelector::default()).await.unwrap();

        match &plan {
            ScopePlan::Fixed(target) => assert_eq!(target.resource_group, "rg-fixed"),
            other => panic!("expected a fixed scope, got {:?}", other),
        }
        assert_eq!(plan.naming(), AppNaming::Bare);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_interactive_selection() {
        let api = api();
        let selector = ScriptedSelector::new(["1", "2"]);
        let plan = ScopePlan::resolve(&ScanMode::Interactive, &api, &selector).await.unwrap();

        assert_eq!(
            plan,
            ScopePlan::Fixed(TargetScope {
                subscription_id: "sub-1".to_string(),
                subscription_name: "Production".to_string(),
                resource_group: "rg-jobs".to_string(),
            })
        );
        let prompts = selector.prompts();
        assert_eq!(prompts[0].1, vec!["Production (sub-1)", "Staging (sub-2)"]);
        assert_eq!(prompts[1].1, vec!["rg-api", "rg-jobs"]);
        assert!(plan.description().contains("rg-jobs"));
    }

    #[tokio::test]
    async fn test_interactive_invalid_input_fails() {
        let api = api();
        let result = select_interactively(&api, &ScriptedSelector::new(["5"])).await;
        assert!(result.unwrap_err().to_string().contains("out of range"));

        let result = select_interactively(&api, &ScriptedSelector::new(["1", "abc"])).await;
        assert!(result.unwrap_err().to_string().contains("expected a number"));
    }

    #[tokio::test]
    async fn test_interactive_without_subscriptions_fails() {
        let result = select_interactively(&MockCloudApi::new(), &ScriptedSelector::default()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_all_subscriptions_description() {
        let plan = ScopePlan::AllSubscriptions;
        assert_eq!(plan.naming(), AppNaming::Qualified);
        assert!(plan.description().contains("across all subscriptions and resource groups"));
    }
}
