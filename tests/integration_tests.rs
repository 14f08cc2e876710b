use std::collections::HashSet;
use std::sync::Arc;

use container_apps_health_reporter::credential::StaticCredential;
use container_apps_health_reporter::{
    classify, load_config_with_env, scheduler, ArmClient, Health, HealthBuckets, HealthReport,
    InventoryWalker, LimitedPasses, MockCloudApi, MockEnvironment, Monitor, RecordingNotifier,
    ScanMode, ScopePlan, ScriptedSelector, TargetScope, AppNaming, AppRecord, AppStatus,
};

fn production_api() -> MockCloudApi {
    MockCloudApi::new()
        .with_subscription("sub-1", "Production")
        .with_subscription("sub-2", "Staging")
        .with_resource_group("sub-1", "rg-api")
        .with_resource_group("sub-1", "rg-jobs")
        .with_resource_group("sub-2", "rg-stage")
        .with_app("sub-1", "rg-api", "gateway", "Succeeded")
        .with_app("sub-1", "rg-api", "auth", "Failed")
        .with_failing_app("sub-1", "rg-api", "billing", "timeout")
        .with_app("sub-1", "rg-jobs", "nightly", "Running")
        .with_app("sub-2", "rg-stage", "gateway", "InProgress")
}

#[test]
fn test_classification_property() {
    for state in ["Succeeded", "Running"] {
        assert_eq!(classify(state), Health::Healthy);
    }
    for state in ["", "Unknown", "Failed", "Canceled", "Error: timeout", "running", "SUCCEEDED"] {
        assert_eq!(classify(state), Health::Unhealthy, "state {:?}", state);
    }
}

#[tokio::test]
async fn test_pass_partitions_every_discovered_app() {
    let api = production_api();
    let plan = ScopePlan::AllSubscriptions;
    let records = InventoryWalker::new(&api, plan.naming())
        .walk_all_subscriptions()
        .await
        .unwrap();
    let buckets = HealthBuckets::from_records(&records);

    let discovered: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    let healthy: HashSet<&str> = buckets.healthy.iter().map(|(id, _)| id).collect();
    let unhealthy: HashSet<&str> = buckets.unhealthy.iter().map(|(id, _)| id).collect();

    assert_eq!(discovered.len(), 5);
    assert!(healthy.is_disjoint(&unhealthy));
    assert_eq!(healthy.union(&unhealthy).copied().collect::<HashSet<_>>(), discovered);

    assert_eq!(
        buckets.healthy.iter().collect::<Vec<_>>(),
        vec![
            ("Production/rg-api/gateway", "Succeeded"),
            ("Production/rg-jobs/nightly", "Running"),
        ]
    );
    assert_eq!(
        buckets.unhealthy.iter().collect::<Vec<_>>(),
        vec![
            ("Production/rg-api/auth", "Failed"),
            ("Production/rg-api/billing", "Error: timeout"),
            ("Staging/rg-stage/gateway", "InProgress"),
        ]
    );
}

#[tokio::test]
async fn test_resource_group_listing_failure_is_contained() {
    let api = production_api().fail_app_list("sub-1", "rg-api", "AuthorizationFailed");
    let monitor = Monitor::new(api, RecordingNotifier::new(), ScopePlan::AllSubscriptions);

    let outcome = monitor.run_pass().await.unwrap();

    assert_eq!(outcome.summary.healthy_count, 1);
    assert_eq!(outcome.summary.unhealthy_count, 1);
    let body = &monitor.notifier().sent()[0].body;
    assert!(!body.contains("rg-api"));
    assert!(body.contains("Production/rg-jobs/nightly: Running"));
}

#[test]
fn test_two_app_example() {
    let records = vec![
        AppRecord { id: "svc-a".into(), status: AppStatus::Reported("Running".into()) },
        AppRecord { id: "svc-b".into(), status: AppStatus::Reported("Failed".into()) },
    ];
    let report = HealthReport::from_records("scope", &records);

    assert_eq!(report.buckets.healthy.get("svc-a"), Some("Running"));
    assert_eq!(report.buckets.unhealthy.get("svc-b"), Some("Failed"));
    assert_eq!(report.buckets.total(), 2);

    let body = report.to_email().body;
    let healthy_header = body.find("✅ Healthy Container Apps:").unwrap();
    let unhealthy_header = body.find("⚠️ Unhealthy or Problematic Container Apps:").unwrap();
    let svc_a = body.find("svc-a: Running").unwrap();
    let svc_b = body.find("svc-b: Failed").unwrap();
    assert!(healthy_header < svc_a && svc_a < unhealthy_header);
    assert!(unhealthy_header < svc_b);

    // Re-rendering the same buckets yields the same text
    assert_eq!(body, report.to_email().body);
}

#[test]
fn test_only_unhealthy_apps() {
    let records = vec![AppRecord {
        id: "svc-c".into(),
        status: AppStatus::LookupFailed("timeout".into()),
    }];
    let body = HealthReport::from_records("scope", &records).to_email().body;

    assert!(body.contains("✅ No healthy apps found."));
    assert!(body.contains("  - svc-c: Error: timeout"));
}

#[tokio::test]
async fn test_interactive_scope_drives_bare_names() {
    let api = production_api();
    let selector = ScriptedSelector::new(["1", "1"]);
    let plan = ScopePlan::resolve(&ScanMode::Interactive, &api, &selector).await.unwrap();
    assert_eq!(plan.naming(), AppNaming::Bare);

    let monitor = Monitor::new(api, RecordingNotifier::new(), plan);
    let report = monitor.scan().await.unwrap();

    assert_eq!(report.buckets.healthy.get("gateway"), Some("Succeeded"));
    assert_eq!(report.buckets.unhealthy.get("auth"), Some("Failed"));
    assert_eq!(report.buckets.unhealthy.get("billing"), Some("Error: timeout"));
    assert!(report.scope_description.contains("rg-api"));
}

#[test]
fn test_config_environment_isolation() {
    let empty_env = MockEnvironment::new();
    assert!(load_config_with_env(&empty_env).is_err());

    let env = MockEnvironment::new()
        .with_var("EMAIL", "monitor@example.com")
        .with_var("EMAIL_PASSWORD", "pw")
        .with_var("SCAN_MODE", "resource-group")
        .with_var("AZURE_SUBSCRIPTION_ID", "sub-1")
        .with_var("AZURE_RESOURCE_GROUP", "rg-api");

    let config = load_config_with_env(&env).unwrap();
    assert_eq!(config.email_recipient, "monitor@example.com");

    let api = MockCloudApi::new();
    let plan = tokio_test::block_on(ScopePlan::resolve(&config.scan_mode, &api, &ScriptedSelector::default())).unwrap();
    assert_eq!(
        plan,
        ScopePlan::Fixed(TargetScope {
            subscription_id: "sub-1".into(),
            subscription_name: "sub-1".into(),
            resource_group: "rg-api".into(),
        })
    );
}

#[tokio::test]
async fn test_end_to_end_against_management_api() {
    let mut server = mockito::Server::new_async().await;
    let _subs = server
        .mock("GET", "/subscriptions")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"value": [{"subscriptionId": "s1", "displayName": "Prod"}]}"#)
        .create_async()
        .await;
    let _groups = server
        .mock("GET", "/subscriptions/s1/resourcegroups")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"value": [{"name": "rg-a"}]}"#)
        .create_async()
        .await;
    let _apps = server
        .mock("GET", "/subscriptions/s1/resourceGroups/rg-a/providers/Microsoft.App/containerApps")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"value": [{"name": "web"}, {"name": "queue"}]}"#)
        .create_async()
        .await;
    let _web = server
        .mock("GET", "/subscriptions/s1/resourceGroups/rg-a/providers/Microsoft.App/containerApps/web")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"name": "web", "properties": {"provisioningState": "Succeeded"}}"#)
        .create_async()
        .await;
    let _queue = server
        .mock("GET", "/subscriptions/s1/resourceGroups/rg-a/providers/Microsoft.App/containerApps/queue")
        .match_query(mockito::Matcher::Any)
        .with_status(500)
        .with_body(r#"{"error": {"code": "InternalServerError", "message": "timeout"}}"#)
        .create_async()
        .await;

    let api = ArmClient::new(&server.url(), Arc::new(StaticCredential::new("token")));
    let monitor = Monitor::new(api, RecordingNotifier::new(), ScopePlan::AllSubscriptions);

    let passes = scheduler::run(&monitor, &mut LimitedPasses::new(1)).await;
    assert_eq!(passes, 1);

    let sent = monitor.notifier().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "[Pangea] Container Apps Health Report");
    assert!(sent[0].body.contains("  - Prod/rg-a/web: Succeeded"));
    assert!(sent[0].body.contains("  - Prod/rg-a/queue: Error: timeout"));
}
