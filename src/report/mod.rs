use crate::health::{BucketMap, HealthBuckets};
use crate::types::AppRecord;

pub const REPORT_SUBJECT: &str = "[Pangea] Container Apps Health Report";

const GREETING: &str = "Dear Pangea Production Team,";
const HEALTHY_HEADER: &str = "✅ Healthy Container Apps:";
const NO_HEALTHY: &str = "✅ No healthy apps found.";
const UNHEALTHY_HEADER: &str = "⚠️ Unhealthy or Problematic Container Apps:";
const NO_UNHEALTHY: &str = "🎉 No unhealthy apps detected.";
const SIGN_OFF: &str = "This is an automated report. Please take action if necessary.\n\nRegards,\nMonitoring System\nPangea Platform";

/// Outcome of one scan pass, ready to be rendered.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub scope_description: String,
    pub buckets: HealthBuckets,
}

/// Rendered message handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailReport {
    pub subject: String,
    pub body: String,
}

impl HealthReport {
    pub fn new(scope_description: impl Into<String>) -> Self {
        Self {
            scope_description: scope_description.into(),
            buckets: HealthBuckets::new(),
        }
    }

    pub fn from_records<'a, I>(scope_description: impl Into<String>, records: I) -> Self
    where
        I: IntoIterator<Item = &'a AppRecord>,
    {
        Self {
            scope_description: scope_description.into(),
            buckets: HealthBuckets::from_records(records),
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            healthy_count: self.buckets.healthy.len(),
            unhealthy_count: self.buckets.unhealthy.len(),
        }
    }

    pub fn to_email(&self) -> EmailReport {
        EmailReport {
            subject: REPORT_SUBJECT.to_string(),
            body: format_body(&self.scope_description, &self.buckets),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub healthy_count: usize,
    pub unhealthy_count: usize,
}

impl ReportSummary {
    pub fn total_apps(&self) -> usize {
        self.healthy_count + self.unhealthy_count
    }
}

/// Render the plain-text body. Identifiers and statuses are inserted verbatim.
pub fn format_body(scope_description: &str, buckets: &HealthBuckets) -> String {
    let mut body = String::new();
    body.push_str(GREETING);
    body.push_str("\n\n");
    body.push_str(scope_description);
    body.push_str("\n\n");

    push_section(&mut body, &buckets.healthy, HEALTHY_HEADER, NO_HEALTHY);
    body.push('\n');
    push_section(&mut body, &buckets.unhealthy, UNHEALTHY_HEADER, NO_UNHEALTHY);

    body.push('\n');
    body.push_str(SIGN_OFF);
    body
}

fn push_section(body: &mut String, bucket: &BucketMap, header: &str, empty_line: &str) {
    if bucket.is_empty() {
        body.push_str(empty_line);
        body.push('\n');
        return;
    }
    body.push_str(header);
    body.push('\n');
    for (id, status) in bucket.iter() {
        body.push_str(&format!("  - {}: {}\n", id, status));
    }
}
