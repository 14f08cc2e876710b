use crate::types::AppRecord;

/// Provisioning states treated as healthy. Matching is exact and case-sensitive.
pub const HEALTHY_STATES: &[&str] = &["Succeeded", "Running"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy,
}

pub fn classify(state: &str) -> Health {
    if HEALTHY_STATES.contains(&state) {
        Health::Healthy
    } else {
        Health::Unhealthy
    }
}

/// Identifier -> status text, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketMap {
    entries: Vec<(String, String)>,
}

impl BucketMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace in place, keeping the original position.
    pub fn insert(&mut self, id: String, status: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = status,
            None => self.entries.push((id, status)),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(existing, _)| existing == id)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, status)| status.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, status)| (id.as_str(), status.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The healthy/unhealthy partition of one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthBuckets {
    pub healthy: BucketMap,
    pub unhealthy: BucketMap,
}

impl HealthBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AppRecord>,
    {
        let mut buckets = Self::new();
        for record in records {
            buckets.insert(record);
        }
        buckets
    }

    /// Place a record in exactly one bucket, evicting any earlier entry for
    /// the same identifier from the other one.
    pub fn insert(&mut self, record: &AppRecord) -> Health {
        let status = record.status.text();
        let health = classify(&status);
        match health {
            Health::Healthy => {
                self.unhealthy.remove(&record.id);
                self.healthy.insert(record.id.clone(), status);
            }
            Health::Unhealthy => {
                self.healthy.remove(&record.id);
                self.unhealthy.insert(record.id.clone(), status);
            }
        }
        health
    }

    pub fn total(&self) -> usize {
        self.healthy.len() + self.unhealthy.len()
    }
}
