/// Label to DID mapping used for organization handles
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// One organization handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidRecord {
    /// Handle label (the left-most hostname label)
    pub name: String,
    /// DID URI served for the label
    pub did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl DidRecord {
    pub fn new(name: impl Into<String>, did: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            did: did.into(),
            last_updated: None,
        }
    }
}

/// Anything that can answer "which DID belongs to this label"
pub trait HandleDirectory {
    /// First DID whose label matches, compared ASCII case-insensitively
    fn lookup(&self, label: &str) -> Option<&str>;

    /// All entries in scan order
    fn entries(&self) -> &[DidRecord];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    LastUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Ordered handle list; storage order is scan order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DidList(Vec<DidRecord>);

impl DidList {
    pub fn new(records: Vec<DidRecord>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<DidRecord> {
        self.0
    }

    /// Parse a persisted list
    ///
    /// Reads the canonical `[{name, did, last_updated}]` shape and the older
    /// `{name: did}` map. An empty or whitespace-only string is an empty list.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Array(_) => serde_json::from_value::<Vec<DidRecord>>(value)
                .map(Self)
                .map_err(|e| e.to_string()),
            Value::Object(map) => map
                .into_iter()
                .map(|(name, did)| match did {
                    Value::String(did) => Ok(DidRecord::new(name, did)),
                    other => Err(format!("legacy entry '{}' has non-string DID: {}", name, other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Err(format!("expected a list of handles, found {}", other)),
        }
    }

    /// Encode in the canonical list shape
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    /// Copy sorted for display
    pub fn sorted(&self, key: SortKey, order: SortOrder) -> Self {
        let mut records = self.0.clone();
        match key {
            // Case-insensitive, exact name breaks ties
            SortKey::Name => records.sort_by(|a, b| {
                a.name
                    .to_ascii_lowercase()
                    .cmp(&b.name.to_ascii_lowercase())
                    .then_with(|| a.name.cmp(&b.name))
            }),
            // Records without a timestamp sort first (None < Some)
            SortKey::LastUpdated => records.sort_by(|a, b| a.last_updated.cmp(&b.last_updated)),
        }
        if order == SortOrder::Desc {
            records.reverse();
        }
        Self(records)
    }

    /// Lower-cased labels that appear more than once
    pub fn duplicate_labels(&self) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut duplicates = HashSet::new();
        for record in &self.0 {
            let key = record.name.to_ascii_lowercase();
            if !seen.insert(key.clone()) {
                duplicates.insert(key);
            }
        }
        duplicates
    }
}

impl HandleDirectory for DidList {
    fn lookup(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|record| record.name.eq_ignore_ascii_case(label))
            .map(|record| record.did.as_str())
    }

    fn entries(&self) -> &[DidRecord] {
        &self.0
    }
}

impl From<Vec<DidRecord>> for DidList {
    fn from(records: Vec<DidRecord>) -> Self {
        Self(records)
    }
}
