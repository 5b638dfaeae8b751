use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ID_FIELD: &str = "Issue id";
pub const BODY_FIELD: &str = "Summary";
pub const OWNER_FIELD: &str = "Assignee";

/// One incoming ticket/issue: a free-form JSON object. The designated key
/// field, the fallback id field, and the body field are all optional; which
/// of them yields the logical key is decided by [`KeyExtractor`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IssueRecord(pub Map<String, Value>);

impl IssueRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Non-empty string value of `field`, if present.
    pub fn field(&self, field: &str) -> Option<&str> {
        match self.0.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.0.insert(field.to_string(), Value::String(value.into()));
    }

    /// Text used for embedding. Missing body embeds as the empty string,
    /// matching the stored-row convention.
    pub fn body(&self) -> &str {
        self.field(BODY_FIELD).unwrap_or("")
    }

    pub fn owner(&self) -> Option<&str> {
        self.field(OWNER_FIELD)
    }

    pub fn id(&self) -> Option<&str> {
        self.field(ID_FIELD)
    }
}

/// Ordered list of field lookups tried in sequence until one yields a
/// non-empty value: the configured key field, then the id field, then the
/// body text.
#[derive(Debug, Clone)]
pub struct KeyExtractor {
    strategies: Vec<String>,
}

impl KeyExtractor {
    /// The standard chain for `key_field`: key field -> id field -> body.
    pub fn for_key_field(key_field: &str) -> Self {
        Self {
            strategies: vec![
                key_field.to_string(),
                ID_FIELD.to_string(),
                BODY_FIELD.to_string(),
            ],
        }
    }

    pub fn with_strategies(strategies: Vec<String>) -> Self {
        Self { strategies }
    }

    /// Logical key for `record`, or `None` when no strategy yields a value.
    /// Keyless records are silently excluded from indexing and matching.
    pub fn extract(&self, record: &IssueRecord) -> Option<String> {
        self.strategies
            .iter()
            .find_map(|field| record.field(field))
            .map(ToString::to_string)
    }
}

/// Denormalized provenance stored alongside one embedding row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowMeta {
    pub key: String,
    pub id: Option<String>,
    pub body: String,
    pub owner: Option<String>,
}

impl RowMeta {
    pub fn from_record(key: String, record: &IssueRecord) -> Self {
        Self {
            key,
            id: record.id().map(ToString::to_string),
            body: record.body().to_string(),
            owner: record.owner().map(ToString::to_string),
        }
    }

    /// Content identity for change detection is (body, owner); the key and
    /// id fields never mark a row as changed on their own.
    pub fn content_matches(&self, record: &IssueRecord) -> bool {
        self.body == record.body() && self.owner.as_deref() == record.owner()
    }
}
