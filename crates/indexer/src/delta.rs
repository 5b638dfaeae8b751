use serde::{Deserialize, Serialize};

/// How an indexing run concluded. "Nothing to do" states are successful
/// outcomes with a descriptive status, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    /// No key-bearing input against an empty store.
    NoData,
    /// First build: the whole batch was embedded into a fresh store.
    BuiltFromAll,
    /// Every incoming record was already indexed with identical content.
    NoNewOrChanged,
    /// New/changed rows were appended to an existing store.
    IncrementalOk,
}

impl IndexOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::BuiltFromAll => "built_from_all",
            Self::NoNewOrChanged => "no_new_or_changed",
            Self::IncrementalOk => "incremental_ok",
        }
    }
}

/// Summary of one indexing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDelta {
    /// Rows appended (new and changed records).
    pub added: usize,
    /// Records considered but not embedded: unchanged content or no
    /// derivable key.
    pub skipped: usize,
    /// Total rows in the store after the run.
    pub index_size: usize,
    pub outcome: IndexOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_snake_case() {
        let json = serde_json::to_string(&IndexOutcome::BuiltFromAll).unwrap();
        assert_eq!(json, "\"built_from_all\"");
        assert_eq!(IndexOutcome::NoNewOrChanged.as_str(), "no_new_or_changed");
    }
}
