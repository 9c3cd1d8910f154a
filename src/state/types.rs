//! Persisted run state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of the last pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    /// When the run finished
    pub last_run: DateTime<Utc>,
    /// Record count per requested object type
    #[serde(default)]
    pub object_counts: BTreeMap<String, usize>,
}

impl RunState {
    /// State for a run that finished at `last_run`
    pub fn new<I, K>(last_run: DateTime<Utc>, counts: I) -> Self
    where
        I: IntoIterator<Item = (K, usize)>,
        K: Into<String>,
    {
        Self {
            last_run,
            object_counts: counts.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// State for a run finishing now
    pub fn now<I, K>(counts: I) -> Self
    where
        I: IntoIterator<Item = (K, usize)>,
        K: Into<String>,
    {
        Self::new(Utc::now(), counts)
    }

    /// Record count for `object`, if it was part of the run
    pub fn count(&self, object: &str) -> Option<usize> {
        self.object_counts.get(object).copied()
    }

    /// Sum of all object counts
    pub fn total(&self) -> usize {
        self.object_counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_run_state_wire_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let state = RunState::new(at, [("user", 12), ("card", 0)]);

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({
                "lastRun": "2024-05-01T08:00:00Z",
                "objectCounts": {"card": 0, "user": 12}
            })
        );
    }

    #[test]
    fn test_run_state_parse() {
        let state: RunState =
            serde_json::from_str(r#"{"lastRun": "2024-05-01T08:00:00+02:00"}"#).unwrap();
        assert_eq!(state.last_run, Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap());
        assert!(state.object_counts.is_empty());
    }

    #[test]
    fn test_run_state_count_and_total() {
        let state = RunState::now([("user", 3), ("expense", 7)]);
        assert_eq!(state.count("user"), Some(3));
        assert_eq!(state.count("card"), None);
        assert_eq!(state.total(), 10);
    }
}
