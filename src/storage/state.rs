use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monitoring state of one watched file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorState {
    /// Bytes of the file already consumed
    pub offset: u64,
    /// Matches counted during the previous interval
    pub last_count: u64,
    /// Current escalation tier (0 = normal)
    pub level: usize,
    /// When the last alert for this file was delivered
    #[serde(default)]
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl MonitorState {
    /// State recorded on a baseline poll: positioned at `offset`, nothing counted
    pub fn baseline(offset: u64) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    /// Whether the file is currently in an alert tier
    pub fn is_alerting(&self) -> bool {
        self.level > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_is_normal() {
        let state = MonitorState::baseline(4096);
        assert_eq!(state.offset, 4096);
        assert_eq!(state.last_count, 0);
        assert!(!state.is_alerting());
        assert!(state.last_notified_at.is_none());
    }

    #[test]
    fn test_missing_timestamp_deserializes() {
        let state: MonitorState =
            serde_json::from_str(r#"{"offset":10,"last_count":3,"level":2}"#).unwrap();
        assert_eq!(state.level, 2);
        assert!(state.last_notified_at.is_none());
    }
}
