//! Alert subject and body composition

use chrono::Utc;

use super::tier::Transition;
use crate::config::WatchedFile;

/// A composed alert, ready for the notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    pub fn compose(
        service: &str,
        file: &WatchedFile,
        match_count: u64,
        previous_tier: usize,
        tier: usize,
        transition: Transition,
    ) -> Self {
        let change = match transition {
            Transition::Escalated => format!("escalated to tier {}", tier),
            Transition::DeEscalated => format!("de-escalated to tier {}", tier),
            Transition::Recovered => "recovered".to_string(),
            Transition::Unchanged => format!("still at tier {}", tier),
        };

        let subject = format!("[logchecker] {}: {} {}", service, file.path, change);

        let direction = if file.increase {
            "rise above boundary"
        } else {
            "fall below boundary"
        };
        let pattern = if file.pattern.is_empty() {
            "(any line)"
        } else {
            file.pattern.as_str()
        };

        let body = format!(
            "Service: {}\n\
             File: {}\n\
             Pattern: {}\n\
             Matches in last interval: {}\n\
             Boundary: {} ({} is abnormal)\n\
             Limits: {:?}\n\
             Tier: {} -> {}\n\
             Time: {}\n",
            service,
            file.path,
            pattern,
            match_count,
            file.boundary,
            direction,
            file.limits,
            previous_tier,
            tier,
            Utc::now().to_rfc3339(),
        );

        Self { subject, body }
    }
}
