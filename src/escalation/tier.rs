//! Tier computation and transition classification

/// Escalation tier for one interval's match count.
///
/// Both directions are normalised into a signal measuring how far past the
/// abnormal edge the count is. Tier 0 is normal; tier 1 means the boundary
/// was crossed but the first limit was not reached; tier `i + 1` means
/// `limits[i - 1]` was reached. With no limits configured the file never
/// leaves tier 0.
///
/// `limits` must be sorted ascending.
pub fn compute_tier(match_count: u64, boundary: u64, limits: &[u64], increase: bool) -> usize {
    let (signal, anomalous) = if increase {
        (match_count, match_count > boundary)
    } else {
        let deficit = boundary.saturating_sub(match_count);
        (deficit, deficit > 0)
    };

    if !anomalous || limits.is_empty() {
        return 0;
    }

    1 + limits.partition_point(|&limit| limit <= signal)
}

/// How the tier moved between two consecutive polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// Tier went up
    Escalated,
    /// Tier went down without reaching 0
    DeEscalated,
    /// Tier returned to 0
    Recovered,
}

impl Transition {
    pub fn between(previous: usize, current: usize) -> Self {
        if current > previous {
            Transition::Escalated
        } else if current == previous {
            Transition::Unchanged
        } else if current == 0 {
            Transition::Recovered
        } else {
            Transition::DeEscalated
        }
    }
}

/// Which transitions produce a notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyPolicy {
    pub notify_on_deescalation: bool,
}

impl NotifyPolicy {
    pub fn should_notify(&self, transition: Transition) -> bool {
        match transition {
            Transition::Escalated | Transition::Recovered => true,
            Transition::DeEscalated => self.notify_on_deescalation,
            Transition::Unchanged => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: [u64; 2] = [10, 20];

    #[test]
    fn test_at_or_below_boundary_is_normal() {
        for count in 0..=5 {
            assert_eq!(compute_tier(count, 5, &LIMITS, true), 0, "count {count}");
        }
    }

    #[test]
    fn test_between_boundary_and_first_limit() {
        for count in 6..10 {
            assert_eq!(compute_tier(count, 5, &LIMITS, true), 1, "count {count}");
        }
    }

    #[test]
    fn test_limit_reached() {
        assert_eq!(compute_tier(10, 5, &LIMITS, true), 2);
        assert_eq!(compute_tier(12, 5, &LIMITS, true), 2);
        assert_eq!(compute_tier(19, 5, &LIMITS, true), 2);
        assert_eq!(compute_tier(20, 5, &LIMITS, true), 3);
        assert_eq!(compute_tier(10_000, 5, &LIMITS, true), 3);
    }

    #[test]
    fn test_boundary_only_mode() {
        assert_eq!(compute_tier(100, 5, &[], true), 0);
        assert_eq!(compute_tier(0, 5, &[], false), 0);
    }

    #[test]
    fn test_decrease_direction() {
        // A log expected to carry at least 50 lines per interval
        let limits = [60, 80];
        assert_eq!(compute_tier(50, 50, &limits, false), 0);
        assert_eq!(compute_tier(200, 50, &limits, false), 0);
        assert_eq!(compute_tier(49, 50, &limits, false), 1);
        assert_eq!(compute_tier(0, 50, &limits, false), 1);
    }

    #[test]
    fn test_transition_between() {
        assert_eq!(Transition::between(0, 0), Transition::Unchanged);
        assert_eq!(Transition::between(0, 2), Transition::Escalated);
        assert_eq!(Transition::between(1, 2), Transition::Escalated);
        assert_eq!(Transition::between(3, 1), Transition::DeEscalated);
        assert_eq!(Transition::between(3, 0), Transition::Recovered);
        assert_eq!(Transition::between(2, 2), Transition::Unchanged);
    }

    #[test]
    fn test_notify_policy() {
        let policy = NotifyPolicy::default();
        assert!(policy.should_notify(Transition::Escalated));
        assert!(policy.should_notify(Transition::Recovered));
        assert!(!policy.should_notify(Transition::DeEscalated));
        assert!(!policy.should_notify(Transition::Unchanged));

        let chatty = NotifyPolicy {
            notify_on_deescalation: true,
        };
        assert!(chatty.should_notify(Transition::DeEscalated));
    }
}
