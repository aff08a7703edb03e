//! Threshold escalation for watched files
//!
//! Each poll turns a match count into a tier, compares it with the tier
//! stored for the file, persists the new state and, on a notifiable
//! transition, asks the notifier to send an alert. Repeated polls at the
//! same tier never notify again.

pub mod engine;
pub mod message;
pub mod tier;

pub use engine::{EscalationEngine, FileMonitor, PollError, PollOutcome};
pub use message::AlertMessage;
pub use tier::{compute_tier, NotifyPolicy, Transition};
