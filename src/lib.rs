//! Logchecker: log-file monitor with tiered e-mail escalation
//!
//! Every configured file is polled on its own interval. New lines are
//! matched against a pattern, the match count is compared with a boundary
//! and a list of escalation limits, and recipients are e-mailed whenever the
//! resulting tier rises or falls back to normal.
//!
//! # Features
//!
//! - **Incremental tailing**: only bytes appended since the last poll are read
//! - **Tiered escalation**: one notification per tier change, not per poll
//! - **Pluggable state**: in-memory or on-disk backends selected by name
//! - **Status API**: optional read-only HTTP view of every file's state
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use logchecker::checker::LogChecker;
//! use logchecker::notifier::{Dispatcher, LogTransport};
//! use logchecker::storage::BackendRegistry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut checker = LogChecker::from_file("config.json")?;
//! checker.validate(&BackendRegistry::with_defaults())?;
//!
//! let notifier = Arc::new(Dispatcher::new(Arc::new(LogTransport)));
//! let scheduler = checker.start(notifier)?;
//!
//! tokio::signal::ctrl_c().await?;
//! scheduler.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod checker;
pub mod config;
pub mod escalation;
pub mod logging;
pub mod notifier;
pub mod scheduler;
pub mod storage;
pub mod tailer;

// Re-export commonly used types
pub use checker::LogChecker;
pub use config::{Config, ConfigError, Sender, Service, Settings, WatchedFile};
pub use escalation::{compute_tier, EscalationEngine, FileMonitor, PollOutcome, Transition};
pub use storage::{MonitorState, StateStore, StoreError};
