//! # chatinsights-core
//!
//! Core library for chatinsights - per-contact statistics mined from a chat
//! history (messages and call logs).
//!
//! This library provides:
//! - The event model: messages, calls and chat jids
//! - A contact registry with display-name grouping and reconciliation
//!   from a second contact source
//! - Insighters: streaming per-contact statistics with deterministic rankings
//! - The insighter manager, chart-race timeline and JSON rank export
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Data flow
//!
//! Loaders outside this crate produce [`ChatDump`]s. Events are pushed
//! through an [`InsighterManager`], which filters out broadcast lists and
//! group chats, maps every jid to its canonical identity, and feeds the
//! insighters. Reports are then read out per insighter.
//!
//! Grouping by display name merges every contact sharing an identical name,
//! including unrelated people who happen to share one.
//!
//! ## Example
//!
//! ```rust,no_run
//! use chatinsights_core::{ChatDump, Config, ContactRegistry, InsighterManager};
//! use std::path::Path;
//!
//! let config = Config::load().expect("failed to load config");
//! let dump = ChatDump::from_path(Path::new("dump.json")).expect("failed to load dump");
//! let registry = ContactRegistry::from_entries(dump.contacts.clone());
//!
//! let mut manager = InsighterManager::from_config(&config).expect("invalid config");
//! manager.run(&dump.events, &registry).expect("malformed jid");
//! for report in manager.reports() {
//!     println!("{}: {:?}", report.title, report.winner.map(|w| w.formatted_value));
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use contacts::{resolve_identity, Contact, ContactEntry, ContactRegistry, MergeOptions};
pub use error::{Error, Result};
pub use input::ChatDump;
pub use insights::{InsightReport, InsighterKind, InsighterManager, ManagerOptions, RankEntry};
pub use types::*;

// Public modules
pub mod config;
pub mod contacts;
pub mod error;
pub mod format;
pub mod input;
pub mod insights;
pub mod logging;
pub mod types;
