//! autopost - Scheduled social publishing engine
//!
//! Periodically decides, for a roster of accounts, whether an account is
//! due to publish at the current instant, and if so which single backlog
//! item to publish.
//!
//! # Architecture
//!
//! - [`schedule`] - Account due-time matching and civil-time conversion
//! - [`selector`] - Five-stage candidate filtering pipeline
//! - [`limiter`] - Adaptive outbound rate-limit gate
//! - [`runner`] - Periodic tick driver and per-tick execution
//! - [`publisher`] - Publish transports and length-based routing
//! - [`source`] - Roster/backlog collaborator seams and the file store
//! - [`models`] - Core data structures and types
//! - [`config`] - Configuration management and settings
//!
//! # Example
//!
//! ```no_run
//! use autopost::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod limiter;
pub mod models;
pub mod publisher;
pub mod runner;
pub mod schedule;
pub mod selector;
pub mod source;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::limiter::RateLimitGate;
    pub use crate::models::{Account, Candidate};
    pub use crate::publisher::PublishRouter;
    pub use crate::runner::{TickContext, TickRunner};
    pub use crate::selector::{CandidatePipeline, SelectError};
    pub use crate::source::file::JsonStore;
}

// Direct re-exports for convenience
pub use models::{Account, Candidate};
