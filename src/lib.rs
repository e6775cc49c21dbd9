//! comet-scraper - Browser-driven profile scrape sessions
//!
//! A scrape-session orchestration service: clients start a session over
//! REST, the service logs into the target site with the supplied
//! credentials, walks the profile pages through a page-automation driver,
//! and persists the extracted profile as the session progresses.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`selectors`] - Target-site selector schema loaded from JSON
//! - [`actions`] - Action plans: browser step sequences as data
//! - [`driver`] - Page-automation driver boundary
//! - [`worker`] - Crawl worker executing one session's lifecycle
//! - [`watchdog`] - Per-session progress recording and time budget
//! - [`engine`] - Session orchestration
//! - [`store`] - Session persistence (memory, PostgreSQL)
//! - [`cache`] - Redis cache for the session list
//! - [`server`] - REST API surface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! use comet_scraper::cache::OptionalCache;
//! use comet_scraper::driver::NullDriverFactory;
//! use comet_scraper::engine::SessionEngine;
//! use comet_scraper::models::Credentials;
//! use comet_scraper::selectors::SelectorSchema;
//! use comet_scraper::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let schema = SelectorSchema::from_path("selectors.json")?;
//!     let engine = SessionEngine::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(OptionalCache::disabled()),
//!         Arc::new(schema),
//!         Arc::new(NullDriverFactory),
//!         Duration::from_secs(80),
//!         CancellationToken::new(),
//!     );
//!     let id = engine
//!         .start_session(Credentials {
//!             email: "user@example.com".into(),
//!             password: "secret".into(),
//!         })
//!         .await?;
//!     println!("session {id}");
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod cache;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod models;
pub mod selectors;
pub mod server;
pub mod store;
pub mod watchdog;
pub mod worker;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::SessionEngine;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{Credentials, Profile, Session, SessionStatus};
    pub use crate::selectors::SelectorSchema;
    pub use crate::store::{MemoryStore, PostgresStore, SessionStore};
}

// Direct re-exports for convenience
pub use models::{Credentials, Profile, Session, SessionStatus};
