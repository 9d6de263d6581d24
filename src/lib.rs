//! # pagehits — Page-View Counter Client
//!
//! Counts page views against a remote hit-counting service. Each page name is
//! reduced to a 53-bit [`Fingerprint`], which keys a counter in the service;
//! the counter is read or incremented over HTTP through a CORS relay.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`fingerprint`] | Pure 53-bit page-name hash, compatible with the browser-side keys |
//! | [`client`] | [`HitCounter`]: `register_hit`, `hit_count`, `hit_counts` |
//! | [`config`] | Relay / service / namespace / origin settings and their layering |
//! | [`error`] | [`CounterError`] taxonomy |
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo() -> Result<(), pagehits::CounterError> {
//! use pagehits::{CounterConfig, HitCounter};
//!
//! let counter = HitCounter::new(CounterConfig::default())?;
//! let views = counter.register_hit("home").await?;
//! println!("home has {} views", views);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fingerprint;

pub use client::{CounterOp, HitCount, HitCounter};
pub use config::{ConfigError, ConfigOverrides, CounterConfig};
pub use error::CounterError;
pub use fingerprint::{fingerprint, fingerprint_utf16, fingerprint_with_seed, Fingerprint};
