//! Offline-first sync and cache layer for Chinese lottery draw results.
//!
//! The crate wraps a remote draw-results service behind a local SQLite
//! cache and exposes every read as an ordered sequence of
//! [`DataState`] values: `Loading` first, a cached `Success` when the
//! store has one, then the refreshed `Success` - or an `Error` only when
//! neither fresh nor cached data exists. Consumers therefore always get
//! the best available answer, degrading gracefully when the network or
//! the service misbehaves.
//!
//! # Architecture
//!
//! - [`repository::LotteryRepository`] - orchestration: cache-first reads,
//!   write-through refresh, bounded retention, live history observation
//! - [`store::DrawStore`] - SQLite persistence on a dedicated background
//!   thread, with a broadcast change feed
//! - [`api::LotteryApiClient`] - reqwest transport behind the
//!   [`api::FetchClient`] seam
//! - [`models`] - domain records and the supported game catalogue
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use drawcache::{Config, DrawStore, LotteryApiClient, LotteryRepository};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let client = Arc::new(LotteryApiClient::new(&config)?);
//! let store = DrawStore::open(&config.database_path()?).await?;
//! let repo = LotteryRepository::new(client, store, config.keep_count);
//!
//! let mut states = repo.get_latest("ssq");
//! while let Some(state) = states.recv().await {
//!     println!("{state:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod state;
pub mod store;

pub use api::{ApiError, DrawPayload, Envelope, FetchClient, LotteryApiClient};
pub use config::Config;
pub use error::LotteryError;
pub use models::{DrawRecord, GameKind, PrizeTier, WinnerDetail};
pub use repository::{HistorySubscription, LotteryRepository};
pub use state::DataState;
pub use store::{DrawStore, StoreChange, StoreError};
