//! # leak-enricher
//!
//! Enrichment pipeline for leaked-release records.
//!
//! Records collected upstream carry little more than an id and a leak
//! disposition. This crate fills in the rest and writes media-server bundles:
//!
//! - **Fetcher** - rate-limit-aware HTTP fetch of catalog detail pages, with
//!   exponential backoff and a shared 429 counter
//! - **Extractor** - tags, title, release date, duration and mosaic type from
//!   the page markup
//! - **Enricher** - cached magnet lookup, then best-effort merge of scraped
//!   fields (caller values always win)
//! - **Batch coordinator** - fixed-size batches that degrade to serial
//!   processing, then to offline enrichment, as rate limits pile up
//! - **Emitter** - `.nfo` metadata, poster and placeholder video per record
//!
//! Everything below the coordinator is best-effort: failures are logged via
//! `tracing` and the record continues with what it already has.
//!
//! ## Quick Start
//!
//! ```no_run
//! use leak_enricher::{BatchCoordinator, Config, Record};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let coordinator = BatchCoordinator::from_config(&config)?;
//!
//!     let mut record = Record::new("4012345");
//!     record.leaked = Some(true);
//!
//!     for bundle in coordinator.run(vec![record]).await {
//!         println!("{} -> {}", bundle.id, bundle.nfo_path.display());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Batch coordination and degradation latches
pub mod coordinator;
/// Output bundle emitters
pub mod emitter;
/// Record enrichment
pub mod enricher;
/// Error types
pub mod error;
/// Detail page field extraction
pub mod extractor;
/// HTTP fetching with retry
pub mod fetcher;
/// Poster lookup in the image cache
pub mod images;
/// Magnet lookup in the result cache
pub mod magnets;
/// Shared rate-limit counter
pub mod rate_limit;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{BatchConfig, Config, FetchConfig, PathsConfig};
pub use coordinator::{BatchCoordinator, BatchMode, BatchReport, BatchRun, ModeLatches};
pub use emitter::{ArtifactEmitter, NfoEmitter};
pub use enricher::Enricher;
pub use error::{Error, Result};
pub use extractor::{DocumentTagStrategy, Extractor, PatternTagStrategy, TagStrategy};
pub use fetcher::{FetchReport, Fetcher};
pub use images::ImageLocator;
pub use magnets::MagnetCache;
pub use rate_limit::RateLimitCounter;
pub use types::{
    AttemptStatus, Disposition, EmitResult, FetchAttempt, Owner, OwnerKind, Record,
    ScrapedFields, merge,
};
