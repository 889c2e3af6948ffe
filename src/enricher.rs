//! Best-effort record enrichment
//!
//! Cached magnets are attached first, then the catalog detail page is fetched
//! and parsed. Every failure along the way degrades to "keep what we have".

use crate::config::Config;
use crate::error::Result;
use crate::extractor::Extractor;
use crate::fetcher::Fetcher;
use crate::magnets::MagnetCache;
use crate::rate_limit::RateLimitCounter;
use crate::types::{Record, merge};
use tracing::{debug, info, warn};

/// Adds cached magnets and scraped catalog fields to records
pub struct Enricher {
    fetcher: Fetcher,
    extractor: Extractor,
    magnets: MagnetCache,
    skip_network_threshold: u32,
}

impl Enricher {
    /// Assemble an enricher from its parts
    pub fn new(
        fetcher: Fetcher,
        extractor: Extractor,
        magnets: MagnetCache,
        skip_network_threshold: u32,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            magnets,
            skip_network_threshold,
        }
    }

    /// Enricher with default parts built from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config, rate_limits: RateLimitCounter) -> Result<Self> {
        let fetcher = Fetcher::new(config.fetch.clone(), rate_limits)?;
        Ok(Self::new(
            fetcher,
            Extractor::default(),
            MagnetCache::new(&config.paths),
            config.batch.skip_network_threshold,
        ))
    }

    /// The rate-limit counter shared with the fetcher
    pub fn rate_limits(&self) -> &RateLimitCounter {
        self.fetcher.rate_limits()
    }

    /// Enrich from the cache and the catalog
    pub async fn enrich(&self, record: Record) -> Record {
        self.enrich_with(record, true).await
    }

    /// Enrich from the cache, and from the catalog when `from_web` is set
    ///
    /// Never fails: a blank id, an open circuit breaker, a failed fetch or a
    /// page without recognizable fields all return the record with at most
    /// its magnets filled in.
    pub async fn enrich_with(&self, mut record: Record, from_web: bool) -> Record {
        let Some(id) = record.id().map(str::to_string) else {
            warn!("Record has no id, skipping enrichment");
            return record;
        };

        let magnets = self.magnets.resolve(&record);
        if !magnets.is_empty() {
            record.magnets = magnets;
        }

        if self.rate_limits().reached(self.skip_network_threshold) {
            info!(
                id = %id,
                count = self.rate_limits().get(),
                "Rate-limit circuit open, skipping catalog fetch"
            );
            return record;
        }
        if !from_web {
            return record;
        }

        let url = match self.fetcher.detail_url(&id) {
            Ok(url) => url,
            Err(e) => {
                warn!(id = %id, error = %e, "Cannot build detail URL");
                return record;
            }
        };
        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    id = %id,
                    status = ?e.status(),
                    error = %e,
                    "Catalog fetch failed, keeping record as-is"
                );
                return record;
            }
        };

        let scraped = self.extractor.parse(&page, &id);
        if scraped.is_empty() {
            debug!(id = %id, "Detail page had no recognizable fields");
            return record;
        }
        merge(record, scraped)
    }
}
