//! Batch coordination with rate-limit degradation
//!
//! Records are processed in fixed-size batches, strictly one batch after the
//! other. The shared [`RateLimitCounter`] drives two one-way latches that are
//! re-evaluated before every batch:
//!
//! - **single-thread**: items of a batch run one at a time with a pause after
//!   each, instead of concurrently
//! - **skip-network**: enrichment stops fetching from the catalog for the rest
//!   of the run
//!
//! Nothing raised while processing one item escapes the coordinator; failed
//! items are logged and left out of the output.

use crate::config::{BatchConfig, Config};
use crate::emitter::{ArtifactEmitter, NfoEmitter};
use crate::enricher::Enricher;
use crate::error::Result;
use crate::images::ImageLocator;
use crate::rate_limit::RateLimitCounter;
use crate::types::{EmitResult, Owner, Record};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How the items of one batch were scheduled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// All items at once
    Concurrent,
    /// One item at a time
    SingleThread,
}

/// Degradation latches for one run; once set they stay set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeLatches {
    /// Process items serially
    pub single_thread: bool,
    /// Do not fetch from the catalog
    pub skip_network: bool,
}

impl ModeLatches {
    /// Latch whichever modes `count` has reached
    pub fn update(&mut self, count: u32, config: &BatchConfig) {
        if !self.single_thread && count >= config.rate_limit_threshold {
            self.single_thread = true;
            warn!(count, "Rate limit threshold reached, switching to single-thread mode");
        }
        if !self.skip_network && count >= config.skip_network_threshold {
            self.skip_network = true;
            warn!(count, "Rate limit threshold reached, skipping network enrichment");
        }
    }

    /// Scheduling mode implied by the latches
    pub fn mode(&self) -> BatchMode {
        if self.single_thread {
            BatchMode::SingleThread
        } else {
            BatchMode::Concurrent
        }
    }
}

/// What happened in one batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// 0-based batch index
    pub index: usize,
    /// Records in the batch
    pub size: usize,
    /// Scheduling mode
    pub mode: BatchMode,
    /// Whether catalog fetches were disabled for this batch
    pub skip_network: bool,
    /// Counter value when the batch started
    pub rate_limit_count: u32,
    /// Bundles written
    pub emitted: usize,
}

/// Output of a run with per-batch detail
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRun {
    /// Emitted bundles in batch order
    pub results: Vec<EmitResult>,
    /// One report per batch, in order
    pub batches: Vec<BatchReport>,
}

/// Runs leaked records through image lookup, enrichment and emission
pub struct BatchCoordinator {
    enricher: Enricher,
    images: ImageLocator,
    emitter: Arc<dyn ArtifactEmitter>,
    config: BatchConfig,
    default_batch_wait: Duration,
}

impl BatchCoordinator {
    /// Assemble a coordinator
    ///
    /// `default_batch_wait` is the pause between batches when no latch is
    /// set and the counter is low (normally `fetch.min_wait`).
    pub fn new(
        enricher: Enricher,
        images: ImageLocator,
        emitter: Arc<dyn ArtifactEmitter>,
        config: BatchConfig,
        default_batch_wait: Duration,
    ) -> Self {
        Self {
            enricher,
            images,
            emitter,
            config,
            default_batch_wait,
        }
    }

    /// Coordinator with the default parts wired from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let enricher = Enricher::from_config(config, RateLimitCounter::new())?;
        Ok(Self::new(
            enricher,
            ImageLocator::new(&config.paths.image_dir),
            Arc::new(NfoEmitter::new(&config.paths.output_dir)),
            config.batch.clone(),
            config.fetch.min_wait,
        ))
    }

    /// The run's rate-limit counter
    pub fn rate_limits(&self) -> &RateLimitCounter {
        self.enricher.rate_limits()
    }

    /// Process records without an owner
    pub async fn run(&self, records: Vec<Record>) -> Vec<EmitResult> {
        self.run_for(records, None).await
    }

    /// Process records generated for an author or actress
    pub async fn run_for(&self, records: Vec<Record>, owner: Option<&Owner>) -> Vec<EmitResult> {
        self.run_report(records, owner).await.results
    }

    /// Process records and report on every batch
    pub async fn run_report(&self, records: Vec<Record>, owner: Option<&Owner>) -> BatchRun {
        let leaked: Vec<Record> = records.into_iter().filter(Record::is_leaked).collect();
        if leaked.is_empty() {
            info!("No leaked records to process");
            return BatchRun::default();
        }

        let counter = self.rate_limits();
        counter.reset();

        let batch_size = self.config.batch_size.max(1);
        let batch_count = leaked.len().div_ceil(batch_size);
        info!(
            records = leaked.len(),
            batches = batch_count,
            batch_size,
            "Starting batch run"
        );

        let mut latches = ModeLatches::default();
        let mut run = BatchRun::default();
        let mut remaining = leaked.into_iter().peekable();
        let mut index = 0;

        while remaining.peek().is_some() {
            let batch: Vec<Record> = remaining.by_ref().take(batch_size).collect();
            let count = counter.get();
            latches.update(count, &self.config);

            let mut report = BatchReport {
                index,
                size: batch.len(),
                mode: latches.mode(),
                skip_network: latches.skip_network,
                rate_limit_count: count,
                emitted: 0,
            };
            info!(
                batch = index + 1,
                of = batch_count,
                size = report.size,
                mode = ?report.mode,
                skip_network = report.skip_network,
                rate_limits = count,
                "Processing batch"
            );

            let results = self.run_batch(batch, owner, latches).await;
            report.emitted = results.len();
            run.results.extend(results);
            run.batches.push(report);

            index += 1;
            if remaining.peek().is_some() {
                let wait = self.batch_wait(latches, counter.get());
                if !wait.is_zero() {
                    debug!(wait_ms = wait.as_millis() as u64, "Waiting before next batch");
                    tokio::time::sleep(wait).await;
                }
            }
        }

        info!(
            emitted = run.results.len(),
            rate_limits = counter.get(),
            "Batch run complete"
        );
        run
    }

    /// Pause between two batches
    pub fn batch_wait(&self, latches: ModeLatches, count: u32) -> Duration {
        if latches.skip_network {
            Duration::ZERO
        } else if count > self.config.throttled_after {
            self.config.throttled_batch_wait
        } else if latches.single_thread {
            self.config.single_thread_batch_wait
        } else {
            self.default_batch_wait
        }
    }

    async fn run_batch(
        &self,
        batch: Vec<Record>,
        owner: Option<&Owner>,
        latches: ModeLatches,
    ) -> Vec<EmitResult> {
        let from_web = !latches.skip_network;
        let batch = batch.into_iter().filter(|record| {
            let has_id = record.id().is_some();
            if !has_id {
                warn!("Skipping record without id");
            }
            has_id
        });

        match latches.mode() {
            BatchMode::Concurrent => {
                join_all(batch.map(|record| self.process(record, owner, from_web)))
                    .await
                    .into_iter()
                    .flatten()
                    .collect()
            }
            BatchMode::SingleThread => {
                let mut results = Vec::new();
                for record in batch {
                    if let Some(result) = self.process(record, owner, from_web).await {
                        results.push(result);
                    }
                    // Live check: the skip threshold may be crossed mid-batch
                    if !self.rate_limits().reached(self.config.skip_network_threshold) {
                        tokio::time::sleep(self.config.single_thread_pause).await;
                    }
                }
                results
            }
        }
    }

    async fn process(
        &self,
        record: Record,
        owner: Option<&Owner>,
        from_web: bool,
    ) -> Option<EmitResult> {
        let id = record.id()?.to_string();
        let image = self.images.find(&id, owner);
        let enriched = self.enricher.enrich_with(record, from_web).await;

        match self.emitter.emit(&enriched, image.as_deref(), owner).await {
            Ok(result) => Some(result),
            Err(e) => {
                error!(id = %id, emitter = self.emitter.name(), error = %e, "Failed to emit bundle");
                None
            }
        }
    }
}
