//! Test configuration helpers

use leak_enricher::{
    ArtifactEmitter, BatchConfig, BatchCoordinator, Config, Enricher, FetchConfig, ImageLocator,
    PathsConfig, RateLimitCounter,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// Config pointing at a mock catalog and a temp cache tree, with millisecond waits
pub fn fast_config(server: &MockServer, root: &Path) -> Config {
    Config {
        fetch: FetchConfig {
            base_url: format!("{}/articles", server.uri()),
            max_retries: 3,
            timeout: Duration::from_secs(5),
            min_wait: Duration::from_millis(1),
            max_wait: Duration::from_millis(2),
            ..Default::default()
        },
        batch: BatchConfig {
            single_thread_pause: Duration::from_millis(1),
            throttled_batch_wait: Duration::from_millis(1),
            single_thread_batch_wait: Duration::from_millis(1),
            ..Default::default()
        },
        paths: PathsConfig {
            output_dir: root.join("jellyfin"),
            result_dir: root.join("results"),
            magnet_dir: root.join("magnets"),
            image_dir: root.join("img"),
        },
    }
}

/// Coordinator wired from `config` with a custom emitter
pub fn coordinator_with(config: &Config, emitter: Arc<dyn ArtifactEmitter>) -> BatchCoordinator {
    let enricher =
        Enricher::from_config(config, RateLimitCounter::new()).expect("enricher should build");
    BatchCoordinator::new(
        enricher,
        ImageLocator::new(&config.paths.image_dir),
        emitter,
        config.batch.clone(),
        config.fetch.min_wait,
    )
}
