#![allow(dead_code)]

use rust_media_scraper::aggregator::Aggregator;
use rust_media_scraper::cache::TwoTierCache;
use rust_media_scraper::config::{Config, SourceOverride};
use rust_media_scraper::metrics::MetricsTracker;
use rust_media_scraper::sources::{build_registry, catalog};
use std::sync::Arc;
use wiremock::ResponseTemplate;

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path, e))
}

/// 200 response carrying a fixture page
pub fn page(name: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(fixture(name))
}

/// Config with only `source` enabled, pointed at `base_url`, without
/// throttling or retries.
pub fn config_for(source: &str, base_url: &str) -> Config {
    let mut config = Config::default();
    config.fetch.min_interval_ms = 0;
    config.fetch.max_retries = 0;
    config.fetch.timeout_secs = 5;
    config.sources = catalog()
        .into_iter()
        .map(|(profile, _)| SourceOverride {
            name: profile.name.to_string(),
            base_url: (profile.name == source).then(|| base_url.to_string()),
            enabled: profile.name == source,
            min_interval_ms: None,
        })
        .collect();
    config
}

/// Aggregator over the single `source`, backed by a memory-only cache
pub fn aggregator_for(source: &str, base_url: &str) -> Aggregator {
    let config = config_for(source, base_url);
    let metrics = MetricsTracker::new();
    let cache = Arc::new(TwoTierCache::memory_only(config.cache.memory_capacity));
    Aggregator::new(build_registry(&config, cache, metrics.clone()), metrics)
}
