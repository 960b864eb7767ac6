//! Uniform entry point over every registered source.
//!
//! This is the recovery boundary: adapter errors are logged here and turned
//! into the empty value of each operation, so callers never need
//! source-specific failure handling.

use crate::cache::TwoTierCache;
use crate::config::Config;
use crate::error::{ScrapeError, ScrapeResult};
use crate::metrics::MetricsTracker;
use crate::models::{
    CatalogItem, ContentDetail, DaySchedule, Genre, PagedResult, SourceInfo, Unit, UnitStream,
};
use crate::sources::{build_registry, SourceAdapter};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinSet;

/// `source:slug` as a single token, for API layers that route on one value.
///
/// Only the first colon separates; slugs may contain further `/` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedSlug {
    pub source: String,
    pub slug: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("expected `source:slug`, got {0:?}")]
pub struct InvalidQualifiedSlug(pub String);

impl FromStr for QualifiedSlug {
    type Err = InvalidQualifiedSlug;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((source, slug)) if !source.is_empty() && !slug.is_empty() => Ok(Self {
                source: source.to_lowercase(),
                slug: slug.to_string(),
            }),
            _ => Err(InvalidQualifiedSlug(s.to_string())),
        }
    }
}

impl fmt::Display for QualifiedSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.slug)
    }
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    metrics: MetricsTracker,
}

impl Aggregator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, metrics: MetricsTracker) -> Self {
        Self { adapters, metrics }
    }

    /// Connects the cache and registers every enabled source.
    pub async fn from_config(config: &Config) -> Self {
        let cache = Arc::new(TwoTierCache::from_config(&config.cache).await);
        let metrics = MetricsTracker::new();
        let adapters = build_registry(config, cache, metrics.clone());
        log::info!("Aggregator ready with {} sources", adapters.len());
        Self::new(adapters, metrics)
    }

    pub fn sources(&self) -> Vec<SourceInfo> {
        self.adapters.iter().map(|a| a.info()).collect()
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.adapter(name).is_some()
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    fn adapter(&self, name: &str) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.info().name.eq_ignore_ascii_case(name))
    }

    fn lookup(&self, name: &str, operation: &str) -> Option<&Arc<dyn SourceAdapter>> {
        let adapter = self.adapter(name);
        if adapter.is_none() {
            log::warn!("[{}] unknown source for {}", name, operation);
        }
        adapter
    }

    fn recover<T>(&self, source: &str, operation: &str, result: ScrapeResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                if matches!(e, ScrapeError::Render(_)) {
                    self.metrics.record_render_failure(source);
                }
                log::warn!("[{}] {} failed: {}", source, operation, e);
                None
            }
        }
    }

    pub async fn list_latest(&self, source: &str, page: u32) -> PagedResult<CatalogItem> {
        let Some(adapter) = self.lookup(source, "list_latest") else {
            return PagedResult::empty();
        };
        self.recover(source, "list_latest", adapter.list_latest(page).await)
            .unwrap_or_else(PagedResult::empty)
    }

    pub async fn search(&self, source: &str, query: &str, page: u32) -> PagedResult<CatalogItem> {
        let Some(adapter) = self.lookup(source, "search") else {
            return PagedResult::empty();
        };
        self.recover(source, "search", adapter.search(query, page).await)
            .unwrap_or_else(PagedResult::empty)
    }

    /// Searches every source concurrently. Results keep registration order;
    /// failing sources contribute nothing.
    pub async fn search_all(
        &self,
        query: &str,
        page: u32,
    ) -> Vec<(String, PagedResult<CatalogItem>)> {
        let mut tasks = JoinSet::new();
        for (index, adapter) in self.adapters.iter().cloned().enumerate() {
            let query = query.to_string();
            tasks.spawn(async move {
                let name = adapter.info().name;
                let result = adapter.search(&query, page).await;
                (index, name, result)
            });
        }

        let mut found = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, name, result)) => {
                    if let Some(page) = self.recover(&name, "search", result) {
                        if !page.is_empty() {
                            found.push((index, name, page));
                        }
                    }
                }
                Err(e) => log::warn!("search task aborted: {}", e),
            }
        }
        found.sort_by_key(|(index, _, _)| *index);
        found.into_iter().map(|(_, name, page)| (name, page)).collect()
    }

    pub async fn get_detail(&self, source: &str, slug: &str) -> Option<ContentDetail> {
        let adapter = self.lookup(source, "get_detail")?;
        self.recover(source, "get_detail", adapter.get_detail(slug).await)
    }

    pub async fn get_units(&self, source: &str, slug: &str) -> Vec<Unit> {
        let Some(adapter) = self.lookup(source, "get_units") else {
            return Vec::new();
        };
        self.recover(source, "get_units", adapter.get_units(slug).await)
            .unwrap_or_default()
    }

    /// `None` when the unit page could not be loaded. A loaded page with no
    /// playable servers is `Some` with an empty server list.
    pub async fn get_stream(&self, source: &str, unit_slug: &str) -> Option<UnitStream> {
        let adapter = self.lookup(source, "get_stream")?;
        self.recover(source, "get_stream", adapter.get_stream(unit_slug).await)
    }

    pub async fn get_schedule(&self, source: &str) -> Vec<DaySchedule> {
        let Some(adapter) = self.lookup(source, "get_schedule") else {
            return Vec::new();
        };
        self.recover(source, "get_schedule", adapter.get_schedule().await)
            .unwrap_or_default()
    }

    pub async fn list_genres(&self, source: &str) -> Vec<Genre> {
        let Some(adapter) = self.lookup(source, "list_genres") else {
            return Vec::new();
        };
        self.recover(source, "list_genres", adapter.list_genres().await)
            .unwrap_or_default()
    }

    pub async fn list_by_genre(
        &self,
        source: &str,
        genre: &str,
        page: u32,
    ) -> PagedResult<CatalogItem> {
        let Some(adapter) = self.lookup(source, "list_by_genre") else {
            return PagedResult::empty();
        };
        self.recover(source, "list_by_genre", adapter.list_by_genre(genre, page).await)
            .unwrap_or_else(PagedResult::empty)
    }

    pub async fn get_detail_qualified(&self, id: &QualifiedSlug) -> Option<ContentDetail> {
        self.get_detail(&id.source, &id.slug).await
    }

    pub async fn get_stream_qualified(&self, id: &QualifiedSlug) -> Option<UnitStream> {
        self.get_stream(&id.source, &id.slug).await
    }
}
