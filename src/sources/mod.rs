//! Source adapters
//!
//! Sites are grouped by the theme they run on. A theme module implements
//! [`SourceAdapter`] once; each site module is a thin wrapper that picks the
//! base URL, content type and theme options.

use crate::browser::RenderingDriver;
use crate::cache::{CacheKey, TwoTierCache};
use crate::config::{CacheTtls, Config};
use crate::error::{FetchFailure, ScrapeError, ScrapeResult};
use crate::http_client::{FetchProfile, HttpClientConfig, ThrottledFetcher};
use crate::metrics::MetricsTracker;
use crate::models::{
    CatalogItem, ContentDetail, ContentType, DaySchedule, Genre, PagedResult, SourceInfo, Unit,
    UnitStream,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

// Themes
pub mod animestream;
pub mod dooplay;
pub mod madara;
pub mod spa;

// Sites
pub mod anoboy;
pub mod komikindo;
pub mod kuramanime;
pub mod layarkaca;
pub mod sakuranovel;
pub mod samehadaku;
pub mod sokuja;

/// Capability set every source exposes.
///
/// Errors stay typed here; the aggregator turns them into empty values.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn info(&self) -> SourceInfo;

    async fn list_latest(&self, page: u32) -> ScrapeResult<PagedResult<CatalogItem>>;

    async fn search(&self, query: &str, page: u32) -> ScrapeResult<PagedResult<CatalogItem>>;

    async fn get_detail(&self, slug: &str) -> ScrapeResult<ContentDetail>;

    async fn get_units(&self, slug: &str) -> ScrapeResult<Vec<Unit>> {
        Ok(self.get_detail(slug).await?.units)
    }

    async fn get_stream(&self, unit_slug: &str) -> ScrapeResult<UnitStream>;

    async fn get_schedule(&self) -> ScrapeResult<Vec<DaySchedule>> {
        Ok(Vec::new())
    }

    async fn list_genres(&self) -> ScrapeResult<Vec<Genre>> {
        Ok(Vec::new())
    }

    async fn list_by_genre(
        &self,
        _genre: &str,
        _page: u32,
    ) -> ScrapeResult<PagedResult<CatalogItem>> {
        Ok(PagedResult::empty())
    }
}

/// Whether a successfully scraped value should be stored. Empty results
/// usually mean a block page or markup drift, so they are not cached.
pub trait Cacheable {
    fn worth_caching(&self) -> bool;
}

impl<T> Cacheable for PagedResult<T> {
    fn worth_caching(&self) -> bool {
        !self.data.is_empty()
    }
}

impl<T> Cacheable for Vec<T> {
    fn worth_caching(&self) -> bool {
        !self.is_empty()
    }
}

/// A detail without units is usually a failed chapter/episode fallback.
/// Films carry themselves as their single unit.
impl Cacheable for ContentDetail {
    fn worth_caching(&self) -> bool {
        !self.item.title.is_empty() && !self.units.is_empty()
    }
}

impl Cacheable for UnitStream {
    fn worth_caching(&self) -> bool {
        !self.servers.is_empty() || !self.pages.is_empty() || self.text.is_some()
    }
}

/// Static description of one site
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub name: &'static str,
    pub base_url: &'static str,
    pub content_type: ContentType,
    pub rendered: bool,
}

/// Fills `{name}` placeholders of a path template.
pub fn expand(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |path, (name, value)| {
        path.replace(&format!("{{{}}}", name), value)
    })
}

/// Everything an adapter owns: its fetcher (and with it its throttle), the
/// shared cache, an optional rendering driver and the metrics handle.
pub struct SourceContext {
    pub name: String,
    pub base_url: String,
    pub content_type: ContentType,
    pub fetcher: ThrottledFetcher,
    pub cache: Arc<TwoTierCache>,
    pub ttls: CacheTtls,
    pub renderer: Option<RenderingDriver>,
    pub metrics: MetricsTracker,
}

impl SourceContext {
    pub fn new(
        profile: &SiteProfile,
        config: &Config,
        cache: Arc<TwoTierCache>,
        metrics: MetricsTracker,
        renderer: Option<RenderingDriver>,
    ) -> Result<Self, FetchFailure> {
        let overrides = config.source_override(profile.name);
        let base_url = overrides
            .and_then(|o| o.base_url.clone())
            .unwrap_or_else(|| profile.base_url.to_string())
            .trim_end_matches('/')
            .to_string();

        let mut http = HttpClientConfig::from(&config.fetch);
        if let Some(ms) = overrides.and_then(|o| o.min_interval_ms) {
            http.min_interval = std::time::Duration::from_millis(ms);
        }
        let referer = format!("{}/", base_url);
        let profile_headers = FetchProfile::from_config(&config.fetch, Some(&referer));
        let fetcher = ThrottledFetcher::new(profile.name, http, profile_headers)?
            .with_metrics(metrics.clone());

        Ok(Self {
            name: profile.name.to_string(),
            base_url,
            content_type: profile.content_type,
            fetcher,
            cache,
            ttls: config.cache.ttls(),
            renderer: if profile.rendered { renderer } else { None },
            metrics,
        })
    }

    /// Absolute URL for a site-relative path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn key(&self, operation: &str) -> CacheKey {
        CacheKey::new(&self.name, operation)
    }

    pub async fn get_html(&self, url: &str) -> ScrapeResult<String> {
        Ok(self.fetcher.get_text(url).await?)
    }

    pub fn renderer(&self) -> ScrapeResult<&RenderingDriver> {
        self.renderer
            .as_ref()
            .ok_or_else(|| ScrapeError::RenderingDisabled(self.name.clone()))
    }

    /// Returns the cached value for `key` or runs `fetch` and stores its
    /// result. Errors are passed through and never stored.
    pub async fn cached<T, F, Fut>(&self, key: CacheKey, ttl_secs: u64, fetch: F) -> ScrapeResult<T>
    where
        T: Serialize + DeserializeOwned + Cacheable + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ScrapeResult<T>> + Send,
    {
        if let Some(hit) = self.cache.get_json::<T>(&key).await {
            log::debug!("[{}] cache hit {}", self.name, key);
            self.metrics.record_cache(&self.name, true);
            return Ok(hit);
        }
        log::debug!("[{}] cache miss {}", self.name, key);
        self.metrics.record_cache(&self.name, false);

        let value = fetch().await?;
        if value.worth_caching() {
            self.cache.set_json(&key, &value, ttl_secs).await;
        }
        Ok(value)
    }

    pub fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.clone(),
            content_type: self.content_type,
            base_url: self.base_url.clone(),
            rendered: self.renderer.is_some(),
        }
    }
}

type Builder = fn(SourceContext) -> Box<dyn SourceAdapter>;

/// Every known site with its constructor, in registration order
pub fn catalog() -> Vec<(SiteProfile, Builder)> {
    vec![
        (anoboy::profile(), anoboy::build as Builder),
        (sokuja::profile(), sokuja::build),
        (samehadaku::profile(), samehadaku::build),
        (layarkaca::profile(), layarkaca::build),
        (komikindo::profile(), komikindo::build),
        (sakuranovel::profile(), sakuranovel::build),
        (kuramanime::profile(), kuramanime::build),
    ]
}

/// Builds every enabled adapter. Sites whose HTTP client cannot be set up
/// are skipped with a warning.
pub fn build_registry(
    config: &Config,
    cache: Arc<TwoTierCache>,
    metrics: MetricsTracker,
) -> Vec<Arc<dyn SourceAdapter>> {
    let shared_driver = config
        .browser
        .enabled
        .then(|| RenderingDriver::from_settings(&config.browser, &config.fetch.user_agent));

    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    for (profile, build) in catalog() {
        if !config.is_source_enabled(profile.name) {
            log::info!("[{}] disabled by configuration", profile.name);
            continue;
        }
        let renderer = shared_driver.as_ref().map(RenderingDriver::for_source);
        match SourceContext::new(&profile, config, cache.clone(), metrics.clone(), renderer) {
            Ok(ctx) => {
                log::info!("[{}] registered ({})", profile.name, ctx.base_url);
                adapters.push(Arc::from(build(ctx)));
            }
            Err(e) => log::warn!(
                "[{}] adapter unavailable; continuing with remaining sources: {}",
                profile.name,
                e
            ),
        }
    }
    adapters
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_without_units_is_not_cached() {
        let mut detail = ContentDetail {
            item: CatalogItem::new("komikindo", "solo-leveling".to_string(), ContentType::Comic),
            synopsis: String::new(),
            alternate_titles: Vec::new(),
            studio: String::new(),
            author: String::new(),
            release_info: String::new(),
            units: Vec::new(),
        };
        detail.item.title = "Solo Leveling".to_string();
        assert!(!detail.worth_caching());

        detail.units.push(Unit {
            source: "komikindo".to_string(),
            slug: "solo-leveling/chapter-1".to_string(),
            number: "1".to_string(),
            title: "Chapter 1".to_string(),
            source_url: "https://komik.test/komik/solo-leveling/chapter-1/".to_string(),
            date: None,
        });
        assert!(detail.worth_caching());

        detail.item.title.clear();
        assert!(!detail.worth_caching());
    }

    #[test]
    fn test_catalog_names_unique() {
        let mut names: Vec<_> = catalog().iter().map(|(p, _)| p.name).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_expand() {
        assert_eq!(
            expand("/page/{page}/?s={query}", &[("page", "2"), ("query", "one+piece")]),
            "/page/2/?s=one+piece"
        );
    }

    #[test]
    fn test_registry_respects_disabled_sources() {
        let mut config = Config::default();
        config.sources.push(crate::config::SourceOverride {
            name: "komikindo".to_string(),
            base_url: None,
            enabled: false,
            min_interval_ms: None,
        });
        let adapters = build_registry(
            &config,
            Arc::new(TwoTierCache::memory_only(10)),
            MetricsTracker::new(),
        );
        assert_eq!(adapters.len(), catalog().len() - 1);
        assert!(adapters.iter().all(|a| a.info().name != "komikindo"));
    }

    #[test]
    fn test_base_url_override_and_trailing_slash() {
        let profile = anoboy::profile();
        let ctx = testing::context(&profile, "http://127.0.0.1:9999/", None);
        assert_eq!(ctx.base_url, "http://127.0.0.1:9999");
        assert_eq!(ctx.url("/anime/x/"), "http://127.0.0.1:9999/anime/x/");
        assert_eq!(ctx.key("detail").arg("x").as_str(), "anoboy:detail:x");
    }

    #[test]
    fn test_renderer_only_for_rendered_sites() {
        let profile = anoboy::profile();
        let ctx = testing::context(&profile, "http://127.0.0.1:9999", None);
        assert!(matches!(ctx.renderer(), Err(ScrapeError::RenderingDisabled(_))));
        assert!(!ctx.info().rendered);
    }
}
