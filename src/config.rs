use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub sources: Vec<SourceOverride>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Timeout for HTTP requests in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Minimum delay between two requests of the same source
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,

    /// Retries for 429/5xx and connection errors (0 disables)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,

    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Shared store, e.g. `redis://127.0.0.1:6379`. Memory-only when absent.
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// Share of the oldest entries dropped when the memory tier overflows
    #[serde(default = "default_eviction_fraction")]
    pub eviction_fraction: f64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_latest_ttl")]
    pub latest_ttl_secs: u64,
    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,
    #[serde(default = "default_detail_ttl")]
    pub detail_ttl_secs: u64,
    #[serde(default = "default_stream_ttl")]
    pub stream_ttl_secs: u64,
    #[serde(default = "default_schedule_ttl")]
    pub schedule_ttl_secs: u64,
    #[serde(default = "default_genre_ttl")]
    pub genre_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    /// Headless browser for client-rendered sources (requires Chrome)
    #[serde(default = "default_false")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub disable_images: bool,

    /// Quiet period that counts as "network idle"
    #[serde(default = "default_idle_quiet")]
    pub idle_quiet_ms: u64,

    #[serde(default = "default_max_load_more")]
    pub max_load_more: usize,

    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: usize,

    /// Consecutive scrolls without new content before giving up
    #[serde(default = "default_stall_limit")]
    pub stall_limit: usize,

    #[serde(default = "default_interaction_wait")]
    pub interaction_wait_ms: u64,
}

/// Per-source overrides from `[[sources]]` tables.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceOverride {
    pub name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_timeout() -> u64 { 30 }
fn default_min_interval() -> u64 { 300 }
fn default_max_retries() -> usize { 2 }
fn default_initial_retry_delay() -> u64 { 500 }
fn default_max_retry_delay() -> u64 { 8000 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}
fn default_accept_language() -> String { "id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7".to_string() }
fn default_memory_capacity() -> usize { 100 }
fn default_eviction_fraction() -> f64 { 0.2 }
fn default_connect_timeout() -> u64 { 1500 }
fn default_latest_ttl() -> u64 { 600 }
fn default_search_ttl() -> u64 { 1800 }
fn default_detail_ttl() -> u64 { 3600 }
fn default_stream_ttl() -> u64 { 900 }
fn default_schedule_ttl() -> u64 { 3600 }
fn default_genre_ttl() -> u64 { 86400 }
fn default_browser_timeout() -> u64 { 30 }
fn default_idle_quiet() -> u64 { 500 }
fn default_max_load_more() -> usize { 10 }
fn default_max_scrolls() -> usize { 30 }
fn default_stall_limit() -> usize { 3 }
fn default_interaction_wait() -> u64 { 800 }

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            min_interval_ms: default_min_interval(),
            max_retries: default_max_retries(),
            initial_retry_delay_ms: default_initial_retry_delay(),
            max_retry_delay_ms: default_max_retry_delay(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            memory_capacity: default_memory_capacity(),
            eviction_fraction: default_eviction_fraction(),
            connect_timeout_ms: default_connect_timeout(),
            latest_ttl_secs: default_latest_ttl(),
            search_ttl_secs: default_search_ttl(),
            detail_ttl_secs: default_detail_ttl(),
            stream_ttl_secs: default_stream_ttl(),
            schedule_ttl_secs: default_schedule_ttl(),
            genre_ttl_secs: default_genre_ttl(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: false, // requires Chrome
            headless: true,
            timeout_secs: default_browser_timeout(),
            disable_images: true,
            idle_quiet_ms: default_idle_quiet(),
            max_load_more: default_max_load_more(),
            max_scrolls: default_max_scrolls(),
            stall_limit: default_stall_limit(),
            interaction_wait_ms: default_interaction_wait(),
        }
    }
}

impl Config {
    /// Reads `config.toml` from the working directory, defaults otherwise.
    pub fn load() -> Self {
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<Config>(&content) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring malformed {}: {}", path.display(), e),
                },
                Err(e) => log::warn!("Could not read {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    pub fn source_override(&self, name: &str) -> Option<&SourceOverride> {
        self.sources.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn is_source_enabled(&self, name: &str) -> bool {
        self.source_override(name).map(|s| s.enabled).unwrap_or(true)
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl CacheConfig {
    /// TTLs grouped for adapters.
    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            latest: self.latest_ttl_secs,
            search: self.search_ttl_secs,
            detail: self.detail_ttl_secs,
            stream: self.stream_ttl_secs,
            schedule: self.schedule_ttl_secs,
            genre: self.genre_ttl_secs,
        }
    }
}

/// Per-operation TTLs in seconds.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub latest: u64,
    pub search: u64,
    pub detail: u64,
    pub stream: u64,
    pub schedule: u64,
    pub genre: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        CacheConfig::default().ttls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.cache.memory_capacity, 100);
        assert_eq!(cfg.fetch.min_interval_ms, 300);
        assert!(!cfg.browser.enabled);
        assert!(cfg.cache.redis_url.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [cache]
            redis_url = "redis://127.0.0.1:6379"

            [[sources]]
            name = "anoboy"
            base_url = "https://mirror.example"
            min_interval_ms = 1000

            [[sources]]
            name = "kuramanime"
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(cfg.cache.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(cfg.cache.detail_ttl_secs, 3600);
        assert_eq!(cfg.fetch.timeout_secs, 30);
        assert_eq!(
            cfg.source_override("Anoboy").and_then(|s| s.base_url.as_deref()),
            Some("https://mirror.example")
        );
        assert!(!cfg.is_source_enabled("kuramanime"));
        assert!(cfg.is_source_enabled("samehadaku"));
    }
}
