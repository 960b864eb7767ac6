//! Scrapes catalog and playback metadata (series, films, comics, novels)
//! from independent content sites, normalizes it into one model and serves
//! it through a two-tier cache.
//!
//! [`aggregator::Aggregator`] is the entry point; everything below it is
//! public so adapters and extraction helpers can be tested and reused.

pub mod aggregator;
pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod metrics;
pub mod models;
pub mod sources;
pub mod stream;
pub mod throttle;
