//! Stable identifiers derived from URLs

use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

/// Episode or chapter indicator and everything after it
static UNIT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-(?:episode|eps|ep|chapter|ch)-?\d+(?:[-.]\d+)?(?:-.*)?$").unwrap()
});

/// Trailing markers sites append to unit pages
static RELEASE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"-(?:sub(?:title)?-indo(?:nesia)?|indo-sub|english-sub(?:bed)?|end|tamat|batch|bd|final)$",
    )
    .unwrap()
});

/// Last non-empty path segment of `url`, lowercased. Query and fragment are
/// ignored. A bare slug is returned as-is.
pub fn slug_from_url(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or_default()
        .to_lowercase()
}

/// Series slug for a unit slug when the page has no parent link.
///
/// `some-series-name-episode-12-subtitle-indonesia` becomes
/// `some-series-name`.
pub fn series_slug_from_unit(unit_slug: &str) -> String {
    let mut slug = unit_slug.trim_matches('/').to_lowercase();
    loop {
        let stripped = RELEASE_MARKER.replace(&slug, "").to_string();
        if stripped == slug {
            break;
        }
        slug = stripped;
    }
    let series = UNIT_SUFFIX.replace(&slug, "").to_string();
    if series.is_empty() {
        slug
    } else {
        series
    }
}

pub fn series_slug_from_url(url: &str) -> String {
    series_slug_from_unit(&slug_from_url(url))
}

/// Path after `marker`, for sites whose ids span several segments:
/// `/anime/123/one-piece` with marker `/anime/` gives `123/one-piece`.
/// Falls back to [`slug_from_url`] when the marker is absent.
pub fn slug_after(url: &str, marker: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    match path.find(marker) {
        Some(at) => path[at + marker.len()..].trim_matches('/').to_lowercase(),
        None => slug_from_url(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_slug_from_unit() {
        assert_eq!(
            series_slug_from_unit("some-series-name-episode-12-subtitle-indonesia"),
            "some-series-name"
        );
        assert_eq!(series_slug_from_unit("one-piece-episode-1071"), "one-piece");
        assert_eq!(series_slug_from_unit("solo-leveling-chapter-110-5"), "solo-leveling");
        assert_eq!(series_slug_from_unit("bleach-eps-3-end"), "bleach");
        assert_eq!(series_slug_from_unit("frieren-sub-indo"), "frieren");
    }

    #[test]
    fn test_slug_after_marker() {
        assert_eq!(slug_after("https://k.test/anime/123/one-piece/", "/anime/"), "123/one-piece");
        assert_eq!(
            slug_after("https://k.test/anime/123/one-piece/episode/12", "/anime/"),
            "123/one-piece/episode/12"
        );
        assert_eq!(slug_after("https://k.test/movie/dune/", "/anime/"), "dune");
    }

    #[test]
    fn test_series_slug_keeps_plain_slug() {
        assert_eq!(series_slug_from_unit("spy-x-family"), "spy-x-family");
        // numbers that are part of the title survive
        assert_eq!(series_slug_from_unit("86-eighty-six"), "86-eighty-six");
    }

    #[test]
    fn test_slug_from_url() {
        assert_eq!(slug_from_url("https://site.test/anime/one-piece/"), "one-piece");
        assert_eq!(
            slug_from_url("https://site.test/manga/Solo-Leveling?ref=home"),
            "solo-leveling"
        );
        assert_eq!(slug_from_url("/episode/abc-episode-2/"), "abc-episode-2");
        assert_eq!(slug_from_url("bare-slug"), "bare-slug");
    }

    #[test]
    fn test_series_slug_from_url() {
        assert_eq!(
            series_slug_from_url(
                "https://site.test/kimetsu-no-yaiba-episode-5-subtitle-indonesia/"
            ),
            "kimetsu-no-yaiba"
        );
    }
}
