//! Small text and URL helpers shared by every extractor

use crate::models::Unit;
use regex::Regex;
use reqwest::Url;
use scraper::ElementRef;
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());

static UNIT_IN_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:episode|eps?|chapter|ch)[-/_]?(\d+(?:[.-]\d+)?)").unwrap()
});

static UNIT_IN_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:episode|eps?\.?|chapter|ch\.?|bab)\s*(\d+(?:\.\d+)?)").unwrap()
});

static QUALITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(\d{3,4})p\b").unwrap());

/// Collapses runs of whitespace and trims.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// First non-empty attribute among `attrs`, in order
pub fn first_attr(el: ElementRef<'_>, attrs: &[&str]) -> Option<String> {
    attrs
        .iter()
        .filter_map(|a| el.value().attr(a))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolves `href` against `base`. Protocol-relative and root-relative links
/// are handled; anything unparseable is returned unchanged.
pub fn absolute_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// First number in `s`, e.g. `"Episode 12.5 END"` gives `"12.5"`.
pub fn extract_number(s: &str) -> Option<String> {
    NUMBER
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Unit number from its label, falling back to the URL.
///
/// Labels that mention an episode or chapter marker win over any other
/// number in the text (dates, view counts).
pub fn unit_number(label: &str, url: &str) -> String {
    if let Some(cap) = UNIT_IN_LABEL.captures(label) {
        return cap[1].to_string();
    }
    if let Some(cap) = UNIT_IN_URL.captures(&url.to_lowercase()) {
        return cap[1].replace('-', ".");
    }
    extract_number(label).unwrap_or_default()
}

/// Quality hint such as `"720p"` or `"HD"` from surrounding text
pub fn infer_quality(text: &str) -> Option<String> {
    if let Some(cap) = QUALITY.captures(text) {
        return Some(format!("{}p", &cap[1]));
    }
    let upper = text.to_uppercase();
    ["FHD", "HD", "SD"]
        .iter()
        .find(|q| upper.split(|c: char| !c.is_alphanumeric()).any(|w| w == **q))
        .map(|q| q.to_string())
}

/// Orders units ascending by number.
///
/// When every number parses the list is sorted; otherwise a newest-first
/// listing (first number above the last) is reversed and anything else is
/// left in markup order.
pub fn sort_units_ascending(units: &mut [Unit]) {
    let keys: Vec<Option<f64>> = units.iter().map(|u| u.number.parse::<f64>().ok()).collect();
    if keys.iter().all(Option::is_some) {
        units.sort_by(|a, b| {
            let x = a.number.parse::<f64>().unwrap_or_default();
            let y = b.number.parse::<f64>().unwrap_or_default();
            x.total_cmp(&y)
        });
        return;
    }
    let numeric: Vec<f64> = keys.into_iter().flatten().collect();
    if let (Some(first), Some(last)) = (numeric.first(), numeric.last()) {
        if first > last {
            units.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn unit(number: &str) -> Unit {
        Unit {
            source: "test".to_string(),
            slug: format!("ep-{}", number),
            number: number.to_string(),
            title: String::new(),
            source_url: String::new(),
            date: None,
        }
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  One\n\t Piece  "), "One Piece");
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://site.test/anime/x/", "/episode/1/"),
            "https://site.test/episode/1/"
        );
        assert_eq!(
            absolute_url("https://site.test/", "//cdn.test/a.jpg"),
            "https://cdn.test/a.jpg"
        );
        assert_eq!(
            absolute_url("https://site.test/", "https://other.test/a"),
            "https://other.test/a"
        );
    }

    #[test]
    fn test_unit_number() {
        assert_eq!(unit_number("Episode 12 Subtitle Indonesia", ""), "12");
        assert_eq!(unit_number("Chapter 105.5", ""), "105.5");
        assert_eq!(unit_number("", "https://site.test/series-episode-7/"), "7");
        assert_eq!(unit_number("Match 3 Episode 12", ""), "12");
        assert_eq!(unit_number("", "https://site.test/watch-3-episode-12/"), "12");
        assert_eq!(unit_number("", "https://site.test/x-chapter-10-5/"), "10.5");
        assert_eq!(unit_number("Vol 2", ""), "2");
    }

    #[test]
    fn test_infer_quality() {
        assert_eq!(infer_quality("Mirror 720p").as_deref(), Some("720p"));
        assert_eq!(infer_quality("FHD - server").as_deref(), Some("FHD"));
        assert_eq!(infer_quality("Shadow"), None);
    }

    #[test]
    fn test_first_attr_skips_blank() {
        let html = Html::parse_fragment(r#"<img src=" " data-src="real.jpg">"#);
        let img = html.select(&Selector::parse("img").unwrap()).next().unwrap();
        assert_eq!(first_attr(img, &["src", "data-src"]).as_deref(), Some("real.jpg"));
    }

    #[test]
    fn test_sort_numeric() {
        let mut units = vec![unit("3"), unit("1"), unit("2.5"), unit("10")];
        sort_units_ascending(&mut units);
        let numbers: Vec<_> = units.iter().map(|u| u.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "2.5", "3", "10"]);
    }

    #[test]
    fn test_sort_reverses_newest_first_with_gaps() {
        let mut units = vec![unit("12"), unit("OVA"), unit("1")];
        sort_units_ascending(&mut units);
        let numbers: Vec<_> = units.iter().map(|u| u.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "OVA", "12"]);
    }
}
