//! Decoding of mirror option payloads
//!
//! Mirror dropdowns carry either a player URL or a base64-encoded iframe
//! fragment in each option's `value`.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use regex::Regex;
use std::sync::LazyLock;

static BASE64_ALPHABET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/_-]+={0,2}$").unwrap());

static SRC_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)src\s*=\s*["']([^"']+)["']"#).unwrap());

fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        url.to_string()
    }
}

fn is_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("https://") || s.starts_with("http://") || s.starts_with("//")
}

/// `src` attribute of the first element in an HTML fragment
pub fn extract_src(fragment: &str) -> Option<String> {
    SRC_ATTR
        .captures(fragment)
        .map(|c| normalize_url(&c[1]))
        .filter(|u| !u.is_empty())
}

fn decode_base64(value: &str) -> Option<String> {
    if value.len() < 8 || !BASE64_ALPHABET.is_match(value) {
        return None;
    }
    let bytes = STANDARD
        .decode(value)
        .or_else(|_| URL_SAFE.decode(value))
        .ok()?;
    String::from_utf8(bytes).ok()
}

/// Player URL carried by a mirror option value, if any.
pub fn decode_option_value(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if is_url(value) {
        return Some(normalize_url(value));
    }
    if value.contains('<') {
        return extract_src(value);
    }

    let decoded = decode_base64(value)?;
    if let Some(src) = extract_src(&decoded) {
        return Some(src);
    }
    is_url(&decoded).then(|| normalize_url(&decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> String {
        STANDARD.encode(s)
    }

    #[test]
    fn test_base64_iframe_fragment() {
        let value = encode(r#"<iframe src="https://player.example/x"></iframe>"#);
        assert_eq!(
            decode_option_value(&value).as_deref(),
            Some("https://player.example/x")
        );
    }

    #[test]
    fn test_base64_direct_url() {
        let value = encode("https://cdn.example/video.mp4");
        assert_eq!(
            decode_option_value(&value).as_deref(),
            Some("https://cdn.example/video.mp4")
        );
    }

    #[test]
    fn test_plain_url_and_protocol_relative() {
        assert_eq!(
            decode_option_value("https://player.example/y").as_deref(),
            Some("https://player.example/y")
        );
        let value = encode(r#"<IFRAME SRC='//embed.example/z' allowfullscreen></IFRAME>"#);
        assert_eq!(
            decode_option_value(&value).as_deref(),
            Some("https://embed.example/z")
        );
    }

    #[test]
    fn test_placeholder_values() {
        assert_eq!(decode_option_value(""), None);
        assert_eq!(decode_option_value("Pilih Server"), None);
        assert_eq!(decode_option_value("0"), None);
        assert_eq!(decode_option_value(&encode("not a player")), None);
    }
}
