use std::fmt;

/// `source:operation:arg1:arg2...`, lowercased.
///
/// Every part is percent-encoded, so a colon inside an argument never reads
/// as a separator and distinct arguments never collapse to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(source: &str, operation: &str) -> Self {
        Self(format!("{}:{}", sanitize(source), sanitize(operation)))
    }

    pub fn arg<T: fmt::Display>(mut self, value: T) -> Self {
        self.0.push(':');
        self.0.push_str(&sanitize(&value.to_string()));
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(part: &str) -> String {
    urlencoding::encode(&part.trim().to_lowercase()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_grammar() {
        let key = CacheKey::new("Samehadaku", "search").arg("One Piece").arg(2);
        assert_eq!(key.as_str(), "samehadaku:search:one%20piece:2");
    }

    #[test]
    fn test_colons_in_args_do_not_split() {
        let a = CacheKey::new("s", "detail").arg("a:b");
        let b = CacheKey::new("s", "detail").arg("a").arg("b");
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "s:detail:a%3Ab");
    }

    #[test]
    fn test_escaped_args_stay_distinct() {
        let colon = CacheKey::new("s", "detail").arg("a:b");
        let underscore = CacheKey::new("s", "detail").arg("a_b");
        let plus = CacheKey::new("s", "search").arg("a+b");
        let space = CacheKey::new("s", "search").arg("a b");
        assert_ne!(colon, underscore);
        assert_ne!(plus, space);
    }

    #[test]
    fn test_sources_are_namespaced() {
        let a = CacheKey::new("anoboy", "latest").arg(1);
        let b = CacheKey::new("sokuja", "latest").arg(1);
        assert_ne!(a, b);
    }
}
