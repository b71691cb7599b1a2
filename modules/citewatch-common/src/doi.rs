use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `10.<registrant>/<suffix>`, suffix stops at whitespace and characters that never appear
/// unescaped in a DOI.
static DOI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"10\.\d{4,}/[^\s<>"{}|\\^`\[\]]+"#).expect("valid regex")
});

/// Resolver and scheme prefixes commonly pasted in front of a DOI.
const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "doi:",
];

/// A normalized DOI: lower-cased, de-prefixed and pattern-validated.
///
/// The only way to build one is [`Doi::parse`], so every lookup keyed by a `Doi`
/// has gone through normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Doi(String);

impl Doi {
    /// Normalize a raw DOI string. Returns `None` when no `10.NNNN/...` pattern is present.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut doi = raw.trim().to_lowercase();
        for prefix in DOI_PREFIXES {
            if let Some(rest) = doi.strip_prefix(prefix) {
                doi = rest.trim_start().to_string();
            }
        }
        DOI_RE.find(&doi).map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Doi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_plain_doi() {
        let doi = Doi::parse("10.1234/ABC").unwrap();
        assert_eq!(doi.as_str(), "10.1234/abc");
    }

    #[test]
    fn strips_resolver_prefixes() {
        for raw in [
            "https://doi.org/10.1000/xyz123",
            "http://dx.doi.org/10.1000/xyz123",
            "doi:10.1000/xyz123",
            "DOI: 10.1000/XYZ123",
            "  10.1000/xyz123  ",
        ] {
            assert_eq!(Doi::parse(raw).unwrap().as_str(), "10.1000/xyz123", "input: {raw}");
        }
    }

    #[test]
    fn extracts_doi_embedded_in_text() {
        let doi = Doi::parse("see 10.1038/nature12373 for details").unwrap();
        assert_eq!(doi.as_str(), "10.1038/nature12373");
    }

    #[test]
    fn suffix_stops_at_forbidden_characters() {
        let doi = Doi::parse("<10.1234/abc>").unwrap();
        assert_eq!(doi.as_str(), "10.1234/abc");
    }

    #[test]
    fn rejects_strings_without_doi_pattern() {
        assert!(Doi::parse("").is_none());
        assert!(Doi::parse("not a doi").is_none());
        assert!(Doi::parse("10.12/too-short-registrant").is_none());
        assert!(Doi::parse("10.1234").is_none());
        assert!(Doi::parse("https://example.com/article").is_none());
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "10.1234/ABC",
            "https://doi.org/10.1016/J.CELL.2020.01.001",
            "doi:10.1093/nar/gkaa1100",
            "text 10.5555/12345678 more",
        ] {
            let once = Doi::parse(raw).unwrap();
            let twice = Doi::parse(once.as_str()).unwrap();
            assert_eq!(once, twice, "input: {raw}");
        }
    }

    #[test]
    fn differently_cased_inputs_compare_equal() {
        assert_eq!(Doi::parse("10.1234/ABC"), Doi::parse("10.1234/abc"));
    }
}
