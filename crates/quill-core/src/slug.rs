//! URL slugs.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("slug pattern is valid"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("slug pattern is valid"));
static VALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern is valid"));

/// Convert free text to a lowercase ASCII slug.
///
/// Non-ASCII characters are dropped, runs of whitespace and hyphens collapse
/// to a single hyphen, and leading/trailing hyphens or underscores are removed.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.chars().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(cleaned.trim(), "-");
    joined.trim_matches(|c| c == '-' || c == '_').to_string()
}

pub fn is_valid_slug(value: &str) -> bool {
    VALID.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Who was Django Reinhardt?"), "who-was-django-reinhardt");
        assert_eq!(slugify("  spaces -- and  hyphens "), "spaces-and-hyphens");
        assert_eq!(slugify("Crème brûlée"), "crme-brle");
        assert_eq!(slugify("_edge_"), "edge");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("hello-world_2"));
        assert!(!is_valid_slug("hello world"));
        assert!(!is_valid_slug(""));
    }
}
