//! Email address detection in request fields and post text

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Email pattern, compiled once
static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Whole-string form of the same pattern
static EMAIL_EXACT: OnceLock<Regex> = OnceLock::new();

const EMAIL: &str = r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}";

fn email_pattern() -> &'static Regex {
    EMAIL_PATTERN.get_or_init(|| Regex::new(EMAIL).expect("email regex must compile"))
}

fn email_exact() -> &'static Regex {
    EMAIL_EXACT
        .get_or_init(|| Regex::new(&format!("^{EMAIL}$")).expect("email regex must compile"))
}

/// Whether `email` is a syntactically valid address
pub fn is_valid_email(email: &str) -> bool {
    email_exact().is_match(email)
}

/// Email addresses mentioned in `text`, de-duplicated in order of appearance
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    email_pattern()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|email| seen.insert(*email))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("andy@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("andy"));
        assert!(!is_valid_email("andy@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("andy@example"));
        assert!(!is_valid_email("andy@example.com trailing"));
    }

    #[test]
    fn test_extract_mentions_in_order() {
        let text = "Hello World! kate@example.com and lisa@example.com, see you";
        assert_eq!(
            extract_mentions(text),
            vec!["kate@example.com", "lisa@example.com"]
        );
    }

    #[test]
    fn test_extract_mentions_deduplicates() {
        let text = "kate@example.com, lisa@example.com, kate@example.com";
        assert_eq!(
            extract_mentions(text),
            vec!["kate@example.com", "lisa@example.com"]
        );
    }

    #[test]
    fn test_extract_mentions_none() {
        assert!(extract_mentions("Hello World!").is_empty());
        assert!(extract_mentions("").is_empty());
    }
}
