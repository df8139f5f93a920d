//! Feed fetching abstraction

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static SHEETS_DOCUMENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"docs\.google\.com/spreadsheets(?:/[^/?#]+)*?/d/([^/?#]+)")
        .expect("valid spreadsheet pattern")
});

/// Source of raw feed exports.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Returns the raw text behind `url`.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Rewrites a shared spreadsheet link into its CSV export URL. Other URLs are
/// returned untouched.
pub fn export_url(url: &str) -> String {
    match SHEETS_DOCUMENT_ID.captures(url) {
        Some(caps) => format!(
            "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
            &caps[1]
        ),
        None => url.to_string(),
    }
}

/// Whether a configured URL should be fetched at all.
pub fn is_fetchable(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreadsheet_link_rewritten() {
        assert_eq!(
            export_url("https://docs.google.com/spreadsheets/d/abc123XYZ/edit#gid=0"),
            "https://docs.google.com/spreadsheets/d/abc123XYZ/export?format=csv"
        );
        assert_eq!(
            export_url("https://docs.google.com/spreadsheets/d/abc123XYZ"),
            "https://docs.google.com/spreadsheets/d/abc123XYZ/export?format=csv"
        );
        assert_eq!(
            export_url("https://docs.google.com/spreadsheets/u/0/d/k-9_z/edit?usp=sharing"),
            "https://docs.google.com/spreadsheets/d/k-9_z/export?format=csv"
        );
    }

    #[test]
    fn test_other_links_untouched() {
        let url = "https://example.com/export.csv";
        assert_eq!(export_url(url), url);
        let no_id = "https://docs.google.com/spreadsheets/create";
        assert_eq!(export_url(no_id), no_id);
    }

    #[test]
    fn test_is_fetchable() {
        assert!(is_fetchable("https://example.com/a.csv"));
        assert!(is_fetchable("http://localhost:8080/a.csv"));
        assert!(!is_fetchable(""));
        assert!(!is_fetchable("ftp://example.com"));
        assert!(!is_fetchable("not a url"));
    }
}
