//! Fallback pass over the rendered page text.
//!
//! Some listings show their website only as prose. This pass pulls
//! URL-shaped tokens out of the markdown and keeps the first one that is not
//! a Google self-reference.

use std::sync::OnceLock;

use regex::Regex;

static URL_TOKEN_RE: OnceLock<Regex> = OnceLock::new();

/// Punctuation that clings to URLs in markdown and prose.
const TRAILING_PUNCTUATION: &[char] = &[')', '.', ','];

fn url_token_re() -> &'static Regex {
    URL_TOKEN_RE.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>"]+|www\.[^\s<>"]+"#).expect("url token regex is valid")
    })
}

/// First URL-shaped token in `text` that survives `exclusions`.
///
/// Tokens are taken in order of appearance, stripped of trailing `)`, `.`
/// and `,`, then checked case-insensitively against the exclusion substrings.
pub fn first_text_url(text: &str, exclusions: &[String]) -> Option<String> {
    url_token_re()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
        .filter(|token| !token.is_empty())
        .find(|token| {
            let lower = token.to_lowercase();
            !exclusions.iter().any(|ex| lower.contains(ex.as_str()))
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TEXT_EXCLUSIONS;

    fn exclusions() -> Vec<String> {
        DEFAULT_TEXT_EXCLUSIONS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn strips_trailing_prose_punctuation() {
        assert_eq!(
            first_text_url("Visit us at www.mypharmacy.com.)", &exclusions()),
            Some("www.mypharmacy.com".to_string())
        );
        assert_eq!(
            first_text_url("See https://acme-rx.com/about, then call.", &exclusions()),
            Some("https://acme-rx.com/about".to_string())
        );
    }

    #[test]
    fn maps_short_link_alone_is_not_a_website() {
        assert_eq!(first_text_url("https://maps.app.goo.gl/xyz", &exclusions()), None);
    }

    #[test]
    fn google_self_references_are_skipped_in_order() {
        let text = "[Directions](https://www.google.com/maps/dir/acme) \
                    ![map](https://maps.gstatic.com/tile.png) \
                    [Website](https://acme-rx.com)";
        assert_eq!(first_text_url(text, &exclusions()), Some("https://acme-rx.com".to_string()));
    }

    #[test]
    fn social_domains_are_not_excluded_in_text() {
        assert_eq!(
            first_text_url("Follow https://facebook.com/acme for updates", &exclusions()),
            Some("https://facebook.com/acme".to_string())
        );
    }

    #[test]
    fn tokens_stop_at_quotes_and_angle_brackets() {
        assert_eq!(
            first_text_url(r#"<https://acme-rx.com>"quoted""#, &exclusions()),
            Some("https://acme-rx.com".to_string())
        );
    }

    #[test]
    fn text_without_urls_yields_none() {
        assert_eq!(first_text_url("Open 9am to 5pm. Call 555-1234.", &exclusions()), None);
        assert_eq!(first_text_url("", &exclusions()), None);
    }
}
