//! Structured-link pass.

use crate::fetcher::FetchedLink;

/// First link, in document order, that looks like the business's own site.
///
/// A link qualifies when its href is an absolute http(s) URL and its
/// lowercased form contains none of `exclusions`. The href is returned
/// verbatim.
pub fn first_external_link<'a>(links: &'a [FetchedLink], exclusions: &[String]) -> Option<&'a str> {
    links
        .iter()
        .filter_map(|link| link.href.as_deref())
        .find(|href| qualifies(href, exclusions))
}

fn qualifies(href: &str, exclusions: &[String]) -> bool {
    let lower = href.to_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !exclusions.iter().any(|domain| lower.contains(domain.as_str()))
}
