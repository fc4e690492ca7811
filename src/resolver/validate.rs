/// Substrings that identify a Google Maps listing link.
const MAPS_URL_MARKERS: &[&str] = &["google.com/maps", "maps.app.goo.gl"];

/// `true` only for full Google Maps URLs and Maps short links.
///
/// Anything else, including an empty or whitespace-only string, is rejected
/// and never reaches the fetcher.
pub fn is_maps_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && MAPS_URL_MARKERS.iter().any(|marker| url.contains(marker))
}
