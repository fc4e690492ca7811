//! HTML → links + markdown.
//!
//! Produces the two views of a page the resolver consumes: anchors in
//! document order and a markdown rendering of the readable content.

use std::collections::{BTreeMap, HashSet};

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::FetchedLink;

/// Anchor attributes carried along with each link.
const KEPT_LINK_ATTRIBUTES: &[&str] = &["title", "rel", "target", "data-item-id", "aria-label"];

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Collect `a[href]` anchors in document order.
///
/// Absolute hrefs are kept verbatim and relative ones are resolved against
/// `base_url`; fragment-only and non-navigational schemes are skipped.
/// Duplicates keep their first position.
pub fn extract_links(doc: &Html, base_url: Option<&Url>) -> Vec<FetchedLink> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    let mut seen = HashSet::new();

    for el in doc.select(&sel) {
        let Some(raw) = el.value().attr("href") else { continue };
        let raw = raw.trim();
        if raw.is_empty()
            || raw.starts_with('#')
            || raw.starts_with("javascript:")
            || raw.starts_with("mailto:")
            || raw.starts_with("tel:")
            || raw.starts_with("data:")
        {
            continue;
        }

        // Absolute hrefs stay as written; only relative ones are joined.
        let href = match (Url::parse(raw), base_url) {
            (Ok(_), _) => raw.to_string(),
            (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => match base.join(raw) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            },
            (Err(url::ParseError::RelativeUrlWithoutBase), None) => raw.to_string(),
            (Err(_), _) => continue,
        };
        if !seen.insert(href.clone()) {
            continue;
        }

        let text = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
        let attributes: BTreeMap<String, String> = KEPT_LINK_ATTRIBUTES
            .iter()
            .filter_map(|name| {
                el.value()
                    .attr(name)
                    .map(|v| (name.to_string(), v.trim().to_string()))
            })
            .collect();

        links.push(FetchedLink {
            href: Some(href),
            text,
            attributes,
        });
    }
    links
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

/// Render the readable part of the page as markdown.
///
/// Content priority is `article` > `main` > `body`. Anchors render as
/// `[text](href)` so URLs stay visible to the text scanner.
pub fn render_markdown(doc: &Html) -> String {
    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(|el| el.text().collect::<String>());

    let content_el = ["article", "main", "body"]
        .iter()
        .find_map(|tag| Selector::parse(tag).ok().and_then(|sel| doc.select(&sel).next()));

    let mut raw = String::new();
    if let Some(el) = content_el {
        collect_element_text(el, &mut raw);
    }

    let text = collapse_blank_lines(&raw);
    match title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => format!("# {}\n\n{}", t, text),
        _ => text,
    }
}

fn collapse_blank_lines(raw: &str) -> String {
    let mut output = String::new();
    let mut blank_count = 0;
    for line in raw.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_count += 1;
            if blank_count <= 2 {
                output.push('\n');
            }
        } else {
            blank_count = 0;
            output.push_str(line);
            output.push('\n');
        }
    }
    output.trim().to_string()
}

fn collect_element_text(element: ElementRef, out: &mut String) {
    let tag = element.value().name();

    if matches!(
        tag,
        "script" | "style" | "noscript" | "svg" | "iframe" | "nav" | "footer" | "header"
    ) {
        return;
    }

    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level: usize = tag[1..].parse().unwrap_or(1);
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.trim();
            if !text.is_empty() {
                out.push_str(&format!("\n{} {}\n\n", "#".repeat(level), text));
            }
            return;
        }
        "table" => {
            extract_table(element, out);
            return;
        }
        "a" => {
            let href = element.value().attr("href").unwrap_or("").trim();
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.trim();
            if !text.is_empty()
                && !href.is_empty()
                && !href.starts_with('#')
                && !href.starts_with("javascript:")
            {
                out.push_str(&format!("[{}]({}) ", text, href));
            } else if !text.is_empty() {
                out.push_str(text);
                out.push(' ');
            }
            return;
        }
        "li" => out.push_str("- "),
        "br" => {
            out.push('\n');
            return;
        }
        "p" | "div" | "section" | "article" | "main" | "blockquote" => out.push('\n'),
        _ => {}
    }

    for child in element.children() {
        match child.value() {
            scraper::node::Node::Text(text) => {
                let t = text.text.trim();
                if !t.is_empty() {
                    out.push_str(t);
                    out.push(' ');
                }
            }
            scraper::node::Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_element_text(child_el, out);
                }
            }
            _ => {}
        }
    }

    if matches!(tag, "p" | "div" | "section" | "article" | "main" | "blockquote" | "li") {
        out.push('\n');
    }
}

fn extract_table(table: ElementRef, out: &mut String) {
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("th, td")) else {
        return;
    };

    let rows: Vec<Vec<String>> = table
        .select(&row_sel)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| {
                    let text = cell.text().collect::<Vec<_>>().join(" ");
                    text.trim().replace('|', "\\|")
                })
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();
    if rows.is_empty() {
        return;
    }

    let max_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    out.push('\n');
    for (i, row) in rows.iter().enumerate() {
        out.push('|');
        for j in 0..max_cols {
            out.push_str(&format!(" {} |", row.get(j).map(String::as_str).unwrap_or("")));
        }
        out.push('\n');
        if i == 0 {
            out.push('|');
            out.push_str(&" --- |".repeat(max_cols));
            out.push('\n');
        }
    }
    out.push('\n');
}
