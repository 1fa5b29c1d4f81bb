//! Post extraction from mirror profile HTML.
//!
//! Mirrors render profiles with slightly different markup, so extraction is
//! layered: a structural pass over known anchor shapes first, then a raw
//! pattern scan over the document text for ids the structural pass missed.
//! Both passes share one seen-set, keep document order, and stop at the
//! configured window size.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::models::Post;

/// Anchor shapes that carry a status link on known mirror layouts.
const CANDIDATE_LINKS: &str =
    r#"a.tweet-link, .timeline-item .tweet-date a, a[href*="/status/"]"#;

/// Base for canonical post URLs, independent of which mirror served the page.
const CANONICAL_BASE: &str = "https://twitter.com";

/// Status path: an optional author segment (or the literal `i`) followed by
/// `/status/<digits>`. Anchored for hrefs, unanchored for raw text scans.
const STATUS_PATH: &str = r"(?:/(i|[A-Za-z0-9_]{1,15}))?/status/(\d+)";

fn candidate_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse(CANDIDATE_LINKS).expect("static selector"))
}

fn title_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("title").expect("static selector"))
}

fn href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(&format!("^{STATUS_PATH}")).expect("static pattern"))
}

fn raw_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(STATUS_PATH).expect("static pattern"))
}

/// A status link parsed out of an anchor target or raw page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusPath {
    /// `/<author>/status/<id>`, attributed to a specific handle.
    Authored { author: String, id: String },
    /// `/i/status/<id>`, the anonymous form some mirrors emit.
    Anonymous { id: String },
    /// `/status/<id>` with no parseable author segment.
    Bare { id: String },
}

impl StatusPath {
    pub fn id(&self) -> &str {
        match self {
            Self::Authored { id, .. } | Self::Anonymous { id } | Self::Bare { id } => id,
        }
    }

    /// Resolve into a [`Post`] for the handle being watched.
    ///
    /// Anonymous paths canonicalize to the `/i/web/status/` form; paths
    /// without an author are attributed to the watched handle.
    pub fn resolve(&self, handle: &str) -> Post {
        match self {
            Self::Authored { author, id } => Post {
                id: id.clone(),
                author: author.clone(),
                url: format!("{CANONICAL_BASE}/{author}/status/{id}"),
            },
            Self::Anonymous { id } => Post {
                id: id.clone(),
                author: handle.to_string(),
                url: format!("{CANONICAL_BASE}/i/web/status/{id}"),
            },
            Self::Bare { id } => Post {
                id: id.clone(),
                author: handle.to_string(),
                url: format!("{CANONICAL_BASE}/{handle}/status/{id}"),
            },
        }
    }
}

/// Parse an anchor href. Only root-relative status paths qualify; absolute
/// URLs and unrelated paths are left for the raw scan.
pub fn parse_status_href(href: &str) -> Option<StatusPath> {
    href_pattern().captures(href).map(|caps| classify(&caps))
}

fn classify(caps: &regex::Captures<'_>) -> StatusPath {
    let id = caps[2].to_string();
    match caps.get(1).map(|m| m.as_str()) {
        Some("i") => StatusPath::Anonymous { id },
        Some(author) => StatusPath::Authored { author: author.to_string(), id },
        None => StatusPath::Bare { id },
    }
}

/// Extract up to `max_items` unique recent posts from profile HTML.
///
/// The structural pass walks candidate anchors in document order, first
/// occurrence of an id wins. If it comes up short the raw scan sweeps the
/// whole document under the same uniqueness and count constraints.
pub fn extract_posts(handle: &str, html: &str, max_items: usize) -> Vec<Post> {
    if max_items == 0 {
        return Vec::new();
    }

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut posts = Vec::new();

    for element in document.select(candidate_selector()) {
        if posts.len() >= max_items {
            break;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(path) = parse_status_href(href) else {
            continue;
        };
        if seen.insert(path.id().to_string()) {
            posts.push(path.resolve(handle));
        }
    }

    if posts.len() < max_items {
        collect_raw(handle, html, max_items, &mut seen, &mut posts);
    }

    posts
}

/// Raw pattern scan over arbitrary text, for responses that are not HTML
/// (render proxy output) or markup the structural pass cannot see through.
pub fn scan_raw(handle: &str, text: &str, max_items: usize) -> Vec<Post> {
    let mut seen = HashSet::new();
    let mut posts = Vec::new();
    collect_raw(handle, text, max_items, &mut seen, &mut posts);
    posts
}

fn collect_raw(
    handle: &str,
    text: &str,
    max_items: usize,
    seen: &mut HashSet<String>,
    posts: &mut Vec<Post>,
) {
    for caps in raw_pattern().captures_iter(text) {
        if posts.len() >= max_items {
            break;
        }
        let path = classify(&caps);
        if seen.insert(path.id().to_string()) {
            posts.push(path.resolve(handle));
        }
    }
}

/// The document's `<title>` text, for debug logging of mirror responses.
pub fn page_title(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(title_selector())
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
