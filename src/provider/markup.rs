//! Structural extraction rules shared by every supported host layout.
//!
//! All six hosts render the final viewer page from the same template, so the
//! navigation links, related-thumbnail tables, BBCode thumbnail marker and
//! gallery listing markers are matched with one set of patterns. Patterns run
//! in dot-matches-newline mode and take the first (leftmost) match.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static NEXT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?s)< Previous.+?<a style=.+?href="(.*?)"><span.*?>Next"#)
});
static PREV_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?s)<a style=.+?href="(.*?)"><span.*?>< Previous"#)
});
static AUTHOR_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?s)<td align="left".*?<table>(.*?)</table>.*?</td>"#)
});
static GALLERY_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?s)<td align="right".*?<table>(.*?)</table>.*?</td>"#)
});
static PANEL_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?s)<td>.*?href="(.*?)".*?src="(.*?)".*?</td>"#)
});
static THUMB_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)\[IMG\](.*?)\[/IMG\]"));
static GALLERY_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"(?s)href="([^"]*)">More from gallery</a>"#));
static PICVIEW_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?s)>Next.+?<img src="(.*?)" class="picview" alt="#)
});
static LISTING_TOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)<small>\(([0-9]+) total\)</small>"));
static LISTING_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"(?s)<Table class="file_block">(.*?)</Table>"#));
static LISTING_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?s)<TD>.*?href="(.*?)".*?src="(.*?)".*?</TD>"#)
});

/// A `(link, thumbnail URL)` pair taken from a thumbnail table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbLink {
    /// Item page the thumbnail links to.
    pub link: String,
    /// Thumbnail image URL.
    pub thumb_url: String,
}

/// Returns the first capture group of `regex`, or an empty string.
#[must_use]
pub fn search(regex: &Regex, markup: &str) -> String {
    regex
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn thumb_links(regex: &Regex, fragment: &str, limit: usize) -> Vec<ThumbLink> {
    regex
        .captures_iter(fragment)
        .filter_map(|caps| {
            Some(ThumbLink {
                link: caps.get(1)?.as_str().to_string(),
                thumb_url: caps.get(2)?.as_str().to_string(),
            })
        })
        .take(limit)
        .collect()
}

/// Link to the next item, if the page has one.
#[must_use]
pub fn next_url(markup: &str) -> Option<String> {
    non_empty(search(&NEXT_LINK_RE, markup))
}

/// Link to the previous item, if the page has one.
#[must_use]
pub fn prev_url(markup: &str) -> Option<String> {
    non_empty(search(&PREV_LINK_RE, markup))
}

/// "More from author" table entries, capped at `limit`.
#[must_use]
pub fn author_thumbnails(markup: &str, limit: usize) -> Vec<ThumbLink> {
    thumb_links(&PANEL_CELL_RE, &search(&AUTHOR_TABLE_RE, markup), limit)
}

/// "More from gallery" table entries, capped at `limit`.
#[must_use]
pub fn gallery_thumbnails(markup: &str, limit: usize) -> Vec<ThumbLink> {
    thumb_links(&PANEL_CELL_RE, &search(&GALLERY_TABLE_RE, markup), limit)
}

/// Thumbnail URL from the `[IMG]...[/IMG]` share marker.
#[must_use]
pub fn thumb_url(markup: &str) -> Option<String> {
    non_empty(search(&THUMB_MARKER_RE, markup))
}

/// Everything up to and including the last `/` of a thumbnail URL.
#[must_use]
pub fn thumb_prefix(thumb_url: &str) -> String {
    match thumb_url.rfind('/') {
        Some(pos) => thumb_url[..=pos].to_string(),
        None => String::new(),
    }
}

/// URL behind the "More from gallery" link.
#[must_use]
pub fn gallery_url(markup: &str) -> Option<String> {
    non_empty(search(&GALLERY_LINK_RE, markup))
}

/// Gallery hash: the part of a gallery URL after `/g/`.
#[must_use]
pub fn gallery_hash(gallery_url: &str) -> Option<String> {
    gallery_url
        .find("/g/")
        .map(|pos| gallery_url[pos + 3..].trim_end_matches('/').to_string())
        .filter(|hash| !hash.is_empty())
}

/// Full-size image URL placed after the "Next" marker of PATTERN-mode pages.
#[must_use]
pub fn picview_image_url(markup: &str) -> Option<String> {
    non_empty(search(&PICVIEW_IMAGE_RE, markup))
}

/// Total item count reported by a gallery listing page.
#[must_use]
pub fn listing_total(markup: &str) -> Option<u64> {
    search(&LISTING_TOTAL_RE, markup).parse().ok()
}

/// Item entries of a gallery listing page, capped at `limit`.
#[must_use]
pub fn listing_entries(markup: &str, limit: usize) -> Vec<ThumbLink> {
    thumb_links(&LISTING_CELL_RE, &search(&LISTING_TABLE_RE, markup), limit)
}

/// Last path segment of a URL with a trailing `.html` removed.
///
/// Falls back to the text after the last `/` when the value does not parse
/// as an absolute URL.
#[must_use]
pub fn url_filename(url: &str) -> String {
    let name = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_else(|| {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            path.rsplit('/').next().unwrap_or(path).to_string()
        });

    match name.strip_suffix(".html") {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

/// Filename with its last extension removed.
#[must_use]
pub fn file_stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) => &filename[..pos],
        None => filename,
    }
}
