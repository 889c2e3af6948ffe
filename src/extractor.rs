//! Field extraction from catalog detail pages
//!
//! Scalar fields (mosaic type, release date, duration, title) are read with
//! one regular expression each. Tags are harder: the catalog has shipped more
//! than one layout for the tag row, so tag extraction is a list of
//! [`TagStrategy`] implementations tried in order until one finds something.

use crate::types::ScrapedFields;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Text that marks the tag row on a detail page
pub const TAG_MARKER: &str = "タグ";

/// Path prefix shared by tag-listing links
pub const TAG_LINK_PATH: &str = "/tags/";

#[allow(clippy::expect_used)]
static TAG_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<div[^>]*>(?:<ruby>)?タグ(?:<rt[^>]*>[^<]*</rt></ruby>)?[^:：]*[:：]\s*<span[^>]*>(.*?)</span>(?:</div>)?"#,
    )
    .expect("tag section pattern is valid")
});

#[allow(clippy::expect_used)]
static TAG_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a[^>]*href="/tags/\?name=([^"&]+)[^"]*"[^>]*>([^<]+)</a>"#)
        .expect("tag link pattern is valid")
});

#[allow(clippy::expect_used)]
static MOSAIC_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<ruby>モザイク<rt[^>]*>[^<]*</rt></ruby>：<span[^>]*>([^<]+)</span>"#)
        .expect("mosaic pattern is valid")
});

#[allow(clippy::expect_used)]
static RELEASE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"販売日：<span[^>]*>([^<]+)</span>"#).expect("release date pattern is valid")
});

#[allow(clippy::expect_used)]
static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"収録時間：<span[^>]*>([^<]+)</span>"#).expect("duration pattern is valid")
});

// The title anchor sits on its own line below the <h2> in current layouts
#[allow(clippy::expect_used)]
static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<h2[^>]*>.*?<a[^>]*>([^<]+)</a>"#).expect("title pattern is valid")
});

/// One way of pulling tag names out of a detail page
pub trait TagStrategy: Send + Sync {
    /// Tag names in page order, without duplicates; empty when nothing matched
    fn extract_tags(&self, page: &str) -> Vec<String>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Regex over the raw markup: find the tag row, then its `/tags/?name=` anchors
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternTagStrategy;

impl TagStrategy for PatternTagStrategy {
    fn extract_tags(&self, page: &str) -> Vec<String> {
        let Some(section) = TAG_SECTION.captures(page).and_then(|caps| caps.get(1)) else {
            return Vec::new();
        };

        let mut tags = Vec::new();
        for caps in TAG_LINK.captures_iter(section.as_str()) {
            if let Some(name) = caps.get(2) {
                push_unique(&mut tags, name.as_str());
            }
        }
        tags
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}

/// Parsed-document walk: first `<div>` whose text mentions the tag marker
/// and holds at least one link into the tag listing
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentTagStrategy;

impl TagStrategy for DocumentTagStrategy {
    fn extract_tags(&self, page: &str) -> Vec<String> {
        let (div_selector, link_selector) = match (Selector::parse("div"), Selector::parse("a")) {
            (Ok(div), Ok(link)) => (div, link),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to build tag selectors");
                return Vec::new();
            }
        };

        let document = Html::parse_document(page);
        for div in document.select(&div_selector) {
            if !div.text().any(|text| text.contains(TAG_MARKER)) {
                continue;
            }

            let mut tags = Vec::new();
            for link in div.select(&link_selector) {
                let points_at_tags = link
                    .value()
                    .attr("href")
                    .is_some_and(|href| href.contains(TAG_LINK_PATH));
                if points_at_tags {
                    let name: String = link.text().collect();
                    push_unique(&mut tags, &name);
                }
            }

            if !tags.is_empty() {
                return tags;
            }
        }
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "document"
    }
}

fn push_unique(tags: &mut Vec<String>, name: &str) {
    let name = name.trim();
    if !name.is_empty() && !tags.iter().any(|t| t == name) {
        tags.push(name.to_string());
    }
}

/// Turns a detail page into [`ScrapedFields`]
pub struct Extractor {
    tag_strategies: Vec<Box<dyn TagStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_strategies(vec![
            Box::new(PatternTagStrategy),
            Box::new(DocumentTagStrategy),
        ])
    }
}

impl Extractor {
    /// Extractor with a custom tag strategy order
    pub fn with_strategies(tag_strategies: Vec<Box<dyn TagStrategy>>) -> Self {
        Self { tag_strategies }
    }

    /// Extract every known field from a page
    ///
    /// An empty page yields empty fields. Fields whose pattern does not match
    /// are left as `None`.
    pub fn parse(&self, page: &str, id: &str) -> ScrapedFields {
        if page.trim().is_empty() {
            return ScrapedFields::default();
        }

        let fields = ScrapedFields {
            tags: self.extract_tags(page, id),
            mosaic_type: first_capture(&MOSAIC_TYPE, page),
            release_date: first_capture(&RELEASE_DATE, page),
            duration: first_capture(&DURATION, page),
            title: first_capture(&TITLE, page),
            ..Default::default()
        };

        debug!(
            id,
            tags = fields.tags.len(),
            has_title = fields.title.is_some(),
            has_release_date = fields.release_date.is_some(),
            "Parsed detail page"
        );
        fields
    }

    fn extract_tags(&self, page: &str, id: &str) -> Vec<String> {
        for strategy in &self.tag_strategies {
            let tags = strategy.extract_tags(page);
            if !tags.is_empty() {
                debug!(id, strategy = strategy.name(), count = tags.len(), "Found tags");
                return tags;
            }
        }
        Vec::new()
    }
}

fn first_capture(pattern: &Regex, page: &str) -> Option<String> {
    pattern
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}
