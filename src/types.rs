//! Core types for leak-enricher

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Status labels that mark a record as leaked
pub const LEAKED_STATUS_LABELS: [&str; 3] = ["available", "leaked", "已流出"];

/// Leak disposition as delivered by the upstream collector
///
/// Older collectors wrote a boolean, newer ones a label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Disposition {
    /// Boolean leak flag
    Flag(bool),
    /// Free-form status label (e.g. "available", "leaked")
    Label(String),
}

impl Disposition {
    /// Whether this disposition means "publicly available"
    pub fn is_leaked(&self) -> bool {
        match self {
            Disposition::Flag(flag) => *flag,
            Disposition::Label(label) => LEAKED_STATUS_LABELS.contains(&label.as_str()),
        }
    }
}

/// One leaked-release record flowing through the pipeline
///
/// Known fields are typed; anything else the upstream collector (or a future
/// extractor) produces is kept verbatim in [`Record::extra`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable external identifier
    #[serde(default, alias = "video_id", deserialize_with = "id_serde::deserialize")]
    pub id: String,

    /// Explicit leak flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaked: Option<bool>,

    /// Leak status (boolean or label)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Disposition>,

    /// Tags, ordered and free of duplicates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Release date as shown by the catalog (usually `YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,

    /// Publish date reported by the upstream collector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,

    /// Running time as shown by the catalog (e.g. `65分`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Mosaic type label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mosaic_type: Option<String>,

    /// Release title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Magnet URIs in discovery order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub magnets: Vec<String>,

    /// Legacy single magnet URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnet: Option<String>,

    /// Seller / author id
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "id_serde::deserialize_option"
    )]
    pub author_id: Option<String>,

    /// Seller / author display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    /// Actress id
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "id_serde::deserialize_option"
    )]
    pub actress_id: Option<String>,

    /// Actress display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actress_name: Option<String>,

    /// Fields this crate does not model
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Record {
    /// Create a record with only an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// The id, or `None` when it is blank
    pub fn id(&self) -> Option<&str> {
        let id = self.id.trim();
        (!id.is_empty()).then_some(id)
    }

    /// Whether the record's content is confirmed publicly available
    pub fn is_leaked(&self) -> bool {
        if self.leaked == Some(true) {
            return true;
        }
        self.status.as_ref().is_some_and(Disposition::is_leaked)
    }

    /// Magnets the record already carries (`magnets`, then the legacy `magnet`)
    ///
    /// Blank entries do not count; a record holding only blanks has none.
    pub fn known_magnets(&self) -> Option<Vec<String>> {
        let listed: Vec<String> = self
            .magnets
            .iter()
            .filter(|m| !m.trim().is_empty())
            .cloned()
            .collect();
        if !listed.is_empty() {
            return Some(listed);
        }
        self.magnet
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(|m| vec![m.to_string()])
    }
}

/// Fields scraped from one catalog detail page
///
/// Absent fields mean the page did not contain them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedFields {
    /// Tag names in page order, without duplicates
    #[serde(default)]
    pub tags: Vec<String>,
    /// Mosaic type label
    pub mosaic_type: Option<String>,
    /// Release date
    pub release_date: Option<String>,
    /// Running time
    pub duration: Option<String>,
    /// Title
    pub title: Option<String>,
    /// Additional fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ScrapedFields {
    /// Whether nothing at all was extracted
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.mosaic_type.is_none()
            && self.release_date.is_none()
            && self.duration.is_none()
            && self.title.is_none()
            && self.extra.is_empty()
    }
}

/// Merge scraped fields into a caller-supplied record
///
/// Caller values win on every collision; `tags` becomes the union of both
/// sides (caller order first). Nothing the caller supplied is removed.
pub fn merge(caller: Record, scraped: ScrapedFields) -> Record {
    let ScrapedFields {
        tags,
        mosaic_type,
        release_date,
        duration,
        title,
        extra,
    } = scraped;

    let mut merged = caller;
    merged.tags = union_tags(merged.tags, tags);
    merged.mosaic_type = merged.mosaic_type.or(mosaic_type);
    merged.release_date = merged.release_date.or(release_date);
    merged.duration = merged.duration.or(duration);
    merged.title = merged.title.or(title);
    for (key, value) in extra {
        merged.extra.entry(key).or_insert(value);
    }
    merged
}

fn union_tags(caller: Vec<String>, scraped: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(caller.len() + scraped.len());
    for tag in caller.into_iter().chain(scraped) {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Kind of entity a batch is generated for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    /// Seller / author
    Author,
    /// Actress
    Actress,
}

impl OwnerKind {
    /// Prefix used in cache and output directory names
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Author => "author",
            OwnerKind::Actress => "actress",
        }
    }
}

/// The author or actress whose releases are being processed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Author or actress
    pub kind: OwnerKind,
    /// Catalog id
    pub id: String,
    /// Display name (may be empty)
    #[serde(default)]
    pub name: String,
}

impl Owner {
    /// Author owner
    pub fn author(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: OwnerKind::Author,
            id: id.into(),
            name: name.into(),
        }
    }

    /// Actress owner
    pub fn actress(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: OwnerKind::Actress,
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Outcome of one fetch attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// HTTP 200, body returned
    Success,
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    ServerError,
    /// Request timed out
    Timeout,
    /// Other transport failure (connect, body read)
    Transient,
    /// Non-retryable status, fetch abandoned
    Rejected,
    /// Last allowed attempt failed
    Exhausted,
}

/// One attempt of a fetch call; never persisted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    /// Backoff slept after this attempt, if any
    pub wait: Option<Duration>,
    /// What happened
    pub status: AttemptStatus,
}

/// Files produced for one record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitResult {
    /// Record id
    pub id: String,
    /// Written `.nfo` document
    pub nfo_path: PathBuf,
    /// Copied poster, when an image was found and copied
    pub poster_path: Option<PathBuf>,
    /// Zero-byte placeholder video, when it could be created
    pub placeholder_path: Option<PathBuf>,
}

// Collectors write ids as JSON strings or as bare integers
mod id_serde {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    impl From<RawId> for String {
        fn from(raw: RawId) -> Self {
            match raw {
                RawId::Text(text) => text,
                RawId::Signed(n) => n.to_string(),
                RawId::Unsigned(n) => n.to_string(),
            }
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawId::deserialize(deserializer).map(String::from)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scraped_with_tags(tags: &[&str]) -> ScrapedFields {
        ScrapedFields {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn record_accepts_video_id_alias_and_keeps_unknown_fields() {
        let record: Record = serde_json::from_value(json!({
            "video_id": "4012345",
            "status": "leaked",
            "thumbnail": "https://example.com/t.jpg",
            "views": 12
        }))
        .unwrap();

        assert_eq!(record.id, "4012345");
        assert_eq!(record.status, Some(Disposition::Label("leaked".into())));
        assert_eq!(record.extra["thumbnail"], json!("https://example.com/t.jpg"));
        assert_eq!(record.extra["views"], json!(12));
    }

    #[test]
    fn numeric_ids_deserialize_as_strings() {
        let records: Vec<Record> = serde_json::from_str(
            r#"[{"video_id":4012345,"leaked":true,"author_id":123456,"actress_id":null},
                {"id":"77","actress_id":-5}]"#,
        )
        .unwrap();

        assert_eq!(records[0].id, "4012345");
        assert_eq!(records[0].author_id.as_deref(), Some("123456"));
        assert_eq!(records[0].actress_id, None);
        assert_eq!(records[1].id, "77");
        assert_eq!(records[1].actress_id.as_deref(), Some("-5"));
        assert_eq!(records[1].author_id, None);
    }

    #[test]
    fn blank_id_counts_as_missing() {
        assert_eq!(Record::new("  ").id(), None);
        assert_eq!(Record::default().id(), None);
        assert_eq!(Record::new("123").id(), Some("123"));
    }

    #[test]
    fn leaked_detection() {
        let mut record = Record::new("1");
        assert!(!record.is_leaked());

        record.leaked = Some(true);
        assert!(record.is_leaked());

        record.leaked = Some(false);
        record.status = Some(Disposition::Label("available".into()));
        assert!(record.is_leaked());

        record.status = Some(Disposition::Label("已流出".into()));
        assert!(record.is_leaked());

        record.status = Some(Disposition::Label("pending".into()));
        assert!(!record.is_leaked());

        record.status = Some(Disposition::Flag(true));
        assert!(record.is_leaked());

        record.status = Some(Disposition::Flag(false));
        assert!(!record.is_leaked());
    }

    #[test]
    fn status_deserializes_bool_or_label() {
        let flag: Record = serde_json::from_value(json!({"id": "1", "status": true})).unwrap();
        assert_eq!(flag.status, Some(Disposition::Flag(true)));

        let label: Record =
            serde_json::from_value(json!({"id": "1", "status": "available"})).unwrap();
        assert_eq!(label.status, Some(Disposition::Label("available".into())));
    }

    #[test]
    fn merge_prefers_caller_values() {
        let mut caller = Record::new("77");
        caller.title = Some("caller title".into());
        caller.duration = None;

        let scraped = ScrapedFields {
            title: Some("scraped title".into()),
            duration: Some("45分".into()),
            release_date: Some("2024-03-01".into()),
            ..Default::default()
        };

        let merged = merge(caller, scraped);
        assert_eq!(merged.id, "77");
        assert_eq!(merged.title.as_deref(), Some("caller title"));
        assert_eq!(merged.duration.as_deref(), Some("45分"));
        assert_eq!(merged.release_date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn merge_unions_tags_without_duplicates() {
        let mut caller = Record::new("1");
        caller.tags = vec!["a".into(), "b".into()];

        let merged = merge(caller, scraped_with_tags(&["b", "c", "c"]));
        assert_eq!(merged.tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_takes_scraped_tags_when_caller_has_none() {
        let merged = merge(Record::new("1"), scraped_with_tags(&["x", "y"]));
        assert_eq!(merged.tags, vec!["x", "y"]);
    }

    #[test]
    fn merge_with_empty_scrape_is_identity() {
        let mut caller = Record::new("5");
        caller.tags = vec!["keep".into()];
        caller.extra.insert("k".into(), json!("v"));

        let merged = merge(caller.clone(), ScrapedFields::default());
        assert_eq!(merged, caller);
    }

    #[test]
    fn merge_extra_keeps_caller_entries() {
        let mut caller = Record::new("5");
        caller.extra.insert("shared".into(), json!("caller"));

        let mut scraped = ScrapedFields::default();
        scraped.extra.insert("shared".into(), json!("scraped"));
        scraped.extra.insert("new".into(), json!(1));

        let merged = merge(caller, scraped);
        assert_eq!(merged.extra["shared"], json!("caller"));
        assert_eq!(merged.extra["new"], json!(1));
    }

    #[test]
    fn known_magnets_prefers_list_over_single() {
        let mut record = Record::new("1");
        assert_eq!(record.known_magnets(), None);

        record.magnet = Some("magnet:?xt=urn:btih:SINGLE".into());
        assert_eq!(
            record.known_magnets(),
            Some(vec!["magnet:?xt=urn:btih:SINGLE".to_string()])
        );

        record.magnets = vec!["magnet:?xt=urn:btih:LIST".into()];
        assert_eq!(
            record.known_magnets(),
            Some(vec!["magnet:?xt=urn:btih:LIST".to_string()])
        );
    }

    #[test]
    fn blank_magnets_are_not_known() {
        let mut record = Record::new("1");
        record.magnet = Some(String::new());
        assert_eq!(record.known_magnets(), None);

        record.magnets = vec![" ".into(), String::new()];
        assert_eq!(record.known_magnets(), None);

        record.magnets.push("magnet:?xt=urn:btih:LIST".into());
        assert_eq!(
            record.known_magnets(),
            Some(vec!["magnet:?xt=urn:btih:LIST".to_string()])
        );
    }

    #[test]
    fn scraped_fields_emptiness() {
        assert!(ScrapedFields::default().is_empty());
        assert!(!scraped_with_tags(&["t"]).is_empty());
    }
}
