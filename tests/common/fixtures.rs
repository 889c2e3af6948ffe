//! Fixture records, pages and emitters

use async_trait::async_trait;
use leak_enricher::{ArtifactEmitter, EmitResult, Owner, Record, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Detail page carrying `tags` in the span layout
pub fn detail_page(id: &str, tags: &[&str]) -> String {
    let links: String = tags
        .iter()
        .map(|t| format!(r#"<a href="/tags/?name={t}">{t}</a> "#))
        .collect();
    format!(
        r#"<html><body>
<h2 class="title"><a href="/articles/{id}">Release {id}</a></h2>
<div><ruby>モザイク<rt>mosaic</rt></ruby>：<span>無</span></div>
<div>販売日：<span>2023-07-14</span></div>
<div>収録時間：<span>65分</span></div>
<div><ruby>タグ<rt>tag</rt></ruby>：<span>{links}</span></div>
</body></html>"#
    )
}

/// A record flagged as leaked
pub fn leaked(id: &str) -> Record {
    let mut record = Record::new(id);
    record.leaked = Some(true);
    record
}

/// Emitter that keeps every enriched record it is handed
#[derive(Default)]
pub struct CapturingEmitter {
    pub records: Mutex<Vec<Record>>,
}

impl CapturingEmitter {
    /// Captured records sorted by id
    pub fn sorted(&self) -> Vec<Record> {
        let mut records = self.records.lock().expect("lock").clone();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

#[async_trait]
impl ArtifactEmitter for CapturingEmitter {
    async fn emit(
        &self,
        record: &Record,
        image: Option<&Path>,
        _owner: Option<&Owner>,
    ) -> Result<EmitResult> {
        self.records.lock().expect("lock").push(record.clone());
        Ok(EmitResult {
            id: record.id.clone(),
            nfo_path: PathBuf::from(format!("{}.nfo", record.id)),
            poster_path: image.map(Path::to_path_buf),
            placeholder_path: None,
        })
    }

    fn name(&self) -> &'static str {
        "capturing"
    }
}
