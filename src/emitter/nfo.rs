//! Kodi/Jellyfin `.nfo` bundle emitter

use super::traits::ArtifactEmitter;
use crate::error::{Error, Result};
use crate::types::{EmitResult, Owner, OwnerKind, Record};
use crate::utils::{clean_filename, release_label, release_year, runtime_minutes};
use async_trait::async_trait;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Genre and tag every release carries
const CATALOG_GENRE: &str = "FC2";

/// Writes `<label>.nfo`, `<label>-poster.<ext>` and `<label>.mp4`
#[derive(Clone, Debug)]
pub struct NfoEmitter {
    output_dir: PathBuf,
}

impl NfoEmitter {
    /// Emitter writing below `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory the bundle for `owner` goes to
    ///
    /// `authors/<name>_<id>` or `actresses/<name>_<id>` below the output
    /// directory, with `author_<id>` / `actress_<id>` when the name is blank.
    ///
    /// Blankness is checked on the raw name, so a missing name never turns
    /// into [`clean_filename`]'s `unknown` placeholder: an author without a
    /// name gets `authors/author_<id>`, not `authors/unknown_<id>`.
    pub fn bundle_dir(&self, owner: Option<&Owner>) -> PathBuf {
        let Some(owner) = owner else {
            return self.output_dir.clone();
        };
        let parent = match owner.kind {
            OwnerKind::Author => "authors",
            OwnerKind::Actress => "actresses",
        };
        let subdir = if owner.name.trim().is_empty() {
            format!("{}_{}", owner.kind.as_str(), owner.id)
        } else {
            format!("{}_{}", clean_filename(&owner.name), owner.id)
        };
        self.output_dir.join(parent).join(subdir)
    }

    async fn copy_poster(&self, image: &Path, dir: &Path, label: &str) -> Option<PathBuf> {
        let ext = image
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| ".jpg".to_string());
        let poster = dir.join(format!("{label}-poster{ext}"));

        match tokio::fs::copy(image, &poster).await {
            Ok(_) => Some(poster),
            Err(e) => {
                error!(source = %image.display(), error = %e, "Failed to copy poster");
                None
            }
        }
    }

    async fn create_placeholder(&self, dir: &Path, label: &str) -> Option<PathBuf> {
        let placeholder = dir.join(format!("{label}.mp4"));
        match tokio::fs::File::create(&placeholder).await {
            Ok(_) => Some(placeholder),
            Err(e) => {
                error!(path = %placeholder.display(), error = %e, "Failed to create placeholder video");
                None
            }
        }
    }
}

#[async_trait]
impl ArtifactEmitter for NfoEmitter {
    async fn emit(
        &self,
        record: &Record,
        image: Option<&Path>,
        owner: Option<&Owner>,
    ) -> Result<EmitResult> {
        let id = record.id().ok_or(Error::MissingId)?;
        let label = release_label(id);
        let dir = self.bundle_dir(owner);

        let document = render_nfo(record, id, owner)?;
        let nfo_path = dir.join(format!("{label}.nfo"));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| Error::Write {
                path: dir.clone(),
                source,
            })?;
        tokio::fs::write(&nfo_path, document)
            .await
            .map_err(|source| Error::Write {
                path: nfo_path.clone(),
                source,
            })?;
        info!(id, path = %nfo_path.display(), "Wrote metadata");

        let poster_path = match image {
            Some(image) => self.copy_poster(image, &dir, &label).await,
            None => None,
        };
        let placeholder_path = self.create_placeholder(&dir, &label).await;

        Ok(EmitResult {
            id: id.to_string(),
            nfo_path,
            poster_path,
            placeholder_path,
        })
    }

    fn name(&self) -> &'static str {
        "nfo"
    }
}

/// Render the `<movie>` document for a record
///
/// # Errors
///
/// Returns an error if the XML writer fails.
pub fn render_nfo(record: &Record, id: &str, owner: Option<&Owner>) -> Result<Vec<u8>> {
    let label = release_label(id);
    let title = record.title.clone().unwrap_or_else(|| label.clone());

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(BytesStart::new("movie")))?;

    text_element(&mut writer, "title", &title)?;
    text_element(&mut writer, "originaltitle", &label)?;
    text_element(&mut writer, "sorttitle", &label)?;
    writer
        .create_element("uniqueid")
        .with_attribute(("type", "fc2ppv"))
        .with_attribute(("default", "true"))
        .write_text_content(BytesText::new(id))?;

    let released = record
        .release_date
        .as_deref()
        .or(record.publish_date.as_deref())
        .filter(|d| !d.trim().is_empty());
    if let Some(date) = released {
        text_element(&mut writer, "premiered", date)?;
        text_element(&mut writer, "releasedate", date)?;
        if let Some(year) = release_year(date) {
            text_element(&mut writer, "year", &year)?;
        }
    }
    if let Some(minutes) = record.duration.as_deref().and_then(runtime_minutes) {
        text_element(&mut writer, "runtime", &minutes.to_string())?;
    }

    text_element(&mut writer, "plot", &plot(record))?;
    text_element(&mut writer, "outline", &title)?;
    text_element(&mut writer, "lockdata", "true")?;

    let owner_name = |kind: OwnerKind| {
        owner
            .filter(|o| o.kind == kind && !o.name.trim().is_empty())
            .map(|o| o.name.as_str())
    };
    let studio = owner_name(OwnerKind::Author).or(record.author_name.as_deref());
    if let Some(studio) = studio {
        text_element(&mut writer, "studio", studio)?;
    }
    text_element(&mut writer, "director", studio.unwrap_or("Unknown"))?;

    if let Some(actor) = owner_name(OwnerKind::Actress).or(record.actress_name.as_deref()) {
        writer.write_event(Event::Start(BytesStart::new("actor")))?;
        text_element(&mut writer, "name", actor)?;
        writer.write_event(Event::End(BytesEnd::new("actor")))?;
    }

    text_element(&mut writer, "genre", CATALOG_GENRE)?;
    if let Some(mosaic) = record.mosaic_type.as_deref() {
        text_element(&mut writer, "genre", mosaic)?;
    }
    for tag in &record.tags {
        text_element(&mut writer, "genre", tag)?;
    }
    text_element(&mut writer, "tag", CATALOG_GENRE)?;

    writer.write_event(Event::End(BytesEnd::new("movie")))?;
    Ok(writer.into_inner())
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer
        .create_element(name)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

fn plot(record: &Record) -> String {
    let mut plot = String::new();
    if let Some(description) = record.description.as_deref() {
        plot.push_str(description);
    }
    if let Some(mosaic) = record.mosaic_type.as_deref() {
        plot.push_str(&format!("\nMosaic: {mosaic}"));
    }

    let magnets = record.known_magnets().unwrap_or_default();
    if !magnets.is_empty() {
        plot.push_str("\n\nMagnet links:\n");
        for (idx, magnet) in magnets.iter().filter(|m| !m.is_empty()).enumerate() {
            plot.push_str(&format!("{}. <a href=\"{magnet}\">{magnet}</a>\n", idx + 1));
        }
    }
    plot.trim().to_string()
}
