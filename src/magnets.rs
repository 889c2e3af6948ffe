//! Magnet link lookup in the local result cache
//!
//! Earlier collection runs leave magnet links behind in plain-text files named
//! after a release id, an author or an actress. Lookup is a list of
//! [`PatternGroup`]s evaluated in order; the first group whose globs match any
//! file decides which files are scanned.

use crate::config::PathsConfig;
use crate::types::Record;
use glob::Pattern;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// URI prefix of a magnet link line
pub const MAGNET_PREFIX: &str = "magnet:?";

/// Directory a glob template is rooted at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheRoot {
    /// `paths.result_dir`
    Results,
    /// `paths.magnet_dir`
    Magnets,
}

/// Which record value is substituted for `{key}` in a group's templates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupKey {
    /// The record id
    Id,
    /// `author_id`
    Author,
    /// `actress_id`
    Actress,
    /// Nothing substituted; the group always applies
    Any,
}

/// One glob template, with `{key}` standing for the group's key value
#[derive(Clone, Copy, Debug)]
pub struct PatternTemplate {
    /// Root directory
    pub root: CacheRoot,
    /// File name glob
    pub template: &'static str,
}

/// A named set of templates sharing one key
#[derive(Clone, Copy, Debug)]
pub struct PatternGroup {
    /// Name used in logs
    pub name: &'static str,
    /// Value substituted into the templates
    pub key: GroupKey,
    /// Templates, in order
    pub templates: &'static [PatternTemplate],
}

const fn results(template: &'static str) -> PatternTemplate {
    PatternTemplate {
        root: CacheRoot::Results,
        template,
    }
}

const fn magnets(template: &'static str) -> PatternTemplate {
    PatternTemplate {
        root: CacheRoot::Magnets,
        template,
    }
}

/// Lookup order for cached magnet files
pub const PATTERN_GROUPS: &[PatternGroup] = &[
    PatternGroup {
        name: "id",
        key: GroupKey::Id,
        templates: &[
            results("*_{key}_磁链.txt"),
            results("*_{key}_magnet.txt"),
            magnets("{key}.txt"),
            magnets("FC2-PPV-{key}.txt"),
        ],
    },
    PatternGroup {
        name: "author",
        key: GroupKey::Author,
        templates: &[
            results("author_{key}*_磁链.txt"),
            results("author_{key}*_magnet.txt"),
            results("{key}_*_磁链.txt"),
            results("{key}_*_magnet.txt"),
        ],
    },
    PatternGroup {
        name: "actress",
        key: GroupKey::Actress,
        templates: &[
            results("actress_{key}*_磁链.txt"),
            results("actress_{key}*_magnet.txt"),
            results("{key}_*_磁链.txt"),
            results("{key}_*_magnet.txt"),
        ],
    },
    PatternGroup {
        name: "any",
        key: GroupKey::Any,
        templates: &[results("*_磁链.txt")],
    },
];

/// Read-only view of the magnet cache directories
#[derive(Clone, Debug)]
pub struct MagnetCache {
    result_dir: PathBuf,
    magnet_dir: PathBuf,
}

impl MagnetCache {
    /// Cache rooted at the configured result and magnet directories
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            result_dir: paths.result_dir.clone(),
            magnet_dir: paths.magnet_dir.clone(),
        }
    }

    /// Magnets for a record
    ///
    /// Magnets already on the record are returned as-is without touching the
    /// filesystem. Otherwise the cache is searched; the result keeps file and
    /// line order and may contain duplicates.
    pub fn resolve(&self, record: &Record) -> Vec<String> {
        if let Some(known) = record.known_magnets() {
            return known;
        }
        let Some(id) = record.id() else {
            return Vec::new();
        };

        let files = self.candidate_files(record, id);
        let mut found = Vec::new();
        for file in &files {
            match scan_file(file, id) {
                Ok(mut magnets) => found.append(&mut magnets),
                Err(e) => warn!(id, file = %file.display(), error = %e, "Failed to read magnet file"),
            }
        }

        if !found.is_empty() {
            info!(id, count = found.len(), "Found cached magnets");
        }
        found
    }

    /// Files of the first pattern group that matches anything
    pub fn candidate_files(&self, record: &Record, id: &str) -> Vec<PathBuf> {
        for group in PATTERN_GROUPS {
            let key = match group.key {
                GroupKey::Id => Some(id),
                GroupKey::Author => non_blank(record.author_id.as_deref()),
                GroupKey::Actress => non_blank(record.actress_id.as_deref()),
                GroupKey::Any => Some(""),
            };
            let Some(key) = key else {
                continue;
            };

            let files = self.expand_group(group, key);
            if !files.is_empty() {
                debug!(id, group = group.name, files = files.len(), "Magnet pattern group matched");
                return files;
            }
        }
        Vec::new()
    }

    fn expand_group(&self, group: &PatternGroup, key: &str) -> Vec<PathBuf> {
        let key = Pattern::escape(key);
        let mut files: Vec<PathBuf> = Vec::new();

        for template in group.templates {
            let root = match template.root {
                CacheRoot::Results => &self.result_dir,
                CacheRoot::Magnets => &self.magnet_dir,
            };
            let pattern = format!(
                "{}/{}",
                Pattern::escape(&root.to_string_lossy()),
                template.template.replace("{key}", &key)
            );

            let paths = match glob::glob(&pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Invalid magnet glob");
                    continue;
                }
            };
            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() && !files.contains(&path) => files.push(path),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Failed to read magnet glob entry"),
                }
            }
        }
        files
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Magnets for `id` in one file
///
/// Formats are tried in order and the first that yields anything wins:
/// a `# id |` header line followed by a magnet line, every magnet line when
/// the file is named after the id, any line mentioning the id followed by a
/// magnet line. A whole-file regex pass runs when none of them matched.
pub fn scan_file(path: &Path, id: &str) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let named_after_id = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().contains(id));
    Ok(scan_content(&content, id, named_after_id))
}

fn scan_content(content: &str, id: &str, named_after_id: bool) -> Vec<String> {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();

    let headers = [format!("# {id} |"), format!("#{id} |")];
    if let Some(magnet) = magnet_after(&lines, |line| {
        headers.iter().any(|h| line.starts_with(h.as_str()))
    }) {
        return vec![magnet];
    }

    if named_after_id {
        let all: Vec<String> = lines
            .iter()
            .filter(|line| line.starts_with(MAGNET_PREFIX))
            .map(|line| (*line).to_string())
            .collect();
        if !all.is_empty() {
            return all;
        }
    }

    if let Some(magnet) = magnet_after(&lines, |line| line.contains(id)) {
        return vec![magnet];
    }

    regex_pass(content, id)
}

fn magnet_after(lines: &[&str], is_marker: impl Fn(&str) -> bool) -> Option<String> {
    lines.windows(2).find_map(|pair| {
        (is_marker(pair[0]) && pair[1].starts_with(MAGNET_PREFIX)).then(|| pair[1].to_string())
    })
}

fn regex_pass(content: &str, id: &str) -> Vec<String> {
    let pattern = format!(r"(?s)#{}.*?\n(magnet:\?.*?)\n", regex::escape(id));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    re.captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}
