//! Poster image lookup in the local image cache

use crate::types::{Owner, OwnerKind};
use crate::utils::{clean_filename, release_label};
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Sub-directories an owner folder may sort images into
const OWNER_SUBDIRS: [&str; 3] = ["", "leaked", "unleaked"];

/// Finds the cached poster for a record
#[derive(Clone, Debug)]
pub struct ImageLocator {
    image_dir: PathBuf,
}

impl ImageLocator {
    /// Locator rooted at `image_dir`
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
        }
    }

    /// First existing poster for `id`
    ///
    /// Looks at the top-level image directory, then the owner's folders, then
    /// anywhere under the image directory.
    pub fn find(&self, id: &str, owner: Option<&Owner>) -> Option<PathBuf> {
        let file_name = format!("{id}.jpg");

        let top_level = [
            self.image_dir.join(&file_name),
            self.image_dir.join(format!("{}.jpg", release_label(id))),
        ];
        if let Some(found) = top_level.into_iter().find(|p| p.is_file()) {
            return Some(found);
        }

        if let Some(owner) = owner
            && let Some(found) = self.find_in_owner_dirs(&file_name, owner)
        {
            return Some(found);
        }

        let recursive = format!(
            "{}/**/{}",
            Pattern::escape(&self.image_dir.to_string_lossy()),
            Pattern::escape(&file_name)
        );
        let found = self.glob_first(&recursive, |path| path.is_file().then(|| path.to_path_buf()));
        if found.is_none() {
            debug!(id, "No cached poster");
        }
        found
    }

    fn find_in_owner_dirs(&self, file_name: &str, owner: &Owner) -> Option<PathBuf> {
        let kind = owner.kind.as_str();
        let owner_dir = if owner.name.trim().is_empty() {
            format!("{kind}_{}", owner.id)
        } else {
            format!("{kind}_{}_{}", owner.id, clean_filename(&owner.name))
        };
        if let Some(found) = in_owner_dir(&self.image_dir.join(owner_dir), file_name) {
            return Some(found);
        }

        let siblings = format!(
            "{}/{}_*",
            Pattern::escape(&self.image_dir.to_string_lossy()),
            Pattern::escape(&format!("{kind}_{}", owner.id))
        );
        if let Some(found) = self.glob_first(&siblings, |dir| in_owner_dir(dir, file_name)) {
            return Some(found);
        }

        if owner.kind == OwnerKind::Actress {
            let special = format!("actress_{0}_Actress_{0}", owner.id);
            return in_owner_dir(&self.image_dir.join(special), file_name);
        }
        None
    }

    fn glob_first(
        &self,
        pattern: &str,
        mut check: impl FnMut(&Path) -> Option<PathBuf>,
    ) -> Option<PathBuf> {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(pattern, error = %e, "Invalid image glob");
                return None;
            }
        };
        for entry in paths {
            match entry {
                Ok(path) => {
                    if let Some(found) = check(&path) {
                        return Some(found);
                    }
                }
                Err(e) => warn!(error = %e, "Failed to read image glob entry"),
            }
        }
        None
    }
}

fn in_owner_dir(dir: &Path, file_name: &str) -> Option<PathBuf> {
    OWNER_SUBDIRS
        .iter()
        .map(|sub| dir.join(sub).join(file_name))
        .find(|p| p.is_file())
}
