use std::path::{Path, PathBuf};

use crate::cleanup::ArtifactCleaner;
use crate::models::CoreResult;

/// Staging directory used when none is configured: the system temp
/// directory, never a relative path.
pub fn default_staging_dir() -> PathBuf {
    let temp = std::env::temp_dir();
    if temp.is_absolute() {
        return temp;
    }

    #[cfg(windows)]
    {
        std::env::var("TEMP")
            .or_else(|_| std::env::var("TMP"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(r"C:\Windows\Temp"))
    }
    #[cfg(not(windows))]
    {
        PathBuf::from("/tmp")
    }
}

/// File name the artifact for `source` is staged under: the last path
/// segment of the source, or one derived from `identity` when the source
/// has no usable segment.
pub fn artifact_file_name(source: &str, identity: &str) -> String {
    let without_suffix = source
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    let after_scheme = without_suffix
        .split_once("://")
        .map_or(without_suffix, |(_, rest)| rest);

    // The first segment of a URL is its host, never a file name.
    let mut segments = after_scheme.split(['/', '\\']);
    if without_suffix.len() != after_scheme.len() {
        segments.next();
    }

    segments
        .filter(|segment| !segment.is_empty())
        .last()
        .map(sanitize_file_name)
        .filter(|name| !matches!(name.as_str(), "" | "." | ".."))
        .unwrap_or_else(|| identity_file_name(identity))
}

/// `<staging_dir>/<identity>/<artifact file name>`. Each identity stages
/// into its own directory so products sharing an artifact file name never
/// share a path.
pub fn staging_path(staging_dir: &Path, source: &str, identity: &str) -> PathBuf {
    staging_dir
        .join(identity_file_name(identity))
        .join(artifact_file_name(source, identity))
}

fn identity_file_name(identity: &str) -> String {
    let name = sanitize_file_name(identity.trim());
    if name.is_empty() {
        "artifact".to_string()
    } else {
        name
    }
}

fn sanitize_file_name(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_control() || matches!(ch, '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\') {
                '_'
            } else {
                ch
            }
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

/// Staged installer artifact. The path is made absent when the guard is
/// released, or on drop if it never was.
pub(crate) struct StagedArtifact<'a> {
    path: PathBuf,
    cleaner: &'a dyn ArtifactCleaner,
    released: bool,
}

impl<'a> StagedArtifact<'a> {
    pub(crate) fn new(path: PathBuf, cleaner: &'a dyn ArtifactCleaner) -> Self {
        Self {
            path,
            cleaner,
            released: false,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn release(mut self) -> CoreResult<()> {
        self.released = true;
        self.cleaner.ensure_absent(&self.path)?;
        remove_empty_parent(&self.path);
        Ok(())
    }
}

// Best effort: the directory is left behind if anything else is in it.
fn remove_empty_parent(path: &Path) {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        let _ = std::fs::remove_dir(parent);
    }
}

impl Drop for StagedArtifact<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        match self.cleaner.ensure_absent(&self.path) {
            Ok(()) => remove_empty_parent(&self.path),
            Err(error) => tracing::warn!(
                path = %self.path.display(),
                kind = ?error.kind,
                message = %error.message,
                "failed to remove staged artifact"
            ),
        }
    }
}
