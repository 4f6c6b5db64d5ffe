use std::io::ErrorKind;
use std::path::Path;

use crate::models::{CoreError, CoreErrorKind, CoreResult, ProductAction};

/// Removes staged artifacts. Failures are reported, never fatal.
pub trait ArtifactCleaner: Send + Sync {
    fn ensure_absent(&self, path: &Path) -> CoreResult<()>;
}

pub struct FsCleaner;

impl ArtifactCleaner for FsCleaner {
    fn ensure_absent(&self, path: &Path) -> CoreResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(CoreError {
                identity: None,
                action: Some(ProductAction::Cleanup),
                kind: CoreErrorKind::CleanupFailure,
                message: format!("failed to remove '{}': {error}", path.display()),
            }),
        }
    }
}
