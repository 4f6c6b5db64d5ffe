pub mod windows;
pub mod windows_process;

pub use windows::{
    INSTALLER_SUCCESS_CODES, InstallerKind, install_request, uninstall_request,
};
pub use windows_process::ProcessInstaller;

use std::path::Path;

use crate::models::{CoreResult, Ensure};

/// Host installer mechanism.
pub trait Installer: Send + Sync {
    fn apply(
        &self,
        identity: &str,
        artifact: &Path,
        ensure: &Ensure,
        options: &[String],
    ) -> CoreResult<()>;

    /// Removes `identity` as registered under the observed `provider`.
    fn remove(&self, identity: &str, provider: &str) -> CoreResult<()>;
}
