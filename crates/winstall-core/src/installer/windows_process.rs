use std::path::Path;
use std::sync::Arc;

use crate::execution::ProcessExecutor;
use crate::installer::Installer;
use crate::installer::windows::{INSTALLER_SUCCESS_CODES, install_request, uninstall_request};
use crate::models::{CoreResult, Ensure};
use crate::process_utils::run_and_check_status;

/// Installer that drives `msiexec.exe`, setup executables and
/// `Uninstall-Package` through the process executor.
pub struct ProcessInstaller {
    executor: Arc<dyn ProcessExecutor>,
}

impl ProcessInstaller {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { executor }
    }
}

impl Installer for ProcessInstaller {
    fn apply(
        &self,
        identity: &str,
        artifact: &Path,
        ensure: &Ensure,
        options: &[String],
    ) -> CoreResult<()> {
        tracing::debug!(
            identity = %identity,
            artifact = %artifact.display(),
            ensure = %ensure,
            "running installer"
        );
        let request = install_request(identity, artifact, options);
        run_and_check_status(self.executor.as_ref(), request, INSTALLER_SUCCESS_CODES).map(|_| ())
    }

    fn remove(&self, identity: &str, provider: &str) -> CoreResult<()> {
        tracing::debug!(identity = %identity, provider = %provider, "running uninstaller");
        let request = uninstall_request(identity, provider);
        run_and_check_status(self.executor.as_ref(), request, INSTALLER_SUCCESS_CODES).map(|_| ())
    }
}
