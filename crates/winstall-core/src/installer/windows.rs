use std::path::Path;
use std::time::Duration;

use crate::execution::{CommandSpec, ProcessSpawnRequest};
use crate::inventory::get_package::POWERSHELL_COMMAND;
use crate::models::ProductAction;
use crate::process_utils::powershell_quote;

const MSIEXEC_COMMAND: &str = "msiexec.exe";
const INSTALL_TIMEOUT: Duration = Duration::from_secs(1800);
const REMOVE_TIMEOUT: Duration = Duration::from_secs(1800);

/// Exit codes Windows installers use for success, including
/// `ERROR_SUCCESS_REBOOT_INITIATED` (1641) and
/// `ERROR_SUCCESS_REBOOT_REQUIRED` (3010).
pub const INSTALLER_SUCCESS_CODES: &[i32] = &[0, 1641, 3010];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstallerKind {
    Msi,
    Executable,
}

impl InstallerKind {
    pub fn for_artifact(artifact: &Path) -> Self {
        let is_msi = artifact
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("msi"));
        if is_msi { Self::Msi } else { Self::Executable }
    }
}

pub fn install_request(identity: &str, artifact: &Path, options: &[String]) -> ProcessSpawnRequest {
    let artifact_arg = artifact.to_string_lossy().to_string();
    let command = match InstallerKind::for_artifact(artifact) {
        InstallerKind::Msi => CommandSpec::new(MSIEXEC_COMMAND)
            .arg("/i")
            .arg(artifact_arg)
            .args(options.iter().cloned()),
        InstallerKind::Executable => CommandSpec::new(artifact).args(options.iter().cloned()),
    };

    ProcessSpawnRequest::new(ProductAction::Apply, command)
        .identity(identity)
        .timeout(INSTALL_TIMEOUT)
}

/// Uninstalls the package registered as exactly `identity` under `provider`.
///
/// The name is compared with `-ceq` rather than passed to `-Name`, which
/// treats `*`, `?` and `[]` as wildcards. An empty provider leaves the query
/// unscoped.
pub fn uninstall_request(identity: &str, provider: &str) -> ProcessSpawnRequest {
    let scope = if provider.trim().is_empty() {
        String::new()
    } else {
        format!(" -ProviderName {}", powershell_quote(provider))
    };
    let script = format!(
        "$packages = @(Get-Package{scope} -ErrorAction Stop | Where-Object {{ $_.Name -ceq {name} }}); \
         if ($packages.Count -eq 0) {{ throw 'package not found' }}; \
         $packages | Uninstall-Package -Force -ErrorAction Stop",
        name = powershell_quote(identity)
    );

    ProcessSpawnRequest::new(
        ProductAction::Remove,
        CommandSpec::new(POWERSHELL_COMMAND).args([
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            script,
        ]),
    )
    .identity(identity)
    .timeout(REMOVE_TIMEOUT)
}
