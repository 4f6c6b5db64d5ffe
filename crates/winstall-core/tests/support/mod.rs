#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use winstall_core::cleanup::ArtifactCleaner;
use winstall_core::installer::Installer;
use winstall_core::inventory::PackageDatabase;
use winstall_core::models::{
    CoreError, CoreErrorKind, CoreResult, Ensure, ObservedInventory, ObservedProduct,
    PackageRecord,
};
use winstall_core::reconcile::ProductReconciler;
use winstall_core::transfer::Transfer;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Fetch {
        uri: String,
        destination: PathBuf,
    },
    Apply {
        identity: String,
        artifact: PathBuf,
        ensure: Ensure,
        options: Vec<String>,
    },
    Remove {
        identity: String,
        provider: String,
    },
    Cleanup {
        path: PathBuf,
    },
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().map(|calls| calls.clone()).unwrap_or_default()
}

fn record(log: &CallLog, call: Call) {
    if let Ok(mut calls) = log.lock() {
        calls.push(call);
    }
}

/// Transfer that writes a placeholder file, or fails after an optional
/// partial write.
pub struct FakeTransfer {
    pub log: CallLog,
    pub fail: bool,
    pub partial_write_on_failure: bool,
}

impl Transfer for FakeTransfer {
    fn fetch(&self, uri: &str, destination: &Path) -> CoreResult<()> {
        record(
            &self.log,
            Call::Fetch {
                uri: uri.to_string(),
                destination: destination.to_path_buf(),
            },
        );

        if self.fail {
            if self.partial_write_on_failure {
                let _ = std::fs::write(destination, b"partial");
            }
            return Err(CoreError::new(
                CoreErrorKind::FetchFailure,
                format!("'{uri}' responded with HTTP status 404"),
            ));
        }

        std::fs::write(destination, b"installer").map_err(|error| {
            CoreError::new(CoreErrorKind::FetchFailure, error.to_string())
        })
    }
}

pub struct FakeInstaller {
    pub log: CallLog,
    pub fail_apply: bool,
    pub fail_remove: bool,
    /// Inventory the installer mutates on success, standing in for the host.
    pub host: Arc<Mutex<ObservedInventory>>,
}

impl Installer for FakeInstaller {
    fn apply(
        &self,
        identity: &str,
        artifact: &Path,
        ensure: &Ensure,
        options: &[String],
    ) -> CoreResult<()> {
        record(
            &self.log,
            Call::Apply {
                identity: identity.to_string(),
                artifact: artifact.to_path_buf(),
                ensure: ensure.clone(),
                options: options.to_vec(),
            },
        );

        if !artifact.exists() {
            return Err(CoreError::new(
                CoreErrorKind::ProcessFailure,
                "artifact missing at apply time",
            ));
        }

        if self.fail_apply {
            return Err(CoreError::new(
                CoreErrorKind::ProcessFailure,
                "process exited with code 1603: fatal error during installation",
            ));
        }

        let state = match ensure {
            Ensure::Version(version) => version.clone(),
            _ => "installed".to_string(),
        };
        if let Ok(mut host) = self.host.lock() {
            host.insert(ObservedProduct::new(identity, state, "windows"));
        }
        Ok(())
    }

    fn remove(&self, identity: &str, provider: &str) -> CoreResult<()> {
        record(
            &self.log,
            Call::Remove {
                identity: identity.to_string(),
                provider: provider.to_string(),
            },
        );

        if self.fail_remove {
            return Err(CoreError::new(
                CoreErrorKind::ProcessFailure,
                "process exited with code 1605",
            ));
        }

        if let Ok(mut host) = self.host.lock() {
            *host = host
                .iter()
                .filter(|product| product.identity != identity)
                .cloned()
                .collect();
        }
        Ok(())
    }
}

pub struct FakeCleaner {
    pub log: CallLog,
    pub fail: bool,
}

impl ArtifactCleaner for FakeCleaner {
    fn ensure_absent(&self, path: &Path) -> CoreResult<()> {
        record(
            &self.log,
            Call::Cleanup {
                path: path.to_path_buf(),
            },
        );

        if self.fail {
            return Err(CoreError::new(
                CoreErrorKind::CleanupFailure,
                format!("failed to remove '{}': access denied", path.display()),
            ));
        }

        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(CoreError::new(
                CoreErrorKind::CleanupFailure,
                error.to_string(),
            )),
        }
    }
}

#[derive(Default)]
pub struct Failures {
    pub fetch: bool,
    pub partial_write: bool,
    pub apply: bool,
    pub remove: bool,
    pub cleanup: bool,
}

pub struct Harness {
    pub log: CallLog,
    pub host: Arc<Mutex<ObservedInventory>>,
    pub staging: tempfile::TempDir,
    pub reconciler: Arc<ProductReconciler>,
}

impl Harness {
    pub fn new(failures: Failures) -> Self {
        Self::with_host(failures, ObservedInventory::new())
    }

    pub fn with_host(failures: Failures, host: ObservedInventory) -> Self {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let host = Arc::new(Mutex::new(host));
        let staging = tempfile::tempdir().expect("staging dir");

        let reconciler = ProductReconciler::new(
            Arc::new(FakeTransfer {
                log: log.clone(),
                fail: failures.fetch,
                partial_write_on_failure: failures.partial_write,
            }),
            Arc::new(FakeInstaller {
                log: log.clone(),
                fail_apply: failures.apply,
                fail_remove: failures.remove,
                host: host.clone(),
            }),
            Arc::new(FakeCleaner {
                log: log.clone(),
                fail: failures.cleanup,
            }),
        )
        .staging_dir(staging.path());

        Self {
            log,
            host,
            staging,
            reconciler: Arc::new(reconciler),
        }
    }

    pub fn observed(&self) -> ObservedInventory {
        self.host.lock().map(|host| host.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        calls(&self.log)
    }
}

/// Package database returning fixed records, or a failure.
pub struct FixedDatabase {
    pub records: Vec<PackageRecord>,
    pub fail: bool,
}

impl PackageDatabase for FixedDatabase {
    fn list_installed(&self) -> CoreResult<Vec<PackageRecord>> {
        if self.fail {
            return Err(CoreError::new(
                CoreErrorKind::ProcessFailure,
                "process exited with code 1: Get-Package is not recognized",
            ));
        }
        Ok(self.records.clone())
    }
}

/// Package database reading the shared fake host on every call.
pub struct HostDatabase {
    pub host: Arc<Mutex<ObservedInventory>>,
}

impl PackageDatabase for HostDatabase {
    fn list_installed(&self) -> CoreResult<Vec<PackageRecord>> {
        let host = self.host.lock().map_err(|_| {
            CoreError::new(CoreErrorKind::Internal, "host lock poisoned")
        })?;
        Ok(host
            .iter()
            .map(|product| {
                PackageRecord::new(product.identity.clone(), product.provider.clone())
                    .attribute("ensure", product.version_or_state.clone())
            })
            .collect())
    }
}
