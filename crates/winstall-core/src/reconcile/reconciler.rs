use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cleanup::ArtifactCleaner;
use crate::installer::Installer;
use crate::models::{
    CoreError, CoreErrorKind, CoreResult, DesiredProduct, ObservedInventory, ProductAction,
    ReconciliationAction,
};
use crate::reconcile::staging::{StagedArtifact, default_staging_dir, staging_path};
use crate::reconcile::{ProductReport, plan};
use crate::transfer::Transfer;

/// Converges a single desired product against an observed inventory.
pub struct ProductReconciler {
    transfer: Arc<dyn Transfer>,
    installer: Arc<dyn Installer>,
    cleaner: Arc<dyn ArtifactCleaner>,
    staging_dir: PathBuf,
}

impl ProductReconciler {
    pub fn new(
        transfer: Arc<dyn Transfer>,
        installer: Arc<dyn Installer>,
        cleaner: Arc<dyn ArtifactCleaner>,
    ) -> Self {
        Self {
            transfer,
            installer,
            cleaner,
            staging_dir: default_staging_dir(),
        }
    }

    pub fn staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    pub fn staging_dir_path(&self) -> &Path {
        &self.staging_dir
    }

    /// Where an install of `desired` stages its artifact, or `None` when the
    /// product never fetches one.
    pub fn artifact_path(&self, desired: &DesiredProduct) -> Option<PathBuf> {
        if desired.ensure.is_absent() {
            return None;
        }
        let source = desired.source.as_deref()?;
        Some(staging_path(&self.staging_dir, source, &desired.identity))
    }

    pub fn reconcile(&self, desired: &DesiredProduct, observed: &ObservedInventory) -> ProductReport {
        let action = plan(desired, observed);
        let identity = desired.identity.as_str();

        if let Err(error) = desired.validate() {
            tracing::error!(
                identity = %identity,
                action = ?action,
                kind = ?error.kind,
                message = %error.message,
                "rejected invalid product specification"
            );
            return ProductReport::failed(identity, action, error);
        }

        let (result, warnings) = match action {
            ReconciliationAction::NoOp => {
                tracing::debug!(identity = %identity, ensure = %desired.ensure, "product already converged");
                (Ok(()), Vec::new())
            }
            ReconciliationAction::Remove => (self.remove(desired, observed), Vec::new()),
            ReconciliationAction::Install => self.install(desired),
        };

        let mut report = match result {
            Ok(()) => {
                if action.is_change() {
                    tracing::info!(
                        identity = %identity,
                        action = ?action,
                        ensure = %desired.ensure,
                        "product reconciled"
                    );
                }
                ProductReport::succeeded(identity, action)
            }
            Err(error) => {
                tracing::error!(
                    identity = %identity,
                    action = ?action,
                    kind = ?error.kind,
                    message = %error.message,
                    "product reconciliation failed"
                );
                ProductReport::failed(identity, action, error)
            }
        };
        report.warnings = warnings;
        report
    }

    fn remove(&self, desired: &DesiredProduct, observed: &ObservedInventory) -> CoreResult<()> {
        let identity = desired.identity.as_str();
        let provider = observed
            .get(identity)
            .map(|product| product.provider.as_str())
            .ok_or_else(|| {
                CoreError::new(
                    CoreErrorKind::Internal,
                    format!("no observed entry to remove for '{identity}'"),
                )
                .identity(identity)
                .action(ProductAction::Remove)
            })?;

        self.installer.remove(identity, provider).map_err(|error| {
            error.attribute(identity, ProductAction::Remove, CoreErrorKind::RemoveFailure)
        })
    }

    /// Fetch, apply, then clean up the staged artifact whatever happened
    /// before. Cleanup failures come back as warnings.
    fn install(&self, desired: &DesiredProduct) -> (CoreResult<()>, Vec<CoreError>) {
        let identity = desired.identity.as_str();
        let source = desired.source.as_deref().unwrap_or_default();
        let artifact = StagedArtifact::new(
            staging_path(&self.staging_dir, source, identity),
            self.cleaner.as_ref(),
        );

        let result = self
            .fetch(identity, source, artifact.path())
            .and_then(|()| self.apply(desired, artifact.path()));

        let mut warnings = Vec::new();
        if let Err(error) = artifact.release() {
            let warning =
                error.attribute(identity, ProductAction::Cleanup, CoreErrorKind::CleanupFailure);
            tracing::warn!(
                identity = %identity,
                kind = ?warning.kind,
                message = %warning.message,
                "failed to clean up staged artifact"
            );
            warnings.push(warning);
        }

        (result, warnings)
    }

    fn fetch(&self, identity: &str, source: &str, destination: &Path) -> CoreResult<()> {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CoreError::new(
                    CoreErrorKind::FetchFailure,
                    format!(
                        "failed to create staging directory '{}': {error}",
                        parent.display()
                    ),
                )
                .identity(identity)
                .action(ProductAction::Fetch)
            })?;
        }

        if destination.exists() {
            tracing::debug!(
                identity = %identity,
                path = %destination.display(),
                "artifact already staged; skipping fetch"
            );
            return Ok(());
        }

        tracing::debug!(
            identity = %identity,
            source = %source,
            path = %destination.display(),
            "fetching artifact"
        );
        self.transfer
            .fetch(source, destination)
            .map_err(|error| error.attribute(identity, ProductAction::Fetch, CoreErrorKind::FetchFailure))
    }

    fn apply(&self, desired: &DesiredProduct, artifact: &Path) -> CoreResult<()> {
        let identity = desired.identity.as_str();
        self.installer
            .apply(identity, artifact, &desired.ensure, &desired.install_options)
            .map_err(|error| error.attribute(identity, ProductAction::Apply, CoreErrorKind::ApplyFailure))
    }
}
