pub mod cycle;
pub mod reconciler;
pub mod staging;

pub use cycle::{CycleReport, DEFAULT_MAX_PARALLEL, PlannedAction, ReconciliationCycle};
pub use reconciler::ProductReconciler;
pub use staging::{artifact_file_name, default_staging_dir, staging_path};

use serde::{Deserialize, Serialize};

use crate::models::{CoreError, DesiredProduct, ObservedInventory, ReconciliationAction};

/// Decides the action that converges `observed` towards `desired`.
pub fn plan(desired: &DesiredProduct, observed: &ObservedInventory) -> ReconciliationAction {
    let current = observed.get(&desired.identity);

    if desired.ensure.is_absent() {
        return match current {
            Some(product) if !product.is_absent() => ReconciliationAction::Remove,
            _ => ReconciliationAction::NoOp,
        };
    }

    match current {
        Some(product) if desired.ensure.is_satisfied_by(product) => ReconciliationAction::NoOp,
        _ => ReconciliationAction::Install,
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum ProductOutcome {
    Succeeded,
    Failed(CoreError),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
    pub identity: String,
    pub action: ReconciliationAction,
    pub outcome: ProductOutcome,
    pub warnings: Vec<CoreError>,
}

impl ProductReport {
    pub fn succeeded(identity: impl Into<String>, action: ReconciliationAction) -> Self {
        Self {
            identity: identity.into(),
            action,
            outcome: ProductOutcome::Succeeded,
            warnings: Vec::new(),
        }
    }

    pub fn failed(
        identity: impl Into<String>,
        action: ReconciliationAction,
        error: CoreError,
    ) -> Self {
        Self {
            identity: identity.into(),
            action,
            outcome: ProductOutcome::Failed(error),
            warnings: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ProductOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&CoreError> {
        match &self.outcome {
            ProductOutcome::Failed(error) => Some(error),
            ProductOutcome::Succeeded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::plan;
    use crate::models::{
        DesiredProduct, Ensure, ObservedInventory, ObservedProduct, ReconciliationAction,
    };

    fn inventory(entries: &[(&str, &str)]) -> ObservedInventory {
        entries
            .iter()
            .map(|(identity, state)| ObservedProduct::new(*identity, *state, "windows"))
            .collect()
    }

    #[test]
    fn absent_and_missing_is_noop() {
        let desired = DesiredProduct::new("7-Zip 19.00", Ensure::Absent);
        assert_eq!(plan(&desired, &inventory(&[])), ReconciliationAction::NoOp);
    }

    #[test]
    fn absent_and_present_is_remove() {
        let desired = DesiredProduct::new("7-Zip 19.00", Ensure::Absent);
        let observed = inventory(&[("7-Zip 19.00", "19.00.00.0")]);
        assert_eq!(plan(&desired, &observed), ReconciliationAction::Remove);
    }

    #[test]
    fn entry_already_reported_absent_is_noop() {
        let desired = DesiredProduct::new("7-Zip 19.00", Ensure::Absent);
        let observed = inventory(&[("7-Zip 19.00", "purged")]);
        assert_eq!(plan(&desired, &observed), ReconciliationAction::NoOp);

        let wanted = DesiredProduct::new("7-Zip 19.00", Ensure::Installed)
            .source("https://example/7z.msi");
        assert_eq!(plan(&wanted, &observed), ReconciliationAction::Install);
    }

    #[test]
    fn installed_and_missing_is_install() {
        let desired = DesiredProduct::new("7-Zip 19.00", Ensure::Installed)
            .source("https://example/7z.msi");
        assert_eq!(plan(&desired, &inventory(&[])), ReconciliationAction::Install);
    }

    #[test]
    fn installed_and_present_is_noop() {
        let desired = DesiredProduct::new("X", Ensure::Installed).source("https://example/x.msi");
        let observed = inventory(&[("X", "installed")]);
        assert_eq!(plan(&desired, &observed), ReconciliationAction::NoOp);
    }

    #[test]
    fn version_mismatch_is_full_install() {
        let desired = DesiredProduct::new("Git", Ensure::Version("2.45.1".to_string()))
            .source("https://example/git.exe");
        let observed = inventory(&[("Git", "2.44.0")]);
        assert_eq!(plan(&desired, &observed), ReconciliationAction::Install);

        let converged = inventory(&[("Git", "2.45.1")]);
        assert_eq!(plan(&desired, &converged), ReconciliationAction::NoOp);
    }

    #[test]
    fn identity_match_is_exact() {
        let desired = DesiredProduct::new("7-Zip 19.00", Ensure::Absent);
        let observed = inventory(&[("7-Zip 19.00 (x64 edition)", "19.00.00.0")]);
        assert_eq!(plan(&desired, &observed), ReconciliationAction::NoOp);
    }
}
