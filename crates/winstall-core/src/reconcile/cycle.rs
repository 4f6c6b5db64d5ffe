use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::inventory::InventoryCollector;
use crate::models::{
    CoreError, CoreErrorKind, CoreResult, DesiredProduct, ObservedInventory, ObservedProduct,
    ProductAction, ReconciliationAction,
};
use crate::reconcile::{ProductReconciler, ProductReport, plan};

/// The host package database is a single lock; products reconcile one at a
/// time unless configured otherwise.
pub const DEFAULT_MAX_PARALLEL: usize = 1;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub identity: String,
    pub action: ReconciliationAction,
    pub observed: Option<ObservedProduct>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub products: Vec<ProductReport>,
    pub changed: usize,
    pub failed: usize,
    pub unchanged: usize,
}

impl CycleReport {
    pub fn from_reports(products: Vec<ProductReport>) -> Self {
        let failed = products.iter().filter(|report| report.is_failed()).count();
        let changed = products
            .iter()
            .filter(|report| !report.is_failed() && report.action.is_change())
            .count();
        let unchanged = products.len() - failed - changed;

        Self {
            products,
            changed,
            failed,
            unchanged,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn report(&self, identity: &str) -> Option<&ProductReport> {
        self.products
            .iter()
            .find(|report| report.identity == identity)
    }
}

/// One reconciliation pass over a desired set: a single inventory snapshot,
/// then every product reconciled against it.
pub struct ReconciliationCycle {
    collector: Arc<dyn InventoryCollector>,
    reconciler: Arc<ProductReconciler>,
    max_parallel: usize,
}

impl ReconciliationCycle {
    pub fn new(collector: Arc<dyn InventoryCollector>, reconciler: Arc<ProductReconciler>) -> Self {
        Self {
            collector,
            reconciler,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub async fn collect(&self) -> CoreResult<ObservedInventory> {
        let collector = self.collector.clone();
        tokio::task::spawn_blocking(move || collector.collect())
            .await
            .map_err(|join_error| CoreError {
                identity: None,
                action: Some(ProductAction::Collect),
                kind: CoreErrorKind::CollectionFailure,
                message: format!("inventory collection join failure: {join_error}"),
            })?
    }

    /// Planned action per desired product, without side effects.
    pub async fn plan_only(&self, desired: &[DesiredProduct]) -> CoreResult<Vec<PlannedAction>> {
        let observed = self.collect().await?;

        Ok(desired
            .iter()
            .map(|product| PlannedAction {
                identity: product.identity.clone(),
                action: plan(product, &observed),
                observed: observed.get(&product.identity).cloned(),
            })
            .collect())
    }

    pub async fn run(&self, desired: Vec<DesiredProduct>) -> CoreResult<CycleReport> {
        let mut conflicts = find_conflicts(&desired, &self.reconciler);

        let observed = match self.collect().await {
            Ok(observed) => Arc::new(observed),
            Err(error) => {
                tracing::error!(
                    kind = ?error.kind,
                    message = %error.message,
                    "inventory collection failed; skipping reconciliation cycle"
                );
                return Err(error);
            }
        };

        let permits = Arc::new(Semaphore::new(self.max_parallel));
        let mut pending = Vec::with_capacity(desired.len());

        for (index, product) in desired.into_iter().enumerate() {
            let identity = product.identity.clone();
            let action = plan(&product, &observed);

            if let Some(error) = conflicts.remove(&index) {
                tracing::error!(
                    identity = %identity,
                    action = ?action,
                    kind = ?error.kind,
                    message = %error.message,
                    "skipping conflicting product specification"
                );
                pending.push((identity, action, Err(error)));
                continue;
            }

            let reconciler = self.reconciler.clone();
            let observed = observed.clone();
            let permits = permits.clone();

            let handle = tokio::spawn(async move {
                let task_identity = product.identity.clone();
                let _permit = permits.acquire_owned().await.map_err(|error| {
                    internal_error(&task_identity, format!("reconcile permit unavailable: {error}"))
                })?;
                tokio::task::spawn_blocking(move || reconciler.reconcile(&product, &observed))
                    .await
                    .map_err(|join_error| {
                        internal_error(
                            &task_identity,
                            format!("product reconciliation join failure: {join_error}"),
                        )
                    })
            });

            pending.push((identity, action, Ok(handle)));
        }

        let mut reports = Vec::with_capacity(pending.len());
        for (identity, action, task) in pending {
            let report = match task {
                Err(error) => ProductReport::failed(&identity, action, error),
                Ok(handle) => match handle.await {
                    Ok(Ok(report)) => report,
                    Ok(Err(error)) => ProductReport::failed(&identity, action, error),
                    Err(join_error) => ProductReport::failed(
                        &identity,
                        action,
                        internal_error(
                            &identity,
                            format!("product task join failure: {join_error}"),
                        ),
                    ),
                },
            };
            reports.push(report);
        }

        let report = CycleReport::from_reports(reports);
        tracing::info!(
            changed = report.changed,
            failed = report.failed,
            unchanged = report.unchanged,
            "reconciliation cycle finished"
        );
        Ok(report)
    }
}

/// Desired-set entries that cannot be reconciled independently, keyed by
/// position: every entry of an identity listed more than once, and every
/// install whose staging path another install also resolves to.
fn find_conflicts(
    desired: &[DesiredProduct],
    reconciler: &ProductReconciler,
) -> HashMap<usize, CoreError> {
    let mut by_identity: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut by_artifact: HashMap<PathBuf, Vec<usize>> = HashMap::new();

    for (index, product) in desired.iter().enumerate() {
        by_identity
            .entry(product.identity.as_str())
            .or_default()
            .push(index);
        if let Some(path) = reconciler.artifact_path(product) {
            by_artifact.entry(path).or_default().push(index);
        }
    }

    let mut conflicts = HashMap::new();

    for (identity, indices) in by_identity.into_iter().filter(|(_, i)| i.len() > 1) {
        for index in indices {
            conflicts.insert(
                index,
                conflict_error(
                    identity,
                    format!("product '{identity}' appears more than once in the desired set"),
                ),
            );
        }
    }

    for (path, indices) in by_artifact.into_iter().filter(|(_, i)| i.len() > 1) {
        for index in indices {
            let identity = desired[index].identity.as_str();
            conflicts.entry(index).or_insert_with(|| {
                conflict_error(
                    identity,
                    format!(
                        "product '{identity}' stages its artifact at '{}', which another product also uses",
                        path.display()
                    ),
                )
            });
        }
    }

    conflicts
}

fn conflict_error(identity: &str, message: String) -> CoreError {
    CoreError::new(CoreErrorKind::InvalidInput, message).identity(identity)
}

fn internal_error(identity: &str, message: String) -> CoreError {
    CoreError {
        identity: Some(identity.to_string()),
        action: None,
        kind: CoreErrorKind::Internal,
        message,
    }
}
