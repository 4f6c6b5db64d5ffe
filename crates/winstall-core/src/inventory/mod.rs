pub mod filter;
pub mod get_package;
pub mod get_package_process;

pub use filter::{DEFAULT_EXCLUDED_PROVIDER_PATTERNS, ProviderFilter};
pub use get_package::{get_package_list_request, parse_get_package_output};
pub use get_package_process::ProcessPackageDatabase;

use crate::models::{
    CoreError, CoreErrorKind, CoreResult, ObservedInventory, ObservedProduct, PackageRecord,
    ProductAction,
};

/// Attribute keys read from a package record, in order of preference.
const STATE_ATTRIBUTES: &[&str] = &["ensure", "version"];
const DEFAULT_STATE: &str = "installed";

/// Read-only view of the host package database.
pub trait PackageDatabase: Send + Sync {
    /// Every package instance currently known to the host.
    fn list_installed(&self) -> CoreResult<Vec<PackageRecord>>;
}

pub trait InventoryCollector: Send + Sync {
    fn collect(&self) -> CoreResult<ObservedInventory>;
}

pub struct DatabaseInventoryCollector<D: PackageDatabase> {
    database: D,
    filter: ProviderFilter,
}

impl<D: PackageDatabase> DatabaseInventoryCollector<D> {
    pub fn new(database: D) -> Self {
        Self::with_filter(database, ProviderFilter::default())
    }

    pub fn with_filter(database: D, filter: ProviderFilter) -> Self {
        Self { database, filter }
    }
}

impl<D: PackageDatabase> InventoryCollector for DatabaseInventoryCollector<D> {
    fn collect(&self) -> CoreResult<ObservedInventory> {
        let records = self
            .database
            .list_installed()
            .map_err(collection_error)?;

        let mut inventory = ObservedInventory::new();
        let mut excluded = 0usize;

        for record in records {
            if self.filter.is_excluded(&record.provider) {
                excluded += 1;
                continue;
            }

            let product = observed_from_record(record);
            if let Some(previous) = inventory.insert(product) {
                tracing::debug!(
                    identity = %previous.identity,
                    provider = %previous.provider,
                    "package database reported identity more than once; keeping the later entry"
                );
            }
        }

        tracing::debug!(
            products = inventory.len(),
            excluded,
            "collected observed inventory"
        );
        Ok(inventory)
    }
}

fn observed_from_record(record: PackageRecord) -> ObservedProduct {
    let version_or_state = STATE_ATTRIBUTES
        .iter()
        .filter_map(|key| record.attributes.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_STATE)
        .to_string();

    ObservedProduct {
        identity: record.identity,
        version_or_state,
        provider: record.provider,
    }
}

fn collection_error(error: CoreError) -> CoreError {
    CoreError {
        identity: None,
        action: Some(ProductAction::Collect),
        kind: CoreErrorKind::CollectionFailure,
        message: format!("package database query failed: {error}"),
    }
}
