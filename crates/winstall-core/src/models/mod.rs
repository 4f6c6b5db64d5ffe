pub mod action;
pub mod error;
pub mod product;

pub use action::{ProductAction, ReconciliationAction};
pub use error::{CoreError, CoreErrorKind, CoreResult};
pub use product::{DesiredProduct, Ensure, ObservedInventory, ObservedProduct, PackageRecord};
