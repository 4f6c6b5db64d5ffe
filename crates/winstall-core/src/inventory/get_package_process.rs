use std::sync::Arc;

use crate::execution::ProcessExecutor;
use crate::inventory::PackageDatabase;
use crate::inventory::get_package::{get_package_list_request, parse_get_package_output};
use crate::models::{CoreResult, PackageRecord};
use crate::process_utils::run_and_collect_stdout;

/// Package database backed by PowerShell's `Get-Package`.
pub struct ProcessPackageDatabase {
    executor: Arc<dyn ProcessExecutor>,
}

impl ProcessPackageDatabase {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { executor }
    }
}

impl PackageDatabase for ProcessPackageDatabase {
    fn list_installed(&self) -> CoreResult<Vec<PackageRecord>> {
        let raw = run_and_collect_stdout(self.executor.as_ref(), get_package_list_request(), &[0])?;
        parse_get_package_output(&raw)
    }
}
