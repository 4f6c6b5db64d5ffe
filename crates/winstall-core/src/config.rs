use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::inventory::ProviderFilter;
use crate::models::{CoreError, CoreErrorKind, CoreResult, DesiredProduct, Ensure};
use crate::reconcile::{DEFAULT_MAX_PARALLEL, default_staging_dir};

/// Desired-set file: the products to converge plus cycle settings.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WinstallConfig {
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default)]
    pub max_parallel: Option<usize>,
    /// Extra provider patterns excluded on top of the built-in ones.
    #[serde(default)]
    pub exclude_providers: Vec<String>,
    #[serde(default)]
    pub products: BTreeMap<String, ProductSpec>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSpec {
    #[serde(default = "default_ensure")]
    pub ensure: Ensure,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub install_options: Vec<String>,
}

fn default_ensure() -> Ensure {
    Ensure::Installed
}

impl WinstallConfig {
    pub fn from_json(raw: &str) -> CoreResult<Self> {
        serde_json::from_str(raw).map_err(|error| {
            CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("invalid winstall configuration: {error}"),
            )
        })
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("failed to read configuration '{}': {error}", path.display()),
            )
        })?;
        Self::from_json(&raw)
    }

    /// Desired products in identity order. Specifications are validated
    /// per product at reconcile time, not here.
    pub fn desired_products(&self) -> Vec<DesiredProduct> {
        self.products
            .iter()
            .map(|(identity, spec)| DesiredProduct {
                identity: identity.clone(),
                ensure: spec.ensure.clone(),
                source: spec.source.clone(),
                install_options: spec.install_options.clone(),
            })
            .collect()
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(default_staging_dir)
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel.unwrap_or(DEFAULT_MAX_PARALLEL).max(1)
    }

    pub fn provider_filter(&self) -> CoreResult<ProviderFilter> {
        ProviderFilter::extended(&self.exclude_providers)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::WinstallConfig;
    use crate::models::{CoreErrorKind, Ensure};

    const SAMPLE: &str = r#"{
        "staging_dir": "C:\\Windows\\Temp",
        "max_parallel": 2,
        "products": {
            "7-Zip 19.00 (x64 edition)": {
                "ensure": "installed",
                "source": "https://www.7-zip.org/a/7z1900-x64.msi",
                "install_options": ["/qn"]
            },
            "Old Tool": { "ensure": "absent" }
        }
    }"#;

    #[test]
    fn parses_desired_products() {
        let config = WinstallConfig::from_json(SAMPLE).unwrap();
        let desired = config.desired_products();

        assert_eq!(desired.len(), 2);
        assert_eq!(desired[0].identity, "7-Zip 19.00 (x64 edition)");
        assert_eq!(desired[0].ensure, Ensure::Installed);
        assert_eq!(desired[0].install_options, vec!["/qn".to_string()]);
        assert_eq!(desired[1].ensure, Ensure::Absent);
        assert!(desired[1].source.is_none());
        assert_eq!(config.staging_dir(), PathBuf::from(r"C:\Windows\Temp"));
        assert_eq!(config.max_parallel(), 2);
    }

    #[test]
    fn ensure_defaults_to_installed() {
        let config =
            WinstallConfig::from_json(r#"{"products":{"Git":{"source":"https://x/git.exe"}}}"#)
                .unwrap();
        assert_eq!(config.desired_products()[0].ensure, Ensure::Installed);
    }

    #[test]
    fn rejects_unknown_keys() {
        let error = WinstallConfig::from_json(r#"{"products":{"Git":{"ensur":"absent"}}}"#)
            .unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::InvalidInput);
    }

    #[test]
    fn default_filter_applies_without_overrides() {
        let config = WinstallConfig::default();
        assert!(config.provider_filter().unwrap().is_excluded("puppet_gem"));
        assert_eq!(config.max_parallel(), 1);
    }

    #[test]
    fn configured_exclusions_extend_builtin_ones() {
        let config =
            WinstallConfig::from_json(r#"{"exclude_providers":["^chocolatey$"]}"#).unwrap();
        let filter = config.provider_filter().unwrap();
        assert!(filter.is_excluded("chocolatey"));
        assert!(filter.is_excluded("gem"));
        assert!(filter.is_excluded("puppet_gem"));
    }

    #[test]
    fn empty_exclusion_list_keeps_builtin_ones() {
        let config = WinstallConfig::from_json(r#"{"exclude_providers":[]}"#).unwrap();
        assert!(config.provider_filter().unwrap().is_excluded("puppet_gem"));
    }

    #[test]
    fn invalid_exclusion_pattern_is_invalid_input() {
        let config = WinstallConfig::from_json(r#"{"exclude_providers":["(gem"]}"#).unwrap();
        assert_eq!(
            config.provider_filter().unwrap_err().kind,
            CoreErrorKind::InvalidInput
        );
    }

    #[test]
    fn zero_parallelism_is_clamped() {
        let config = WinstallConfig::from_json(r#"{"max_parallel":0}"#).unwrap();
        assert_eq!(config.max_parallel(), 1);
    }
}
