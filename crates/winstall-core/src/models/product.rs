use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::models::{CoreError, CoreErrorKind, CoreResult};

const ABSENT_TOKENS: &[&str] = &["absent", "purged"];
const INSTALLED_TOKENS: &[&str] = &["installed", "present"];

/// Desired lifecycle state of a product.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Ensure {
    Installed,
    Absent,
    Version(String),
}

impl Ensure {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Installed => "installed",
            Self::Absent => "absent",
            Self::Version(version) => version.as_str(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// `Installed` accepts any present entry; a version only accepts an
    /// exact match of the observed state.
    pub fn is_satisfied_by(&self, observed: &ObservedProduct) -> bool {
        match self {
            Self::Installed => !observed.is_absent(),
            Self::Absent => observed.is_absent(),
            Self::Version(version) => observed.version_or_state == *version,
        }
    }
}

impl Display for Ensure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Ensure {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                "ensure must not be empty",
            ));
        }

        let lowered = trimmed.to_ascii_lowercase();
        if INSTALLED_TOKENS.contains(&lowered.as_str()) {
            Ok(Self::Installed)
        } else if ABSENT_TOKENS.contains(&lowered.as_str()) {
            Ok(Self::Absent)
        } else {
            Ok(Self::Version(trimmed.to_string()))
        }
    }
}

impl TryFrom<String> for Ensure {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ensure> for String {
    fn from(value: Ensure) -> Self {
        match value {
            Ensure::Version(version) => version,
            other => other.as_str().to_string(),
        }
    }
}

/// Caller-supplied specification for one product.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DesiredProduct {
    pub identity: String,
    pub ensure: Ensure,
    pub source: Option<String>,
    pub install_options: Vec<String>,
}

impl DesiredProduct {
    pub fn new(identity: impl Into<String>, ensure: Ensure) -> Self {
        Self {
            identity: identity.into(),
            ensure,
            source: None,
            install_options: Vec::new(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn install_option(mut self, option: impl Into<String>) -> Self {
        self.install_options.push(option.into());
        self
    }

    pub fn install_options(mut self, options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.install_options
            .extend(options.into_iter().map(Into::into));
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.identity.trim().is_empty() {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                "product identity must not be empty",
            ));
        }

        if self.ensure.is_absent() {
            return Ok(());
        }

        match self.source.as_deref().map(str::trim) {
            Some(source) if !source.is_empty() => Ok(()),
            _ => Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!(
                    "product '{}' requires a source when ensure is '{}'",
                    self.identity, self.ensure
                ),
            )
            .identity(self.identity.clone())),
        }
    }
}

/// One raw row of the host package database.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PackageRecord {
    pub identity: String,
    pub provider: String,
    pub attributes: BTreeMap<String, String>,
}

impl PackageRecord {
    pub fn new(identity: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            provider: provider.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ObservedProduct {
    pub identity: String,
    pub version_or_state: String,
    pub provider: String,
}

impl ObservedProduct {
    pub fn new(
        identity: impl Into<String>,
        version_or_state: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            version_or_state: version_or_state.into(),
            provider: provider.into(),
        }
    }

    pub fn is_absent(&self) -> bool {
        ABSENT_TOKENS.contains(&self.version_or_state.to_ascii_lowercase().as_str())
    }
}

/// Snapshot of the host's managed products keyed by identity.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedInventory {
    products: BTreeMap<String, ObservedProduct>,
}

impl ObservedInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry previously stored under the same identity, if any.
    pub fn insert(&mut self, product: ObservedProduct) -> Option<ObservedProduct> {
        self.products.insert(product.identity.clone(), product)
    }

    pub fn get(&self, identity: &str) -> Option<&ObservedProduct> {
        self.products.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.products.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObservedProduct> {
        self.products.values()
    }
}

impl FromIterator<ObservedProduct> for ObservedInventory {
    fn from_iter<T: IntoIterator<Item = ObservedProduct>>(iter: T) -> Self {
        let mut inventory = Self::new();
        for product in iter {
            inventory.insert(product);
        }
        inventory
    }
}
