use regex::Regex;

use crate::models::{CoreError, CoreErrorKind, CoreResult};

/// Providers that belong to a language runtime rather than the OS package
/// database. Products registered through them are never managed.
pub const DEFAULT_EXCLUDED_PROVIDER_PATTERNS: &[&str] =
    &["(puppet_)?gem$", "(?i)^(powershellget|nuget)$"];

#[derive(Clone, Debug)]
pub struct ProviderFilter {
    excluded: Vec<Regex>,
}

impl ProviderFilter {
    pub fn new<I, P>(patterns: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let excluded = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|error| {
                    CoreError::new(
                        CoreErrorKind::InvalidInput,
                        format!("invalid provider exclusion pattern '{pattern}': {error}"),
                    )
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self { excluded })
    }

    /// Built-in runtime-provider patterns plus `extra`. The built-in
    /// exclusions cannot be switched off.
    pub fn extended<I, P>(extra: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self::new(
            DEFAULT_EXCLUDED_PROVIDER_PATTERNS
                .iter()
                .map(|pattern| (*pattern).to_string())
                .chain(extra.into_iter().map(|pattern| pattern.as_ref().to_string())),
        )
    }

    pub fn is_excluded(&self, provider: &str) -> bool {
        self.excluded.iter().any(|pattern| pattern.is_match(provider))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(Regex::as_str)
    }
}

impl Default for ProviderFilter {
    fn default() -> Self {
        Self {
            excluded: DEFAULT_EXCLUDED_PROVIDER_PATTERNS
                .iter()
                .filter_map(|pattern| Regex::new(pattern).ok())
                .collect(),
        }
    }
}
