//! API credentials resolved from the environment.
//!
//! Every credential is independently optional. Whether an absent key is
//! fatal is decided by each workflow: the visibility workflow only loses that
//! provider's contribution, while the catalogue key is always required.

use std::collections::BTreeMap;
use std::fmt;

use aeo_search::Provider;

use crate::error::{Result, RunnerError};

/// Environment variable holding the product catalogue key.
pub const TRUSTANA_API_KEY: &str = "TRUSTANA_API_KEY";
/// Environment variable holding the SerpAPI key.
pub const SERPAPI_API_KEY: &str = "SERPAPI_API_KEY";

/// Resolved credential values ready for runtime use.
///
/// Implements a custom [`Debug`] that redacts all values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Product catalogue key.
    pub trustana: Option<String>,
    /// Gemini key.
    pub gemini: Option<String>,
    /// Perplexity key.
    pub perplexity: Option<String>,
    /// OpenAI key (answer engine and translation).
    pub openai: Option<String>,
    /// SerpAPI key.
    pub serpapi: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("trustana", &redact(&self.trustana))
            .field("gemini", &redact(&self.gemini))
            .field("perplexity", &redact(&self.perplexity))
            .field("openai", &redact(&self.openai))
            .field("serpapi", &redact(&self.serpapi))
            .finish()
    }
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "[REDACTED]",
        None => "<unset>",
    }
}

impl Credentials {
    /// Read every key from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read every key through `lookup`. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        Self {
            trustana: get(TRUSTANA_API_KEY),
            gemini: get(Provider::Gemini.credential_var()),
            perplexity: get(Provider::Perplexity.credential_var()),
            openai: get(Provider::OpenAi.credential_var()),
            serpapi: get(SERPAPI_API_KEY),
        }
    }

    /// The key for one answer engine, if configured.
    pub fn provider_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Gemini => self.gemini.as_deref(),
            Provider::Perplexity => self.perplexity.as_deref(),
            Provider::OpenAi => self.openai.as_deref(),
        }
    }

    /// Keys for every configured answer engine.
    pub fn provider_keys(&self) -> BTreeMap<Provider, String> {
        Provider::all()
            .iter()
            .filter_map(|p| self.provider_key(*p).map(|key| (*p, key.to_owned())))
            .collect()
    }

    /// Return a mandatory key or a precondition failure naming it.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Precondition`] when `value` is `None`.
    pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value
            .as_deref()
            .ok_or_else(|| RunnerError::Precondition(format!("{name} not set")))
    }
}
