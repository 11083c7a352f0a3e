//! Product catalogue (Trustana) client.
//!
//! Every workflow starts from one product record. The catalogue returns
//! attributes as a list of `{category, key, value}` entries; the product
//! name and brand are attributes too.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::SubjectConfig;
use crate::error::{Result, RunnerError};

/// One catalogue attribute.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubjectAttribute {
    /// Attribute group, used by `category//key` paths.
    #[serde(default)]
    pub category: Option<String>,
    /// Attribute key.
    #[serde(default)]
    pub key: String,
    /// Attribute value, usually a string.
    #[serde(default)]
    pub value: Value,
}

impl SubjectAttribute {
    /// The value rendered as text; `None` when null or empty.
    pub fn text(&self) -> Option<String> {
        let text = match &self.value {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

/// The product a run is about.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    /// `name` attribute, or `"Unknown"`.
    pub name: String,
    /// `brand` attribute, or empty.
    pub brand: String,
    /// Catalogue SKU (`skuId`), if present.
    pub identifier: Option<String>,
    /// `longDescription`, if present.
    pub long_description: Option<String>,
    /// Every attribute in catalogue order.
    pub attributes: Vec<SubjectAttribute>,
}

impl Subject {
    /// Build a subject from one catalogue product record.
    pub fn from_record(record: &Value) -> Self {
        let attributes: Vec<SubjectAttribute> = record
            .get("attributes")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| serde_json::from_value(e.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let by_key = |key: &str| {
            attributes
                .iter()
                .rev()
                .find(|a| a.key == key)
                .and_then(SubjectAttribute::text)
        };
        let name = by_key("name").unwrap_or_else(|| "Unknown".to_owned());
        let brand = by_key("brand").unwrap_or_default();

        let text_field = |field: &str| {
            record
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        Self {
            name,
            brand,
            identifier: text_field("skuId"),
            long_description: text_field("longDescription"),
            attributes,
        }
    }

    /// The search query for this product: name and brand, trimmed.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.name, self.brand).trim().to_owned()
    }

    /// Look up an attribute by `key` or by `category//key`.
    ///
    /// The first matching attribute wins; empty values count as missing.
    pub fn attribute(&self, path: &str) -> Option<String> {
        let parts: Vec<&str> = path.split("//").collect();
        let matches = |attr: &&SubjectAttribute| match parts.as_slice() {
            [category, key] => attr.category.as_deref() == Some(*category) && attr.key == *key,
            _ => attr.key == path,
        };
        self.attributes
            .iter()
            .find(matches)
            .and_then(SubjectAttribute::text)
    }
}

/// Fetches product records from the catalogue search API.
pub struct SubjectClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for SubjectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubjectClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SubjectClient {
    /// Create a client from settings and the catalogue key.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &SubjectConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RunnerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Fetch the first product.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Upstream`] on a transport fault, a non-200
    /// status, an unreadable body, or an empty result set.
    pub async fn fetch_first(&self) -> Result<Subject> {
        tracing::info!("fetching product from catalogue");

        let response = self
            .client
            .post(format!("{}/v1/products/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&json!({"pagination": {"offset": 0, "limit": 1}}))
            .send()
            .await
            .map_err(|e| RunnerError::Upstream(format!("Trustana API request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RunnerError::Upstream(format!("Trustana API request failed: {e}")))?;

        if status != reqwest::StatusCode::OK {
            return Err(RunnerError::Upstream(format!(
                "Trustana API error: {} - {}",
                status.as_u16(),
                aeo_search::http::truncate_body(&body)
            )));
        }

        let data: Value = serde_json::from_str(&body)
            .map_err(|e| RunnerError::Upstream(format!("Trustana API returned invalid JSON: {e}")))?;
        let products = data
            .pointer("/data/result")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        tracing::debug!(count = products.len(), "catalogue products returned");

        let Some(record) = products.first() else {
            return Err(RunnerError::Upstream("No products found in Trustana".into()));
        };

        let subject = Subject::from_record(record);
        tracing::info!(name = %subject.name, brand = %subject.brand, "fetched product");
        Ok(subject)
    }
}
