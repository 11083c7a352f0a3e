//! Core types for provider identification, raw payloads and citations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank assigned to a citation that carries no position at all.
///
/// Scores at the floor, so an unranked match still counts as presence.
pub const UNRANKED_POSITION: u32 = 999;

/// Answer engines that can be queried for domain presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Gemini with Google Search grounding: structured grounding chunks.
    Gemini,
    /// Perplexity Sonar: top-level citation list.
    Perplexity,
    /// OpenAI chat completions: free text only.
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    /// Returns the stable lower-case name used as a result key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Perplexity => "perplexity",
            Self::OpenAi => "openai",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn credential_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Perplexity => "PERPLEXITY_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Returns all provider variants in result order.
    pub fn all() -> &'static [Provider] {
        &[Self::Gemini, Self::Perplexity, Self::OpenAi]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One citation entry exactly as a provider reported it.
///
/// Both fields are optional because providers omit them freely; the
/// normaliser substitutes empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCitation {
    /// Cited URL, if present.
    pub url: Option<String>,
    /// Page title, if present.
    pub title: Option<String>,
}

impl RawCitation {
    /// A citation carrying only a URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: None,
        }
    }

    /// A citation carrying a URL and a title.
    pub fn titled(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: Some(title.into()),
        }
    }
}

/// The settled outcome of one provider query.
///
/// Every provider response, and every provider failure, is expressed as
/// one of these variants so a single normaliser can consume them all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderPayload {
    /// An answer accompanied by provider-ordered citation metadata.
    Structured {
        /// Free-form answer text.
        answer: String,
        /// Citation entries in provider order.
        citations: Vec<RawCitation>,
    },
    /// A free-form answer with no citation metadata.
    FreeText {
        /// Free-form answer text.
        answer: String,
    },
    /// The provider could not contribute (transport fault, bad status,
    /// missing credential).
    Error {
        /// Human-readable cause.
        message: String,
    },
}

impl ProviderPayload {
    /// Build an error payload from any displayable cause.
    pub fn error(message: impl fmt::Display) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    /// The answer text, empty for error payloads.
    pub fn answer(&self) -> &str {
        match self {
            Self::Structured { answer, .. } | Self::FreeText { answer } => answer,
            Self::Error { .. } => "",
        }
    }

    /// The error message, if this payload records a failure.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// A normalised citation: one candidate source found by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based rank; `None` is scored as [`UNRANKED_POSITION`].
    pub position: Option<u32>,
    /// Cited URL.
    pub url: String,
    /// Page title, possibly empty.
    #[serde(default)]
    pub title: String,
}

impl Citation {
    /// Build a ranked citation.
    pub fn new(position: u32, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            position: Some(position),
            url: url.into(),
            title: title.into(),
        }
    }

    /// The rank used for scoring.
    pub fn effective_position(&self) -> u32 {
        self.position.unwrap_or(UNRANKED_POSITION)
    }
}

/// One provider's presence evaluation for a target domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderScore {
    /// Best position score in `[0, 100]`.
    pub score: u32,
    /// Whether any citation matched the domain.
    pub domain_found: bool,
    /// Positions of every matching citation, in match order.
    pub matched_positions: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_display() {
        assert_eq!(Provider::Gemini.to_string(), "gemini");
        assert_eq!(Provider::Perplexity.to_string(), "perplexity");
        assert_eq!(Provider::OpenAi.to_string(), "openai");
    }

    #[test]
    fn provider_serde_uses_result_keys() {
        let json = serde_json::to_string(&Provider::OpenAi).expect("serialize");
        assert_eq!(json, "\"openai\"");
        let decoded: Provider = serde_json::from_str("\"perplexity\"").expect("deserialize");
        assert_eq!(decoded, Provider::Perplexity);
    }

    #[test]
    fn credential_vars_are_distinct() {
        let vars: std::collections::HashSet<_> =
            Provider::all().iter().map(|p| p.credential_var()).collect();
        assert_eq!(vars.len(), 3);
    }

    #[test]
    fn all_is_sorted_in_result_order() {
        let mut sorted = Provider::all().to_vec();
        sorted.sort();
        assert_eq!(sorted, Provider::all());
    }

    #[test]
    fn error_payload_has_no_answer() {
        let payload = ProviderPayload::error("API key not set");
        assert_eq!(payload.answer(), "");
        assert_eq!(payload.error_message(), Some("API key not set"));
    }

    #[test]
    fn payload_serialises_with_kind_tag() {
        let payload = ProviderPayload::FreeText {
            answer: "hello".into(),
        };
        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(value["kind"], "free_text");
        assert_eq!(value["answer"], "hello");
    }

    #[test]
    fn unranked_citation_uses_sentinel() {
        let citation = Citation {
            position: None,
            url: "https://a.com".into(),
            title: String::new(),
        };
        assert_eq!(citation.effective_position(), UNRANKED_POSITION);
        assert_eq!(Citation::new(3, "https://a.com", "").effective_position(), 3);
    }
}
