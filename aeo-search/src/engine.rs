//! Trait definition for pluggable answer engine backends.
//!
//! Each answer engine (Gemini, Perplexity, OpenAI) implements
//! [`AnswerEngine`] to provide a uniform query interface. The result is
//! always a [`ProviderPayload`] or a typed [`SearchError`]; nothing panics
//! across this boundary.

use crate::error::SearchError;
use crate::types::{Provider, ProviderPayload};

/// A pluggable answer engine backend.
///
/// Implementors own their HTTP client, credentials and request shape.
/// Each handles its own:
///
/// - request body construction for the vendor API
/// - authentication
/// - timeout (configured on the client)
/// - mapping of the vendor response onto [`ProviderPayload`]
///
/// All implementations must be `Send + Sync` for concurrent queries.
pub trait AnswerEngine: Send + Sync {
    /// Ask the engine about `subject` and return its raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport faults, timeouts, non-success
    /// statuses, or a response with no answer at all.
    fn query(
        &self,
        subject: &str,
    ) -> impl std::future::Future<Output = Result<ProviderPayload, SearchError>> + Send;

    /// Returns which [`Provider`] this implementation represents.
    fn provider(&self) -> Provider;
}
