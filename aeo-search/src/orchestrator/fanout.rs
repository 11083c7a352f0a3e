//! Concurrent provider fan-out with per-provider failure isolation.
//!
//! Each provider query runs on its own spawned task behind a shared
//! semaphore. Errors and panics are caught at the task boundary and turned
//! into [`ProviderPayload::Error`] entries, so the caller always gets one
//! settled payload per provider.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;

use crate::config::SearchConfig;
use crate::engine::AnswerEngine;
use crate::engines::ProviderEngine;
use crate::error::SearchError;
use crate::types::{Provider, ProviderPayload};

/// Error recorded for a provider whose API key is absent.
pub const MISSING_CREDENTIAL: &str = "credential not configured";

/// A boxed, owned provider query.
pub type QueryFuture = BoxFuture<'static, Result<ProviderPayload, SearchError>>;

/// A zero-argument provider query, invoked once a worker slot is free.
pub type QueryThunk = Box<dyn FnOnce() -> QueryFuture + Send>;

/// Wrap an engine and a subject into a [`QueryThunk`].
pub fn thunk<E>(engine: Arc<E>, subject: impl Into<String>) -> QueryThunk
where
    E: AnswerEngine + 'static,
{
    let subject = subject.into();
    Box::new(move || -> QueryFuture { Box::pin(async move { engine.query(&subject).await }) })
}

/// Runs provider queries concurrently under a bounded worker budget.
#[derive(Debug, Clone, Copy)]
pub struct FanOutCoordinator {
    width: usize,
}

impl FanOutCoordinator {
    /// Create a coordinator allowing at most `width` queries in flight.
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    /// The configured upper bound on concurrent queries.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Execute every provided thunk and wait for all of them to settle.
    ///
    /// A `None` entry means the provider's credential is absent: it is
    /// recorded as [`MISSING_CREDENTIAL`] without being invoked and without
    /// taking a worker slot. The effective width is the configured width
    /// capped at the number of invoked providers.
    ///
    /// There is no early return: the result holds exactly one payload per
    /// input key once the slowest query has finished.
    pub async fn run(
        &self,
        calls: BTreeMap<Provider, Option<QueryThunk>>,
    ) -> BTreeMap<Provider, ProviderPayload> {
        let started = Instant::now();
        let invoked = calls.values().filter(|c| c.is_some()).count();
        let permits = Arc::new(Semaphore::new(self.width.min(invoked).max(1)));

        let mut settled = BTreeMap::new();
        let mut providers = Vec::with_capacity(invoked);
        let mut tasks = Vec::with_capacity(invoked);

        for (provider, call) in calls {
            let Some(call) = call else {
                tracing::warn!(%provider, "skipping provider: {MISSING_CREDENTIAL}");
                settled.insert(provider, ProviderPayload::error(MISSING_CREDENTIAL));
                continue;
            };

            let permits = Arc::clone(&permits);
            providers.push(provider);
            tasks.push(tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| SearchError::Provider(format!("worker pool closed: {e}")))?;
                call().await
            }));
        }

        let outcomes = futures::future::join_all(tasks).await;

        for (provider, outcome) in providers.into_iter().zip(outcomes) {
            let payload = match outcome {
                Ok(Ok(payload)) => {
                    tracing::debug!(%provider, "provider query settled");
                    payload
                }
                Ok(Err(err)) => {
                    tracing::warn!(%provider, error = %err, "provider query failed");
                    ProviderPayload::error(err)
                }
                Err(join_err) => {
                    tracing::warn!(%provider, error = %join_err, "provider task aborted");
                    ProviderPayload::error(format!("provider task aborted: {join_err}"))
                }
            };
            settled.insert(provider, payload);
        }

        tracing::info!(
            providers = settled.len(),
            invoked,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fan-out complete"
        );
        settled
    }
}

/// Query every provider about `subject` using the keys that are present.
///
/// Providers absent from `keys` are recorded as [`MISSING_CREDENTIAL`]. An
/// engine that cannot be built is recorded as an error payload for that
/// provider alone.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` fails validation. Provider
/// failures never surface here.
pub async fn query_providers(
    subject: &str,
    config: &SearchConfig,
    keys: &BTreeMap<Provider, String>,
) -> Result<BTreeMap<Provider, ProviderPayload>, SearchError> {
    config.validate()?;
    tracing::debug!(subject, "querying answer engines");

    let mut calls: BTreeMap<Provider, Option<QueryThunk>> = BTreeMap::new();
    for provider in Provider::all() {
        let call = match keys.get(provider) {
            None => None,
            Some(key) => match ProviderEngine::new(*provider, config, key.as_str()) {
                Ok(engine) => Some(thunk(Arc::new(engine), subject)),
                Err(err) => {
                    let message = err.to_string();
                    let failing: QueryThunk = Box::new(move || -> QueryFuture {
                        Box::pin(async move { Err(SearchError::Http(message)) })
                    });
                    Some(failing)
                }
            },
        };
        calls.insert(*provider, call);
    }

    Ok(FanOutCoordinator::new(config.fan_out_width).run(calls).await)
}
