//! Fetch and update handlers
//!
//! Transport-agnostic: routes decode the wire types, call into
//! [`ConfigService`], and render whatever comes back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::field::Empty;
use vconf_document::{merge_with_report, parse, to_yaml, VectorConfig};
use vconf_store::{RecordKey, RecordStore, StoreError, StoreResult};

use crate::error::ApiError;
use crate::wire::{FetchRequest, UpdateRequest};

/// Default bound on update attempts
pub const DEFAULT_MAX_UPDATE_ATTEMPTS: u32 = 3;

/// Default bound on a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request limits handed to every store call
#[derive(Debug, Clone)]
pub struct RequestContext {
    store_timeout: Duration,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Create context with explicit limits
    #[inline]
    #[must_use]
    pub fn new(store_timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            store_timeout,
            cancel,
        }
    }

    /// Token that aborts this request
    #[inline]
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run one store call under this context's limits
    ///
    /// The outer error is the context's own failure (cancelled or timed
    /// out); the inner result is whatever the store returned.
    async fn call<T, F>(&self, op: &'static str, fut: F) -> Result<StoreResult<T>, ApiError>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ApiError::Cancelled),
            result = tokio::time::timeout(self.store_timeout, fut) => result.map_err(|_| {
                ApiError::Upstream(format!(
                    "store {op} timed out after {}ms",
                    self.store_timeout.as_millis()
                ))
            }),
        }
    }
}

/// Request handlers over a record store
#[derive(Debug, Clone)]
pub struct ConfigService {
    store: Arc<dyn RecordStore>,
    max_update_attempts: u32,
    store_timeout: Duration,
    shutdown: CancellationToken,
}

impl ConfigService {
    /// Create service with default limits
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            max_update_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            shutdown: CancellationToken::new(),
        }
    }

    /// With update attempt bound (at least one attempt is always made)
    #[inline]
    #[must_use]
    pub fn with_max_update_attempts(mut self, attempts: u32) -> Self {
        self.max_update_attempts = attempts.max(1);
        self
    }

    /// With per-call store timeout
    #[inline]
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// With shutdown token; cancelling it aborts every in-flight request
    #[inline]
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Shutdown token shared by all request contexts
    #[inline]
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Configured update attempt bound
    #[inline]
    #[must_use]
    pub fn max_update_attempts(&self) -> u32 {
        self.max_update_attempts
    }

    /// Fresh context for one request, cancelled on shutdown
    #[must_use]
    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.store_timeout, self.shutdown.child_token())
    }

    /// Read and decode the stored document
    ///
    /// # Errors
    /// - `ApiError::Validation` if namespace or name is missing
    /// - `ApiError::Upstream` if the record is absent, the store fails, or
    ///   the call times out
    /// - `ApiError::UpstreamData` if the stored text does not parse
    /// - `ApiError::Cancelled` if the context is cancelled
    #[tracing::instrument(
        skip_all,
        fields(backend = self.store.backend(), namespace = Empty, name = Empty)
    )]
    pub async fn fetch(
        &self,
        ctx: &RequestContext,
        request: FetchRequest,
    ) -> Result<VectorConfig, ApiError> {
        let key = validate_key(request.namespace.as_deref(), request.name.as_deref())?;

        let record = ctx.call("get", self.store.get(&key)).await??;
        let doc = parse(&record.text).map_err(ApiError::UpstreamData)?;

        tracing::debug!(
            version = %record.version,
            entries = doc.entry_count(),
            "Fetched document"
        );
        Ok(doc)
    }

    /// Merge a fragment into the stored document
    ///
    /// # Workflow
    /// 1. Read the record and its version
    /// 2. Parse and merge the fragment over it
    /// 3. Write back, conditional on the version read in step 1
    /// 4. On a version conflict, start again from step 1
    ///
    /// # Returns
    /// The document that was written
    ///
    /// # Errors
    /// - `ApiError::Validation` if namespace or name is missing
    /// - `ApiError::Upstream` if the record is absent, the store fails, or
    ///   a call times out
    /// - `ApiError::UpstreamData` if the stored text does not parse
    /// - `ApiError::Serialize` if the merged document cannot be encoded
    /// - `ApiError::UpstreamConflict` if every attempt lost a version race
    /// - `ApiError::Cancelled` if the context is cancelled
    #[tracing::instrument(
        skip_all,
        fields(backend = self.store.backend(), namespace = Empty, name = Empty)
    )]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        request: UpdateRequest,
    ) -> Result<VectorConfig, ApiError> {
        let key = validate_key(request.namespace.as_deref(), request.name.as_deref())?;
        let fragment = request.fragment;

        for attempt in 1..=self.max_update_attempts {
            let record = ctx.call("get", self.store.get(&key)).await??;
            let current = parse(&record.text).map_err(ApiError::UpstreamData)?;

            let (updated, report) = merge_with_report(&current, &fragment);
            tracing::debug!(
                attempt,
                added = ?report.added,
                replaced = ?report.replaced,
                unchanged = report.unchanged.len(),
                "Merged fragment"
            );

            let text = to_yaml(&updated).map_err(ApiError::Serialize)?;

            match ctx
                .call("patch", self.store.patch(&key, &record.version, text))
                .await?
            {
                Ok(version) => {
                    tracing::info!(attempt, %version, "Updated document");
                    return Ok(updated);
                }
                Err(err @ StoreError::Conflict { .. }) => {
                    tracing::warn!(attempt, max = self.max_update_attempts, "{}", err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ApiError::UpstreamConflict {
            attempts: self.max_update_attempts,
        })
    }
}

/// Build the record key, rejecting missing or empty parts
fn validate_key(namespace: Option<&str>, name: Option<&str>) -> Result<RecordKey, ApiError> {
    let name = name
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("configMapName is required"))?;
    let namespace = namespace
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("configMapNameSpace is required"))?;

    let span = tracing::Span::current();
    span.record("namespace", namespace);
    span.record("name", name);

    Ok(RecordKey::new(namespace, name))
}
