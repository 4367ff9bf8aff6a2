//! The memoizing resolution database.
//!
//! `build` computes a request's fingerprint and then either returns the
//! completed entry, joins the resolution already in flight, or starts a new
//! one. Resolutions run on their own task, outside the entry lock, and
//! publish their outcome to every waiter through a watch channel.

use crate::config::DatabaseConfig;
use crate::context::Context;
use crate::graph::WaitGraph;
use crate::resolvable::Resolvable;
use crate::stats::{Counters, DatabaseStats};
use crate::store::ContentStore;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracelens_core::{BlobId, CaptureId, Error, Fingerprint, Result};
use tracelens_log::Capture;
use tracing::Instrument;

type Sender<V> = watch::Sender<Option<Result<V>>>;
type Receiver<V> = watch::Receiver<Option<Result<V>>>;

/// State of one cache entry. Pending moves to Ready or Failed exactly once.
enum Slot<V> {
    Pending(Receiver<V>),
    Ready(V),
    Failed(Error),
}

struct Entries<V> {
    slots: HashMap<Fingerprint, Slot<V>>,
    waits: WaitGraph,
}

enum Plan<V> {
    Join(Receiver<V>),
    Resolve(Sender<V>, Receiver<V>),
}

struct Inner<R: Resolvable> {
    config: DatabaseConfig,
    env: R::Env,
    entries: Mutex<Entries<R::Value>>,
    store: ContentStore,
    counters: Counters,
    shutdown: CancellationToken,
}

/// Shared store that resolves requests at most once and caches the results
///
/// Cloning is cheap: clones share the same cache. Entries live as long as
/// the database; captures are content-addressed and immutable, so a cached
/// entry never goes stale.
///
/// `build` spawns resolutions on the current tokio runtime.
pub struct Database<R: Resolvable> {
    inner: Arc<Inner<R>>,
}

impl<R: Resolvable> Database<R> {
    /// Create a database with the default configuration
    #[must_use]
    pub fn new(env: R::Env) -> Self {
        Self::with_config(DatabaseConfig::default(), env)
    }

    /// Create with custom configuration
    #[must_use]
    pub fn with_config(config: DatabaseConfig, env: R::Env) -> Self {
        let store = ContentStore::with_limit(config.max_blob_size);
        Self {
            inner: Arc::new(Inner {
                config,
                env,
                entries: Mutex::new(Entries {
                    slots: HashMap::new(),
                    waits: WaitGraph::default(),
                }),
                store,
                counters: Counters::default(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Cache configuration
    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// Services injected at construction
    #[must_use]
    pub fn env(&self) -> &R::Env {
        &self.inner.env
    }

    /// Root context for this database
    #[must_use]
    pub fn context(&self) -> Context<R> {
        Context::new(self.clone())
    }

    /// Resolve `resolvable`, or return its cached outcome
    ///
    /// Concurrent builds of requests with the same fingerprint share one
    /// resolution. A caller whose context is canceled stops waiting; the
    /// resolution itself carries on for the other waiters.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error (cached unless transient),
    /// [`Error::Canceled`] if `ctx` is canceled while waiting, or
    /// [`Error::Cycle`] if waiting would deadlock. Failures seen by a
    /// resolver's own nested builds are wrapped in [`Error::DependencyFailed`].
    pub async fn build(&self, ctx: &Context<R>, resolvable: R) -> Result<R::Value> {
        let fingerprint = Fingerprint::of(&resolvable)?;
        let resolvable = Arc::new(resolvable);

        match self.resolve_or_wait(ctx, fingerprint, Arc::clone(&resolvable)).await {
            Err(err) if ctx.frame().is_some() => {
                Err(Error::dependency(resolvable.to_string(), err))
            }
            result => result,
        }
    }

    async fn resolve_or_wait(
        &self,
        ctx: &Context<R>,
        fingerprint: Fingerprint,
        resolvable: Arc<R>,
    ) -> Result<R::Value> {
        let waiter = ctx.frame();

        let plan = {
            let mut entries = self.lock_entries();
            let plan = match entries.slots.get(&fingerprint) {
                Some(Slot::Ready(value)) => {
                    self.inner.counters.record_hit();
                    tracing::trace!(%fingerprint, "cache hit");
                    return Ok(value.clone());
                }
                Some(Slot::Failed(err)) => {
                    self.inner.counters.record_hit();
                    tracing::trace!(%fingerprint, "cached failure");
                    return Err(err.clone());
                }
                Some(Slot::Pending(receiver)) => Plan::Join(receiver.clone()),
                None => {
                    let (sender, receiver) = watch::channel(None);
                    Plan::Resolve(sender, receiver)
                }
            };

            if let Some(waiter) = waiter {
                if let Some(chain) = entries.waits.cycle(waiter, fingerprint) {
                    self.inner.counters.record_cycle();
                    let chain: Vec<String> = chain.iter().map(ToString::to_string).collect();
                    tracing::warn!(%fingerprint, chain = %chain.join(" -> "), "dependency cycle");
                    return Err(Error::Cycle { chain });
                }
                entries.waits.add(waiter, fingerprint);
            }

            match &plan {
                Plan::Join(_) => self.inner.counters.record_join(),
                Plan::Resolve(_, receiver) => {
                    self.inner.counters.record_miss();
                    entries
                        .slots
                        .insert(fingerprint, Slot::Pending(receiver.clone()));
                }
            }
            plan
        };

        let _edge = waiter.map(|from| WaitEdge {
            database: self,
            from,
            to: fingerprint,
        });

        let receiver = match plan {
            Plan::Join(receiver) => {
                tracing::trace!(%fingerprint, "joining resolution in flight");
                receiver
            }
            Plan::Resolve(sender, receiver) => {
                self.spawn_resolution(ctx, fingerprint, resolvable, sender);
                receiver
            }
        };

        self.wait(ctx, fingerprint, receiver).await
    }

    fn spawn_resolution(
        &self,
        ctx: &Context<R>,
        fingerprint: Fingerprint,
        resolvable: Arc<R>,
        sender: Sender<R::Value>,
    ) {
        let ctx = ctx.for_resolution(fingerprint, self.inner.shutdown.child_token());
        let completion = Completion {
            database: self.clone(),
            fingerprint,
            sender: Some(sender),
        };
        let span = tracing::debug_span!("resolve", %fingerprint, request = %resolvable);

        tokio::spawn(
            async move {
                let started = Instant::now();
                tracing::debug!("resolving");
                let outcome = resolvable.resolve(&ctx).await;
                tracing::debug!(
                    elapsed_us = started.elapsed().as_micros() as u64,
                    ok = outcome.is_ok(),
                    "resolved"
                );
                completion.finish(outcome);
            }
            .instrument(span),
        );
    }

    async fn wait(
        &self,
        ctx: &Context<R>,
        fingerprint: Fingerprint,
        mut receiver: Receiver<R::Value>,
    ) -> Result<R::Value> {
        let completed = async move {
            match receiver.wait_for(Option::is_some).await {
                Ok(outcome) => (*outcome).clone(),
                Err(_) => None,
            }
        };

        tokio::select! {
            biased;
            () = ctx.cancellation_token().cancelled() => {
                self.inner.counters.record_cancellation();
                tracing::debug!(%fingerprint, "wait canceled");
                Err(Error::Canceled)
            }
            outcome = completed => outcome.unwrap_or_else(|| {
                Err(Error::Internal {
                    message: format!("resolution of {} was abandoned", fingerprint),
                })
            }),
        }
    }

    /// Record the outcome of a finished resolution
    fn complete(&self, fingerprint: Fingerprint, outcome: &Result<R::Value>) {
        let mut entries = self.lock_entries();
        match outcome {
            Ok(value) => {
                entries.slots.insert(fingerprint, Slot::Ready(value.clone()));
            }
            Err(err) => {
                self.inner.counters.record_failure();
                if err.is_transient() || !self.inner.config.cache_failures {
                    tracing::debug!(%fingerprint, error = %err, "failure not cached");
                    entries.slots.remove(&fingerprint);
                } else {
                    entries.slots.insert(fingerprint, Slot::Failed(err.clone()));
                }
            }
        }
    }

    /// Forget a resolution that ended without an outcome
    fn abandon(&self, fingerprint: Fingerprint) {
        let mut entries = self.lock_entries();
        if matches!(entries.slots.get(&fingerprint), Some(Slot::Pending(_))) {
            entries.slots.remove(&fingerprint);
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, Entries<R::Value>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a completed outcome (value or cached failure) is stored for `fingerprint`
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        matches!(
            self.lock_entries().slots.get(fingerprint),
            Some(Slot::Ready(_) | Slot::Failed(_))
        )
    }

    /// Number of completed entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_entries()
            .slots
            .values()
            .filter(|slot| !matches!(slot, Slot::Pending(_)))
            .count()
    }

    /// Whether no completed entry is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every completed entry. Resolutions in flight are kept.
    pub fn clear(&self) {
        self.lock_entries()
            .slots
            .retain(|_, slot| matches!(slot, Slot::Pending(_)));
    }

    /// Cancel every resolution's nested waits
    ///
    /// Callers still receive an outcome; resolutions that depended on a
    /// canceled wait fail with a transient error and are not cached.
    pub fn shutdown(&self) {
        tracing::debug!("database shutting down");
        self.inner.shutdown.cancel();
    }

    /// Register a finalized capture
    pub fn add_capture(&self, capture: Capture) -> CaptureId {
        let capture = self.inner.store.add_capture(capture);
        tracing::debug!(capture = %capture.id(), name = capture.name(), atoms = capture.log().len(), "capture registered");
        capture.id()
    }

    /// Look up a registered capture
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureNotBound`] if no capture has this id
    pub fn capture(&self, id: &CaptureId) -> Result<Arc<Capture>> {
        self.inner.store.capture(id)
    }

    /// Store an opaque blob, returning its content address
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlobTooLarge`] if the blob exceeds the configured limit
    pub fn store_blob(&self, data: impl Into<Bytes>) -> Result<BlobId> {
        self.inner.store.write_blob(data)
    }

    /// Read a stored blob
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressNotFound`] if no blob has this id
    pub fn blob(&self, id: &BlobId) -> Result<Bytes> {
        self.inner.store.read_blob(id)
    }

    /// The capture and blob store
    #[must_use]
    pub fn store(&self) -> &ContentStore {
        &self.inner.store
    }

    /// Get database statistics
    #[must_use]
    pub fn stats(&self) -> DatabaseStats {
        let mut stats = DatabaseStats::default();
        {
            let entries = self.lock_entries();
            for slot in entries.slots.values() {
                match slot {
                    Slot::Pending(_) => stats.pending += 1,
                    Slot::Ready(_) | Slot::Failed(_) => stats.cached += 1,
                }
            }
        }
        self.inner.counters.fill(&mut stats);
        let store = self.inner.store.stats();
        stats.blob_count = store.blob_count;
        stats.blob_bytes = store.blob_bytes;
        stats.capture_count = store.capture_count;
        stats
    }
}

impl<R: Resolvable> Clone for Database<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Publishes a resolution's outcome; forgets the entry if dropped unfinished
struct Completion<R: Resolvable> {
    database: Database<R>,
    fingerprint: Fingerprint,
    sender: Option<Sender<R::Value>>,
}

impl<R: Resolvable> Completion<R> {
    fn finish(mut self, outcome: Result<R::Value>) {
        if let Some(sender) = self.sender.take() {
            self.database.complete(self.fingerprint, &outcome);
            sender.send_replace(Some(outcome));
        }
    }
}

impl<R: Resolvable> Drop for Completion<R> {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            tracing::warn!(fingerprint = %self.fingerprint, "resolution abandoned");
            self.database.abandon(self.fingerprint);
            drop(sender);
        }
    }
}

/// Wait-for edge, removed when the wait ends for any reason
struct WaitEdge<'a, R: Resolvable> {
    database: &'a Database<R>,
    from: Fingerprint,
    to: Fingerprint,
}

impl<R: Resolvable> Drop for WaitEdge<'_, R> {
    fn drop(&mut self) {
        self.database.lock_entries().waits.remove(self.from, self.to);
    }
}
