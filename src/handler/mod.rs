//! Readiness orchestration.
//!
//! [`FirstPartySetsHandler`] owns the published store. It combines the
//! public list, the override flag set and the enterprise policy, releases
//! queued readers once the store is ready, and then diffs the new store
//! against the previously persisted one so stale site data gets cleared.
//!
//! ## Lifecycle
//!
//! ```text
//! NotInitialized --init--> Initializing --public sets--> Ready
//!        ^                                                 |
//!        +---------------- reset_for_testing --------------+
//! ```
//!
//! ## Ordering
//!
//! - Callbacks queued before readiness fire once, in enqueue order
//! - `get_sets` after readiness returns the store synchronously
//! - The new store is persisted only after the old one was read and the
//!   clear request was handed off

pub mod config;
pub mod state;

pub use config::HandlerConfig;
pub use state::{ReadinessState, SetsCallback};

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, info, warn};

use crate::clearing::SiteDataClearer;
use crate::diff::compute_sets_diff;
use crate::parser::{parse_flattened_sets, parse_manual_set_flag};
use crate::policy::compute_enterprise_customizations;
use crate::store::{FileSetsStore, SetsStore};
use crate::types::{FlattenedSets, SingleSet};
use state::{HandlerInner, PersistJob};

/// Errors from handler sequencing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// `init` was called outside `NotInitialized`.
    #[error("Handler already initialized (state: {0})")]
    AlreadyInitialized(ReadinessState),
    /// `init` was called outside a tokio runtime.
    #[error("No tokio runtime available for background loading")]
    NoRuntime,
    /// The handler was reset before the store became ready.
    #[error("Handler was reset before sets became ready")]
    Reset,
}

/// Owner of the combined first-party sets for one process.
///
/// Constructed once by the embedder's startup sequence and shared as
/// `Arc<FirstPartySetsHandler>`.
pub struct FirstPartySetsHandler {
    config: HandlerConfig,
    clearer: Arc<dyn SiteDataClearer>,
    inner: Mutex<HandlerInner>,
    persisted: Notify,
}

impl FirstPartySetsHandler {
    /// Create a handler in the `NotInitialized` state.
    pub fn new(config: HandlerConfig, clearer: Arc<dyn SiteDataClearer>) -> Arc<Self> {
        Arc::new(Self {
            config,
            clearer,
            inner: Mutex::new(HandlerInner::default()),
            persisted: Notify::new(),
        })
    }

    /// Handler configuration.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Current readiness state.
    pub fn state(&self) -> ReadinessState {
        self.inner.lock().state
    }

    /// Whether the store is published.
    pub fn is_ready(&self) -> bool {
        self.state() == ReadinessState::Ready
    }

    /// Start loading sources.
    ///
    /// The previous mapping is read from
    /// `<storage_dir>/persisted_first_party_sets.json`; `None` means nothing
    /// is read or written. Must be called from within a tokio runtime.
    pub fn init(
        self: &Arc<Self>,
        storage_dir: Option<PathBuf>,
        flag_value: &str,
    ) -> Result<(), HandlerError> {
        let store = storage_dir.map(|dir| Arc::new(FileSetsStore::new(dir)) as Arc<dyn SetsStore>);
        self.start(store, flag_value)
    }

    /// Start loading sources with an injected storage backend.
    pub fn init_with_store(
        self: &Arc<Self>,
        store: Arc<dyn SetsStore>,
        flag_value: &str,
    ) -> Result<(), HandlerError> {
        self.start(Some(store), flag_value)
    }

    fn start(
        self: &Arc<Self>,
        store: Option<Arc<dyn SetsStore>>,
        flag_value: &str,
    ) -> Result<(), HandlerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| HandlerError::NoRuntime)?;

        let (generation, released) = {
            let mut inner = self.inner.lock();
            if inner.state != ReadinessState::NotInitialized {
                warn!(
                    target: "first_party_sets::handler",
                    state = %inner.state,
                    "init called twice; ignoring"
                );
                return Err(HandlerError::AlreadyInitialized(inner.state));
            }

            inner.state = ReadinessState::Initializing;
            inner.store = store.clone();
            inner.runtime = Some(runtime.clone());
            inner.manual_set = if self.config.enabled {
                manual_set_from_flag(flag_value)
            } else {
                None
            };

            if !self.config.enabled {
                inner.public_sets = Some(FlattenedSets::new());
            } else if !self.config.embedder_provides_public_sets && inner.public_sets.is_none() {
                inner.public_sets = Some(FlattenedSets::new());
            }

            info!(
                target: "first_party_sets::handler",
                enabled = self.config.enabled,
                has_storage = store.is_some(),
                has_manual_set = inner.manual_set.is_some(),
                has_policy = self.config.policy.is_some(),
                "initializing"
            );

            (inner.generation, self.try_become_ready(&mut inner))
        };
        release(released);

        let handler = Arc::clone(self);
        runtime.spawn(async move {
            handler.load_previous_sets(generation, store).await;
        });

        Ok(())
    }

    /// Deliver the public list as raw record-stream text.
    ///
    /// Unparseable content counts as an empty list. Only the first delivery
    /// is used.
    pub fn set_public_sets(self: &Arc<Self>, contents: &str) {
        let sets = match parse_flattened_sets(contents) {
            Ok(sets) => sets,
            Err(e) => {
                warn!(
                    target: "first_party_sets::handler",
                    error = %e,
                    "public sets failed to parse; using empty list"
                );
                FlattenedSets::new()
            }
        };
        self.deliver_public_sets(sets);
    }

    /// Read the public list from `path` and deliver it.
    ///
    /// An unreadable file counts as an empty list.
    pub async fn load_public_sets_file(self: &Arc<Self>, path: impl Into<PathBuf>) {
        let path = path.into();
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => self.set_public_sets(&contents),
            Err(e) => {
                warn!(
                    target: "first_party_sets::handler",
                    path = %path.display(),
                    error = %e,
                    "public sets file unreadable; using empty list"
                );
                self.deliver_public_sets(FlattenedSets::new());
            }
        }
    }

    fn deliver_public_sets(self: &Arc<Self>, sets: FlattenedSets) {
        let (released, job, runtime) = {
            let mut inner = self.inner.lock();
            if !self.config.embedder_provides_public_sets {
                warn!(
                    target: "first_party_sets::handler",
                    "public sets delivered but embedder is not the provider; ignoring"
                );
                return;
            }
            if inner.public_sets.is_some() {
                warn!(
                    target: "first_party_sets::handler",
                    "public sets already received; ignoring"
                );
                return;
            }

            debug!(
                target: "first_party_sets::handler",
                site_count = sets.len(),
                "public sets received"
            );
            inner.public_sets = Some(sets);

            let released = self.try_become_ready(&mut inner);
            let job = inner.take_persist_job();
            (released, job, inner.runtime.clone())
        };
        release(released);

        if let (Some(job), Some(runtime)) = (job, runtime) {
            let handler = Arc::clone(self);
            runtime.spawn(async move {
                handler.persist(job).await;
            });
        }
    }

    /// Get the current store.
    ///
    /// Returns `Some` once ready; `callback` is then dropped without being
    /// called. Otherwise `callback` is queued, `None` is returned, and the
    /// callback fires exactly once with the store computed at readiness.
    /// May be called before `init`.
    pub fn get_sets<F>(&self, callback: F) -> Option<Arc<FlattenedSets>>
    where
        F: FnOnce(Arc<FlattenedSets>) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.state == ReadinessState::Ready {
            if let Some(sets) = &inner.sets {
                return Some(Arc::clone(sets));
            }
        }
        inner.pending.push_back(Box::new(callback));
        None
    }

    /// Wait for the store.
    ///
    /// Fails with [`HandlerError::Reset`] if the handler is reset first.
    pub async fn wait_for_sets(&self) -> Result<Arc<FlattenedSets>, HandlerError> {
        let (tx, rx) = oneshot::channel();
        if let Some(sets) = self.get_sets(move |sets| {
            let _ = tx.send(sets);
        }) {
            return Ok(sets);
        }
        rx.await.map_err(|_| HandlerError::Reset)
    }

    /// Wait until this generation's diff was handed to the clearer and the
    /// new mapping was written (or the write was skipped or failed).
    ///
    /// Never completes if the handler is reset first.
    pub async fn wait_until_persisted(&self) {
        loop {
            let notified = self.persisted.notified();
            if self.inner.lock().persist_finished {
                return;
            }
            notified.await;
        }
    }

    /// Return to `NotInitialized`, dropping queued callbacks uninvoked.
    ///
    /// Background work started before the reset is discarded.
    pub fn reset_for_testing(&self) {
        let dropped = {
            let mut inner = self.inner.lock();
            let generation = inner.generation.wrapping_add(1);
            let old = std::mem::take(&mut *inner);
            inner.generation = generation;
            old
        };
        debug!(
            target: "first_party_sets::handler",
            dropped_callbacks = dropped.pending.len(),
            "reset"
        );
        drop(dropped);
    }

    /// Publish the combined store if every source is in.
    ///
    /// Returns the store and the callbacks to release; callers run them
    /// after dropping the lock.
    fn try_become_ready(&self, inner: &mut HandlerInner) -> Option<Released> {
        if inner.state != ReadinessState::Initializing {
            return None;
        }
        let public = inner.public_sets.as_ref()?;

        let sets = Arc::new(self.combine(public, inner.manual_set.as_ref()));
        inner.sets = Some(Arc::clone(&sets));
        inner.state = ReadinessState::Ready;

        let callbacks: Vec<SetsCallback> = inner.pending.drain(..).collect();
        info!(
            target: "first_party_sets::handler",
            site_count = sets.len(),
            fingerprint = %sets.fingerprint().unwrap_or_default(),
            queued_callbacks = callbacks.len(),
            "sets ready"
        );

        Some(Released { sets, callbacks })
    }

    fn combine(&self, public: &FlattenedSets, manual: Option<&SingleSet>) -> FlattenedSets {
        if !self.config.enabled {
            return FlattenedSets::new();
        }

        let mut combined = match manual {
            Some(manual) => public.apply_manual_set(manual),
            None => public.clone(),
        };

        if let Some(policy) = &self.config.policy {
            let customizations = compute_enterprise_customizations(&combined, policy);
            debug!(
                target: "first_party_sets::handler",
                customized_sites = customizations.len(),
                "applying enterprise policy"
            );
            combined = combined.apply_customizations(&customizations);
        }

        combined
    }

    async fn load_previous_sets(self: Arc<Self>, generation: u64, store: Option<Arc<dyn SetsStore>>) {
        let previous = match store {
            None => {
                debug!(target: "first_party_sets::handler", "no storage; empty baseline");
                FlattenedSets::new()
            }
            Some(store) => match store.load().await {
                Ok(Some(sets)) => sets,
                Ok(None) => FlattenedSets::new(),
                Err(e) => {
                    warn!(
                        target: "first_party_sets::handler",
                        error = %e,
                        "failed to load persisted sets; using empty baseline"
                    );
                    FlattenedSets::new()
                }
            },
        };

        let job = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            inner.previous_sets = Some(previous);
            inner.take_persist_job()
        };

        if let Some(job) = job {
            self.persist(job).await;
        }
    }

    async fn persist(&self, job: PersistJob) {
        if !self.is_generation(job.generation) {
            return;
        }

        let to_clear = compute_sets_diff(&job.previous, &job.current);
        info!(
            target: "first_party_sets::handler",
            previous_sites = job.previous.len(),
            current_sites = job.current.len(),
            sites_to_clear = to_clear.len(),
            "sets diff computed"
        );
        self.clearer.clear_sites(to_clear).await;

        if !self.is_generation(job.generation) {
            return;
        }
        match &job.store {
            None => debug!(target: "first_party_sets::handler", "no storage; not persisting"),
            Some(store) => match store.save(&job.current).await {
                Ok(()) => debug!(target: "first_party_sets::handler", "persisted sets written"),
                Err(e) => warn!(
                    target: "first_party_sets::handler",
                    error = %e,
                    "failed to persist sets"
                ),
            },
        }

        {
            let mut inner = self.inner.lock();
            if inner.generation != job.generation {
                return;
            }
            inner.persist_finished = true;
        }
        self.persisted.notify_waiters();
    }

    fn is_generation(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }
}

/// Store plus the callbacks waiting on it.
struct Released {
    sets: Arc<FlattenedSets>,
    callbacks: Vec<SetsCallback>,
}

fn release(released: Option<Released>) {
    if let Some(Released { sets, callbacks }) = released {
        for callback in callbacks {
            callback(Arc::clone(&sets));
        }
    }
}

fn manual_set_from_flag(flag_value: &str) -> Option<SingleSet> {
    match parse_manual_set_flag(flag_value) {
        Ok(set) => set,
        Err(e) => {
            warn!(
                target: "first_party_sets::handler",
                error = %e,
                flag = flag_value,
                "ignoring invalid override flag"
            );
            None
        }
    }
}
