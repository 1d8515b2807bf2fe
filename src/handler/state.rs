//! Readiness state owned by the handler.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::store::SetsStore;
use crate::types::{FlattenedSets, SingleSet};

/// Callback queued by `get_sets` until the store is ready.
pub type SetsCallback = Box<dyn FnOnce(Arc<FlattenedSets>) + Send + 'static>;

/// Lifecycle of the handler.
///
/// Moves forward only; `reset_for_testing` is the single way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    /// `init` has not been called.
    NotInitialized,
    /// Sources are loading.
    Initializing,
    /// The combined store is published.
    Ready,
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self::NotInitialized
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "not_initialized"),
            Self::Initializing => write!(f, "initializing"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Everything behind the handler's lock.
#[derive(Default)]
pub(crate) struct HandlerInner {
    pub state: ReadinessState,
    /// Bumped on reset so stale background work can tell it lost.
    pub generation: u64,
    /// Published store; `Some` exactly when `state == Ready`.
    pub sets: Option<Arc<FlattenedSets>>,
    /// Non-empty only while not ready.
    pub pending: VecDeque<SetsCallback>,
    pub public_sets: Option<FlattenedSets>,
    pub manual_set: Option<SingleSet>,
    /// Previous generation's mapping, once the load attempt finished.
    pub previous_sets: Option<FlattenedSets>,
    pub store: Option<Arc<dyn SetsStore>>,
    pub runtime: Option<tokio::runtime::Handle>,
    pub persist_started: bool,
    pub persist_finished: bool,
}

/// Work needed to diff, clear and persist one generation.
pub(crate) struct PersistJob {
    pub generation: u64,
    pub previous: FlattenedSets,
    pub current: Arc<FlattenedSets>,
    pub store: Option<Arc<dyn SetsStore>>,
}

impl HandlerInner {
    /// Take the persist job once both the previous and the current mapping
    /// are known. Returns `None` on every later call.
    pub fn take_persist_job(&mut self) -> Option<PersistJob> {
        if self.persist_started || self.state != ReadinessState::Ready {
            return None;
        }
        let current = self.sets.clone()?;
        let previous = self.previous_sets.take()?;

        self.persist_started = true;
        Some(PersistJob {
            generation: self.generation,
            previous,
            current,
            store: self.store.clone(),
        })
    }
}
