//! Site-data clearing collaborator.
//!
//! The handler computes which sites changed set membership since the last
//! run and hands them to a [`SiteDataClearer`]. Actually deleting cookies,
//! storage and caches is the embedder's job.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;

use crate::types::Site;

/// Receives the sites whose stored data must be cleared.
#[async_trait]
pub trait SiteDataClearer: Send + Sync {
    /// Clear stored data for `sites`. Called at most once per handler
    /// generation, before the new mapping is persisted.
    async fn clear_sites(&self, sites: BTreeSet<Site>);
}

/// Clearer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpClearer;

#[async_trait]
impl SiteDataClearer for NoOpClearer {
    async fn clear_sites(&self, sites: BTreeSet<Site>) {
        tracing::debug!(
            target: "first_party_sets::clearing",
            site_count = sites.len(),
            "no-op clearer dropping clear request"
        );
    }
}

/// In-memory clearer for testing.
#[derive(Debug, Default)]
pub struct RecordingClearer {
    /// Every clear request received, in order.
    pub requests: Mutex<Vec<BTreeSet<Site>>>,
}

impl RecordingClearer {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<BTreeSet<Site>> {
        self.requests.lock().clone()
    }

    /// Union of every site ever requested.
    pub fn cleared_sites(&self) -> BTreeSet<Site> {
        self.requests.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl SiteDataClearer for RecordingClearer {
    async fn clear_sites(&self, sites: BTreeSet<Site>) {
        self.requests.lock().push(sites);
    }
}
