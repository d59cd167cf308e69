//! Building blocks shared by the in-memory collaborators
//!
//! The in-memory stores back the job in tests and dry runs. They can share one
//! [`CallRecorder`] so the order of calls across stores can be asserted, and each
//! carries a [`FaultPlan`] for injecting failures into named operations.

use crate::adapters::archive::ZipArchiver;
use crate::adapters::discovery::MemoryDiscoveryStore;
use crate::adapters::documents::MemoryDocumentStore;
use crate::adapters::factory::Collaborators;
use crate::adapters::graph::MemoryGraphStore;
use crate::adapters::identity::MemoryIdentity;
use crate::adapters::object_store::MemoryObjectStore;
use crate::adapters::search::MemorySearchIndex;
use crate::domain::{ActorProfile, EtlError, Result, StoreError, StoreKind};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Ordered record of collaborator calls, e.g. `graph.upload aced-Alzheimers`
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallRecorder {
    /// Creates an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call
    pub async fn record(&self, call: impl Into<String>) {
        self.calls.lock().await.push(call.into());
    }

    /// Calls in order
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Calls whose name starts with `prefix`
    pub async fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Whether nothing was called
    pub async fn is_empty(&self) -> bool {
        self.calls.lock().await.is_empty()
    }
}

/// Operations that should fail, by name (`upload`, `load`, `delete`, ...)
#[derive(Debug, Default)]
pub struct FaultPlan {
    failing: Mutex<HashSet<String>>,
}

impl FaultPlan {
    /// Makes `operation` fail until healed
    pub async fn fail(&self, operation: impl Into<String>) {
        self.failing.lock().await.insert(operation.into());
    }

    /// Makes `operation` succeed again
    pub async fn heal(&self, operation: &str) {
        self.failing.lock().await.remove(operation);
    }

    /// Fails with a write error if `operation` is planned to fail
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteFailed`] for a planned failure.
    pub async fn check(&self, store: StoreKind, operation: &str) -> Result<()> {
        if self.failing.lock().await.contains(operation) {
            return Err(EtlError::Store(StoreError::write(
                store,
                format!("injected failure in {operation}"),
            )));
        }
        Ok(())
    }
}

/// In-memory collaborators sharing one recorder, with typed handles for setup
/// and assertions
pub struct MemoryStores {
    pub recorder: CallRecorder,
    pub identity: Arc<MemoryIdentity>,
    pub object_store: Arc<MemoryObjectStore>,
    pub graph: Arc<MemoryGraphStore>,
    pub search: Arc<MemorySearchIndex>,
    pub documents: Arc<MemoryDocumentStore>,
    pub discovery: Arc<MemoryDiscoveryStore>,
}

impl MemoryStores {
    /// Empty stores; the identity provider resolves every token to `profile`
    pub fn new(profile: ActorProfile) -> Self {
        Self::with_identity(MemoryIdentity::new(profile))
    }

    /// Empty stores; the identity provider rejects every token
    pub fn rejecting_identity() -> Self {
        Self::with_identity(MemoryIdentity::rejecting())
    }

    fn with_identity(identity: MemoryIdentity) -> Self {
        let recorder = CallRecorder::new();
        Self {
            identity: Arc::new(identity.with_recorder(recorder.clone())),
            object_store: Arc::new(MemoryObjectStore::new().with_recorder(recorder.clone())),
            graph: Arc::new(MemoryGraphStore::new().with_recorder(recorder.clone())),
            search: Arc::new(MemorySearchIndex::new().with_recorder(recorder.clone())),
            documents: Arc::new(MemoryDocumentStore::new().with_recorder(recorder.clone())),
            discovery: Arc::new(MemoryDiscoveryStore::new().with_recorder(recorder.clone())),
            recorder,
        }
    }

    /// Collaborator bundle over these stores, with the zip archiver
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            identity: self.identity.clone(),
            object_store: self.object_store.clone(),
            graph: self.graph.clone(),
            search: self.search.clone(),
            documents: self.documents.clone(),
            discovery: self.discovery.clone(),
            archiver: Arc::new(ZipArchiver::new()),
        }
    }

    /// Store calls recorded so far, identity lookups excluded
    pub async fn store_calls(&self) -> Vec<String> {
        self.recorder
            .calls()
            .await
            .into_iter()
            .filter(|call| !call.starts_with("identity."))
            .collect()
    }
}
