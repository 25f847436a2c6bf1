//! DocChat index library
//!
//! Holds the chunk vectors of the most recently uploaded document and
//! answers nearest-neighbor queries by cosine similarity. The index is
//! an immutable snapshot published through [`IndexHandle`]: builds
//! happen off to the side and become visible in a single pointer swap,
//! so readers always see either the fully-old or the fully-new index.

pub mod snapshot;

pub use snapshot::{IndexError, IndexSnapshot, ScoredChunk};

use std::sync::{Arc, RwLock};
use tracing::info;

/// Process-wide slot for the current index snapshot.
///
/// Lifecycle: empty until the first successful build, then replaced
/// wholesale on every later build. The lock guards only the pointer
/// read or swap; readers clone the `Arc` and keep querying their
/// snapshot even while a rebuild publishes a new one.
#[derive(Default)]
pub struct IndexHandle {
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a fully built snapshot, replacing any previous one.
    /// Last writer wins when two builds race.
    pub fn publish(&self, snapshot: IndexSnapshot) {
        let snapshot = Arc::new(snapshot);
        info!(
            generation = %snapshot.id(),
            chunks = snapshot.len(),
            model = snapshot.model(),
            "Publishing index snapshot"
        );
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(snapshot);
    }

    /// The current snapshot, if one has been built.
    pub fn current(&self) -> Option<Arc<IndexSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_built(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}
