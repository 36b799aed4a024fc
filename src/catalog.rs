//! The external-collaborator boundary for watch-based sources (spec §1, §4.2).
//!
//! `Catalog<T>` stands in for "the indexed local store of the remote
//! catalog" — in production this would be a `SharedIndexInformer` backed by
//! a real Kubernetes/Argo client (per spec §1, those concrete client
//! libraries are external and out of scope here). The shape is grounded on
//! original_source/source/argo_shared.go's use of `cache.SharedIndexInformer`
//! (list + watch + an indexer usable for a full rescan) and on
//! `kube::runtime::watcher::Event` (`examples/other_examples/.../watcher.rs.rs`),
//! whose three-way `Applied` / `Deleted` / `Restarted` split is exactly the
//! add/update/delete/resync shape spec §4.2 calls for.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

/// One change observed on a catalog's backing store.
#[derive(Debug, Clone)]
pub enum CatalogEvent<T> {
    /// A new object was observed.
    Added { key: String, object: T },
    /// An existing object changed.
    Modified { key: String, old: T, new: T },
    /// An object was removed.
    Deleted { key: String },
}

/// An indexed, change-notifying mirror of a remote declarative store.
///
/// Exactly one `run` call is expected per catalog instance, matching a
/// `SharedIndexInformer`'s single-use `Run(stopCh)`.
#[async_trait]
pub trait Catalog<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs the list-and-watch loop, sending one event per observed change
    /// until `shutdown` fires. Must close `events` (by dropping the sender)
    /// on return.
    async fn run(&self, events: mpsc::Sender<CatalogEvent<T>>, shutdown: watch::Receiver<bool>);

    /// A full point-in-time snapshot of currently indexed `(key, object)`
    /// pairs — the equivalent of walking a `SharedIndexInformer`'s indexer.
    fn list(&self) -> Vec<(String, T)>;

    /// True once the initial list has completed.
    fn has_synced(&self) -> bool;
}
