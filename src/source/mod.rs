//! Sources (spec §4.2): pluggable producers of a live, change-driven stream
//! of image references.

mod config_object;
mod static_source;
mod watch;
mod workload_template;

pub use config_object::{config_object_source, ConfigObject, LabelSelector};
pub use static_source::static_source;
pub use watch::watch_source;
pub use workload_template::workload_template_source;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch as watch_channel};

use crate::image_ref::ImageRef;

/// Common contract every source implements (spec §4.2).
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable label for logging.
    fn name(&self) -> &str;

    /// The current deduplicated view. May be empty before initial sync.
    fn snapshot(&self) -> HashSet<ImageRef>;

    /// True once the backing cache has completed its initial list.
    fn has_synced(&self) -> bool;

    /// Runs until `shutdown` fires, then closes the output stream by
    /// dropping its sender half. Not restartable.
    async fn run(&self, shutdown: watch_channel::Receiver<bool>);
}

/// A constructed source paired with the receiving half of its (unbuffered,
/// rendezvous) output channel. The stream is handed off exactly once, at
/// construction time, since sources are "not restartable" (spec §4.2).
pub struct SourceHandle {
    pub source: Arc<dyn Source>,
    pub stream: mpsc::Receiver<ImageRef>,
}
