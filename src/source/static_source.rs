//! Static source (spec §4.2.1): a fixed list, optionally republished on a
//! period. Grounded on original_source/source/static.go.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::{Source, SourceHandle};
use crate::image_ref::ImageRef;

struct StaticSource {
    images: Vec<ImageRef>,
    resync_period: Duration,
    sender: Mutex<Option<mpsc::Sender<ImageRef>>>,
}

#[async_trait]
impl Source for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn snapshot(&self) -> HashSet<ImageRef> {
        self.images.iter().cloned().collect()
    }

    fn has_synced(&self) -> bool {
        // The list is fully known at construction time; there is no remote
        // catalog whose initial list must complete first.
        true
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let tx = match self.sender.lock().unwrap().take() {
            Some(tx) => tx,
            None => return,
        };

        loop {
            for image in &self.images {
                tokio::select! {
                    result = tx.send(image.clone()) => {
                        if result.is_err() {
                            return;
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            return;
                        }
                    }
                }
            }

            if self.resync_period.is_zero() {
                debug!(source = self.name(), "static source exhausted, no resync period set");
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.resync_period) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }
}

/// Build a static source over `images`, republished every `resync_period`
/// (zero disables republishing; the stream closes after the first pass).
///
/// Republishing does not deduplicate across passes — the same references
/// are re-emitted each cycle, which the puller deduplicates against its
/// pending set.
pub fn static_source(images: Vec<ImageRef>, resync_period: Duration) -> SourceHandle {
    let (tx, rx) = mpsc::channel(1);

    let source = Arc::new(StaticSource {
        images,
        resync_period,
        sender: Mutex::new(Some(tx)),
    });

    SourceHandle { source, stream: rx }
}
