//! The generic watch-driven source (spec §4.2): tracks a `Catalog<T>`,
//! re-runs the extractor per changed object, and emits only brand-new image
//! references downstream. Grounded on original_source/source/argo_shared.go's
//! `ArgoTemplateSource` (`imageMap` dedup set + `updateImagesFromInformer`
//! rescan-on-shrink-or-delete) generalized over any object type and
//! extractor, since `config_object_source` and `workload_template_source`
//! are both instances of the same shape.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use super::{Source, SourceHandle};
use crate::catalog::{Catalog, CatalogEvent};
use crate::image_ref::ImageRef;

type ExtractFn<T> = dyn Fn(&T) -> Result<HashSet<ImageRef>, String> + Send + Sync;

struct WatchSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    name: String,
    catalog: Arc<dyn Catalog<T>>,
    extract: Arc<ExtractFn<T>>,
    image_index: Mutex<HashMap<String, HashSet<ImageRef>>>,
    aggregate: Mutex<HashSet<ImageRef>>,
    sender: Mutex<Option<mpsc::Sender<ImageRef>>>,
}

impl<T> WatchSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Rebuilds the index and aggregate from a fresh `catalog.list()`, per
    /// an object removed or an object's image set shrinking (spec §4.2,
    /// "resync"). Never emits: shrinkage and deletion are not observable
    /// downstream, only through `snapshot()`.
    fn rescan(&self) {
        let mut index = self.image_index.lock().unwrap();
        let previous = std::mem::take(&mut *index);

        let mut next_index = HashMap::new();
        for (key, object) in self.catalog.list() {
            match (self.extract)(&object) {
                Ok(images) => {
                    next_index.insert(key, images);
                }
                Err(err) => {
                    if let Some(last_known_good) = previous.get(&key) {
                        warn!(
                            source = %self.name,
                            object = %key,
                            error = %err,
                            "rescan: re-extraction failed, keeping last known good image set",
                        );
                        next_index.insert(key.clone(), last_known_good.clone());
                    } else {
                        warn!(
                            source = %self.name,
                            object = %key,
                            error = %err,
                            "rescan: re-extraction failed and no prior image set to fall back on, dropping",
                        );
                    }
                }
            }
        }

        let mut aggregate = HashSet::new();
        for images in next_index.values() {
            aggregate.extend(images.iter().cloned());
        }

        *index = next_index;
        *self.aggregate.lock().unwrap() = aggregate;
    }

    async fn handle_added(&self, key: String, object: T, tx: &mpsc::Sender<ImageRef>) -> bool {
        match (self.extract)(&object) {
            Ok(images) => {
                self.image_index.lock().unwrap().insert(key, images.clone());
                self.emit_new(images, tx).await
            }
            Err(err) => {
                warn!(source = %self.name, error = %err, "failed to extract images from added object, skipping");
                true
            }
        }
    }

    async fn handle_modified(&self, key: String, _old: T, new: T, tx: &mpsc::Sender<ImageRef>) -> bool {
        match (self.extract)(&new) {
            Ok(new_images) => {
                let previous_for_key = self.image_index.lock().unwrap().get(&key).cloned();
                self.image_index.lock().unwrap().insert(key, new_images.clone());

                if !self.emit_new(new_images.clone(), tx).await {
                    return false;
                }

                let shrank = match &previous_for_key {
                    Some(previous) => !previous.is_subset(&new_images),
                    None => false,
                };
                if shrank {
                    self.rescan();
                }
                true
            }
            Err(err) => {
                // A bad update is a complete no-op: the object's previously
                // indexed image set, and therefore the aggregate, is left
                // untouched.
                warn!(source = %self.name, error = %err, "failed to extract images from modified object, retaining prior image set");
                true
            }
        }
    }

    async fn emit_new(&self, images: HashSet<ImageRef>, tx: &mpsc::Sender<ImageRef>) -> bool {
        let mut aggregate = self.aggregate.lock().unwrap();
        let brand_new: Vec<ImageRef> = images
            .into_iter()
            .filter(|image| aggregate.insert(image.clone()))
            .collect();
        drop(aggregate);

        for image in brand_new {
            if tx.send(image).await.is_err() {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl<T> Source for WatchSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> HashSet<ImageRef> {
        self.aggregate.lock().unwrap().clone()
    }

    fn has_synced(&self) -> bool {
        self.catalog.has_synced()
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let tx = match self.sender.lock().unwrap().take() {
            Some(tx) => tx,
            None => return,
        };

        let (events_tx, mut events_rx) = mpsc::channel(64);
        let catalog = self.catalog.clone();
        let catalog_shutdown = shutdown.clone();
        let catalog_task = tokio::spawn(async move { catalog.run(events_tx, catalog_shutdown).await });

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    let event = match event {
                        Some(event) => event,
                        None => break,
                    };

                    let keep_going = match event {
                        CatalogEvent::Added { key, object } => self.handle_added(key, object, &tx).await,
                        CatalogEvent::Modified { key, old, new } => self.handle_modified(key, old, new, &tx).await,
                        CatalogEvent::Deleted { key } => {
                            self.image_index.lock().unwrap().remove(&key);
                            self.rescan();
                            true
                        }
                    };

                    if !keep_going {
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!(source = %self.name, "watch source stopping");
        let _ = catalog_task.await;
    }
}

/// Build a generic watch source over `catalog`, using `extract` to turn
/// each observed object into its image set.
pub fn watch_source<T, F>(name: impl Into<String>, catalog: Arc<dyn Catalog<T>>, extract: F) -> SourceHandle
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T) -> Result<HashSet<ImageRef>, String> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    let source = Arc::new(WatchSource {
        name: name.into(),
        catalog,
        extract: Arc::new(extract),
        image_index: Mutex::new(HashMap::new()),
        aggregate: Mutex::new(HashSet::new()),
        sender: Mutex::new(Some(tx)),
    });

    SourceHandle { source, stream: rx }
}
