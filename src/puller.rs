//! Puller (spec §4.3): fans in every source's stream, dedups concurrently
//! in-flight pulls, and dispatches each new image reference to the
//! configured `PullStrategy`. Grounded on original_source/puller/puller.go's
//! `ImagePuller` (`pendingImages`, `AddSource`'s per-source fan-in goroutine
//! logging `image`/`source`, the central `select` over inbound/success/error)
//! and on services/node-agent/src/actors/image.rs's `in_progress` map, whose
//! remove-on-complete pattern is what makes a failed pull eligible for retry
//! the next time its source re-emits the same reference (e.g. on resync).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{info, warn};

use crate::image_ref::ImageRef;
use crate::source::SourceHandle;
use crate::strategy::PullStrategy;

struct Received {
    source: String,
    image: ImageRef,
}

enum Outcome {
    Success { image: ImageRef },
    Error { image: ImageRef, error: anyhow::Error },
}

/// Fans in every registered source and dispatches new image references to
/// a `PullStrategy`, deduplicating images already in flight.
pub struct Puller<S> {
    strategy: Arc<S>,
    inbound_tx: mpsc::Sender<Received>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Received>>>,
    pending: Mutex<HashSet<ImageRef>>,
}

impl<S> Puller<S>
where
    S: PullStrategy + 'static,
{
    pub fn new(strategy: Arc<S>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(1);
        Self {
            strategy,
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Registers a source's output stream, spawning a fan-in task that
    /// forwards every reference it emits, with its source name attached for
    /// logging, into the puller's single inbound channel.
    pub fn add_source(&self, name: impl Into<String>, handle: SourceHandle) {
        let name = name.into();
        let mut stream = handle.stream;
        let inbound_tx = self.inbound_tx.clone();

        tokio::spawn(async move {
            while let Some(image) = stream.recv().await {
                info!(image = %image, source = %name, "received image reference");
                if inbound_tx
                    .send(Received {
                        source: name.clone(),
                        image,
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    /// Runs the central loop until `shutdown` fires. Must be called exactly
    /// once.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut inbound = match self.inbound_rx.lock().await.take() {
            Some(rx) => rx,
            None => return,
        };

        let (outcome_tx, mut outcome_rx) = mpsc::channel::<Outcome>(64);

        loop {
            tokio::select! {
                received = inbound.recv() => {
                    if let Some(received) = received {
                        self.dispatch(received, outcome_tx.clone()).await;
                    }
                }
                outcome = outcome_rx.recv() => {
                    if let Some(outcome) = outcome {
                        self.complete(outcome).await;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn dispatch(&self, received: Received, outcome_tx: mpsc::Sender<Outcome>) {
        let Received { source, image } = received;

        {
            let mut pending = self.pending.lock().await;
            if !pending.insert(image.clone()) {
                info!(image = %image, source = %source, "image already in flight, skipping");
                return;
            }
        }

        info!(image = %image, source = %source, "dispatching pull");

        let strategy = self.strategy.clone();
        let pull_image = image.clone();
        tokio::spawn(async move {
            let outcome = match strategy.pull_image(pull_image.clone()).await {
                Ok(()) => Outcome::Success { image: pull_image },
                Err(error) => Outcome::Error {
                    image: pull_image,
                    error,
                },
            };
            let _ = outcome_tx.send(outcome).await;
        });
    }

    async fn complete(&self, outcome: Outcome) {
        match outcome {
            Outcome::Success { image } => {
                info!(image = %image, "pull succeeded");
                self.pending.lock().await.remove(&image);
            }
            Outcome::Error { image, error } => {
                warn!(image = %image, error = %error, "pull failed, eligible for retry on next resync");
                self.pending.lock().await.remove(&image);
            }
        }
    }
}
