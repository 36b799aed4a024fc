//! image-cache-daemon: a per-node daemon that pre-fetches container images
//! onto the node it runs on, discovering image references from declarative
//! sources and dispatching a deduplicated pull for each one.
//!
//! ```text
//!                    ┌─────────────┐
//!                    │   sources   │  (static, config-object, workload-template×3)
//!                    └──────┬──────┘
//!                           │ ImageRef stream, one channel per source
//!                    ┌──────▼──────┐
//!                    │   puller    │  fan-in + pending-set dedup
//!                    └──────┬──────┘
//!                           │ PullStrategy::pull_image
//!                    ┌──────▼──────┐
//!                    │  strategy   │  creates + monitors a side-effect workload
//!                    └─────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod extractor;
pub mod image_ref;
pub mod puller;
pub mod source;
pub mod strategy;
