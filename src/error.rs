//! Shared error taxonomy (spec §7).
//!
//! Per-object faults stay local to the object that produced them, per-source
//! faults stay within the source, per-pull faults flow to the puller, and
//! only unrecoverable startup / invariant faults terminate the process.

use thiserror::Error;

/// Errors from the template extractor (spec §4.1).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("malformed template: {0}")]
    MalformedTemplate(String),
}

/// Errors from decoding a configuration object's image list (spec §4.2.2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigDecodeError {
    #[error("key {key:?} not present in configuration object {namespace}/{name}")]
    MissingKey {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("failed to decode key {key:?} in configuration object {namespace}/{name}: {reason}")]
    Invalid {
        namespace: String,
        name: String,
        key: String,
        reason: String,
    },
}

/// Errors surfaced synchronously from `PullStrategy::pull_image` (spec §4.4, §4.5).
#[derive(Debug, Error)]
pub enum PullDispatchError {
    #[error("failed to create pull workload for {image}: {cause}")]
    WorkloadCreateFailed { image: String, cause: anyhow::Error },
}

/// Fatal invariant violations (spec §4.4, §4.5): the monitor observed a pull
/// workload terminate in a state that is neither success nor `ErrImagePull`.
#[derive(Debug, Error)]
#[error("pull workload {workload} for image {image} terminated in an impossible state: {detail}")]
pub struct InvariantViolation {
    pub workload: String,
    pub image: String,
    pub detail: String,
}
