use thiserror::Error;

use super::KeyError;
use crate::models::address::WorkerAddress;

/// Failures while splitting a ciphertext into fragments.
#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("cannot split into zero fragments")]
    NoWorkers,

    /// More fragments than ciphertext bytes would force zero-length
    /// fragments; that is a caller-configuration mistake, not a degenerate
    /// split we silently accept.
    #[error("{parts} fragments requested for a {len}-byte ciphertext")]
    TooManyParts { parts: usize, len: usize },

    #[error("failed to seal the order metadata: {0}")]
    Seal(#[from] KeyError),
}

/// Failures fatal to an entire fan-out. Per-worker send failures are not
/// errors here; they land in the delivery report.
#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("{fragments} fragments but only {workers} worker addresses")]
    InsufficientWorkers { fragments: usize, workers: usize },
}

/// The consistency gate fails closed: one outlier condemns the whole set.
#[derive(Debug, Error)]
pub enum ConsistencyError {
    #[error("collected {collected} fragments, need {expected}")]
    InsufficientFragments { expected: usize, collected: usize },

    #[error("fragment from {worker} deviates {deviation_ms} ms from the median submission time")]
    Outlier {
        worker: WorkerAddress,
        deviation_ms: i64,
    },
}

/// Failures interpreting the decrypted order metadata against the collected
/// fragment set. Any of these indicates a protocol violation or tampering.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("order metadata is malformed: {reason}")]
    Malformed { reason: String },

    #[error("order metadata lists {order} positions but {collected} fragments were collected")]
    LengthMismatch { order: usize, collected: usize },

    #[error("no collected fragment carries original index {index}")]
    MissingFragment { index: usize },
}

/// Aggregate error for the encrypt-split-distribute sequence.
#[derive(Debug, Error)]
pub enum ScatterError {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Fragment(#[from] FragmentError),
    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

/// Aggregate error for the collect-validate-reassemble-decrypt sequence.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("assembly did not finish within {secs} s")]
    DeadlineExceeded { secs: u64 },
}
