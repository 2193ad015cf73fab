pub mod dir;
pub mod local;
pub mod vault;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::address::WorkerAddress;
use crate::models::wire::FragmentRecord;

/// A failed call against one worker. Absorbed at the distributor/collector
/// boundary into per-target status; never an operation-wide failure on its
/// own.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("rejected with status {0}")]
    Rejected(u16),
    #[error("no fragment stored")]
    Empty,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no public key available")]
    NoPublicKey,
}

/// Client side of the worker fragment-store contract. The real transport is
/// out of scope; anything that can shuttle `FragmentRecord`s by address
/// satisfies the protocol.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    /// Hand a fragment record to a worker, replacing whatever it stored
    /// before.
    async fn submit(&self, addr: &WorkerAddress, record: FragmentRecord)
        -> Result<(), WorkerError>;

    /// Fetch the worker's currently stored record.
    async fn retrieve(&self, addr: &WorkerAddress) -> Result<FragmentRecord, WorkerError>;

    /// Probe whether the worker is up.
    async fn health(&self, addr: &WorkerAddress) -> Result<(), WorkerError>;

    /// The worker's current public key, PEM encoded.
    async fn public_key(&self, addr: &WorkerAddress) -> Result<String, WorkerError>;
}
