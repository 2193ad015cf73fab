use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::WorkerAddress;

/// One contiguous byte range of the encrypted payload, bound for exactly one
/// worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub original_index: usize, // position of this range in the original ciphertext
    pub data: Vec<u8>,         // the range itself
}

impl Fragment {
    pub fn new(original_index: usize, data: Vec<u8>) -> Self {
        Fragment {
            original_index,
            data,
        }
    }
}

/// A fragment pulled back from a worker, together with the submission time
/// the worker stored alongside it. The timestamp is the moment distribution
/// happened, not the moment of collection.
#[derive(Debug, Clone)]
pub struct CollectedFragment {
    pub worker: WorkerAddress,
    pub data: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}
