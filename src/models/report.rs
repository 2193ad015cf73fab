use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::address::WorkerAddress;

/// Why a single send did not land. Recorded per worker; never fatal to the
/// fan-out as a whole.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    Unreachable(String),
    Rejected(u16),
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SendFailure::Unreachable(reason) => write!(f, "unreachable: {}", reason),
            SendFailure::Rejected(status) => write!(f, "rejected with status {}", status),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed(SendFailure),
}

/// Per-worker outcome of one distribution fan-out.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct DeliveryReport {
    pub outcomes: BTreeMap<WorkerAddress, DeliveryStatus>,
}

impl DeliveryReport {
    pub fn record(&mut self, worker: WorkerAddress, status: DeliveryStatus) {
        self.outcomes.insert(worker, status);
    }

    pub fn sent_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|s| matches!(s, DeliveryStatus::Sent))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&WorkerAddress, &SendFailure)> {
        self.outcomes.iter().filter_map(|(w, s)| match s {
            DeliveryStatus::Failed(reason) => Some((w, reason)),
            DeliveryStatus::Sent => None,
        })
    }
}

/// Result of probing one worker's health endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerHealth {
    Healthy,
    Unhealthy(String),
}
