use futures::stream::{self, StreamExt};
use log::{info, warn};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::distributor::MAX_IN_FLIGHT;
use crate::models::address::WorkerAddress;
use crate::models::fragment::CollectedFragment;
use crate::worker::WorkerClient;

/// Collected fragments keyed by `original_index`. A `BTreeMap` so that
/// iteration is already in ascending original order.
pub type CollectedSet = BTreeMap<usize, CollectedFragment>;

/// Queries every worker for its stored fragment. Unreachable workers, empty
/// vaults, and malformed records are logged and omitted; the caller decides
/// whether the resulting partial set is enough.
///
/// `original_index` comes from the stored record itself, never from list
/// position, since workers answer in no guaranteed order.
pub async fn collect<C: WorkerClient + ?Sized>(
    client: &C,
    workers: &[WorkerAddress],
    call_timeout: Duration,
) -> CollectedSet {
    let responses: Vec<Option<(usize, CollectedFragment)>> = stream::iter(workers.iter())
        .map(|addr| async move {
            let record = match tokio::time::timeout(call_timeout, client.retrieve(addr)).await {
                Err(_) => {
                    warn!("{}: no response within {:?}", addr, call_timeout);
                    return None;
                }
                Ok(Err(e)) => {
                    warn!("{}: {}", addr, e);
                    return None;
                }
                Ok(Ok(record)) => record,
            };
            let data = match record.decode_data() {
                Ok(data) => data,
                Err(e) => {
                    warn!("{}: undecodable fragment data: {}", addr, e);
                    return None;
                }
            };
            Some((
                record.original_index,
                CollectedFragment {
                    worker: addr.clone(),
                    data,
                    stored_at: record.submission_time,
                },
            ))
        })
        .buffer_unordered(MAX_IN_FLIGHT)
        .collect()
        .await;

    let mut collected = CollectedSet::new();
    for (index, fragment) in responses.into_iter().flatten() {
        if let Some(prior) = collected.insert(index, fragment) {
            warn!(
                "duplicate fragment for index {} (earlier copy from {})",
                index, prior.worker
            );
        }
    }
    info!("collected {}/{} fragments", collected.len(), workers.len());
    collected
}
