use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{info, warn};
use std::time::Duration;

use crate::errors::DistributionError;
use crate::models::address::WorkerAddress;
use crate::models::fragment::Fragment;
use crate::models::report::{DeliveryReport, DeliveryStatus, SendFailure};
use crate::models::wire::FragmentRecord;
use crate::worker::{WorkerClient, WorkerError};

// keep fan-out latency bounded by the slowest worker, not the sum of all
pub(crate) const MAX_IN_FLIGHT: usize = 8;

/// Fans fragments out to the worker list, the `k`-th fragment to the `k`-th
/// address, every send stamped with the same `submitted_at`. Each send is
/// independent; failures are recorded per worker and never abort the rest.
/// Retry policy, if any, belongs to the caller.
pub async fn distribute<C: WorkerClient + ?Sized>(
    client: &C,
    fragments: &[Fragment],
    workers: &[WorkerAddress],
    submitted_at: DateTime<Utc>,
    call_timeout: Duration,
) -> Result<DeliveryReport, DistributionError> {
    if fragments.len() > workers.len() {
        return Err(DistributionError::InsufficientWorkers {
            fragments: fragments.len(),
            workers: workers.len(),
        });
    }

    let outcomes: Vec<(WorkerAddress, DeliveryStatus)> =
        stream::iter(fragments.iter().zip(workers.iter()))
            .map(|(fragment, addr)| async move {
                let record = FragmentRecord::from_fragment(fragment, submitted_at);
                let status = match tokio::time::timeout(call_timeout, client.submit(addr, record))
                    .await
                {
                    Err(_) => DeliveryStatus::Failed(SendFailure::Unreachable(format!(
                        "no response within {:?}",
                        call_timeout
                    ))),
                    Ok(Err(WorkerError::Rejected(status))) => {
                        DeliveryStatus::Failed(SendFailure::Rejected(status))
                    }
                    Ok(Err(e)) => DeliveryStatus::Failed(SendFailure::Unreachable(e.to_string())),
                    Ok(Ok(())) => DeliveryStatus::Sent,
                };
                (addr.clone(), status)
            })
            .buffer_unordered(MAX_IN_FLIGHT)
            .collect()
            .await;

    let mut report = DeliveryReport::default();
    for (addr, status) in outcomes {
        if let DeliveryStatus::Failed(reason) = &status {
            warn!("send to {} failed: {}", addr, reason);
        }
        report.record(addr, status);
    }
    info!(
        "distributed {}/{} fragments",
        report.sent_count(),
        fragments.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::local::LocalCluster;

    fn addresses(n: usize) -> Vec<WorkerAddress> {
        (0..n).map(|i| WorkerAddress::from(format!("w{}", i))).collect()
    }

    fn fragments(n: usize) -> Vec<Fragment> {
        (0..n).map(|i| Fragment::new(i, vec![i as u8; 4])).collect()
    }

    #[tokio::test]
    async fn every_worker_gets_its_fragment() {
        let workers = addresses(3);
        let cluster = LocalCluster::new(&workers);
        let report = distribute(
            &cluster,
            &fragments(3),
            &workers,
            Utc::now(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(report.sent_count(), 3);
        for (k, addr) in workers.iter().enumerate() {
            let stored = cluster.retrieve(addr).await.unwrap();
            assert_eq!(stored.original_index, k);
        }
    }

    #[tokio::test]
    async fn one_down_worker_does_not_abort_the_rest() {
        let workers = addresses(3);
        let cluster = LocalCluster::new(&workers);
        cluster.take_down(&workers[1]);

        let report = distribute(
            &cluster,
            &fragments(3),
            &workers,
            Utc::now(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(report.sent_count(), 2);
        let failed: Vec<&WorkerAddress> = report.failures().map(|(w, _)| w).collect();
        assert_eq!(failed, vec![&workers[1]]);
    }

    #[tokio::test]
    async fn too_few_workers_is_fatal() {
        let workers = addresses(2);
        let cluster = LocalCluster::new(&workers);
        let result = distribute(
            &cluster,
            &fragments(3),
            &workers,
            Utc::now(),
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(
            result,
            Err(DistributionError::InsufficientWorkers {
                fragments: 3,
                workers: 2
            })
        ));
    }
}
