//! End-to-end runs of the scatter/assemble protocol against an in-process
//! cluster.

use chrono::Duration as ChronoDuration;
use chrono::Utc;
use std::time::Duration;

use scatter::errors::{AssembleError, ConsistencyError, KeyError, ScatterError};
use scatter::keys::KeyManager;
use scatter::models::address::WorkerAddress;
use scatter::models::report::{SendFailure, WorkerHealth};
use scatter::pipeline::{
    assemble_payload, check_workers, fetch_public_key, scatter_payload, AssembleOptions,
};
use scatter::worker::local::LocalCluster;

const PASSWORD: &str = "supersecretpassword";

struct Setup {
    _key_dir: tempfile::TempDir,
    keys: KeyManager,
    recipient: rsa::RsaPublicKey,
    workers: Vec<WorkerAddress>,
    cluster: LocalCluster,
}

fn setup(worker_count: usize) -> Setup {
    let key_dir = tempfile::tempdir().unwrap();
    let keys = KeyManager::new(key_dir.path(), "assemble_key");
    let recipient = keys.generate(PASSWORD).unwrap().public_key;
    let workers: Vec<WorkerAddress> = (0..worker_count)
        .map(|i| WorkerAddress::from(format!("worker-{}", i)))
        .collect();
    let cluster = LocalCluster::new(&workers);
    Setup {
        _key_dir: key_dir,
        keys,
        recipient,
        workers,
        cluster,
    }
}

fn options() -> AssembleOptions {
    AssembleOptions {
        tolerance: ChronoDuration::seconds(5),
        min_fragments: None,
        call_timeout: Duration::from_secs(1),
        deadline: Duration::from_secs(10),
    }
}

#[tokio::test]
async fn payload_round_trips_through_the_cluster() {
    let s = setup(3);
    let payload = b"Sifrele beni";

    let record = scatter_payload(
        &s.cluster,
        &s.keys,
        &s.recipient,
        payload,
        &s.workers,
        Duration::from_secs(1),
    )
    .await
    .unwrap();
    assert_eq!(record.report.sent_count(), 3);

    let recovered = assemble_payload(
        &s.cluster,
        &s.keys,
        PASSWORD,
        &s.workers,
        &record.sealed_order,
        &options(),
    )
    .await
    .unwrap();
    assert_eq!(recovered, payload);
}

#[tokio::test]
async fn round_trips_across_worker_counts() {
    // 80 workers push the order metadata past one OAEP block
    for n in [1, 2, 5, 11, 80] {
        let s = setup(n);
        let payload = b"fragment me into many small pieces";
        let record = scatter_payload(
            &s.cluster,
            &s.keys,
            &s.recipient,
            payload,
            &s.workers,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        let recovered = assemble_payload(
            &s.cluster,
            &s.keys,
            PASSWORD,
            &s.workers,
            &record.sealed_order,
            &options(),
        )
        .await
        .unwrap();
        assert_eq!(recovered, payload, "round trip failed for {} workers", n);
    }
}

#[tokio::test]
async fn a_missing_fragment_blocks_assembly() {
    let s = setup(3);
    let record = scatter_payload(
        &s.cluster,
        &s.keys,
        &s.recipient,
        b"do not lose me",
        &s.workers,
        Duration::from_secs(1),
    )
    .await
    .unwrap();

    s.cluster.take_down(&s.workers[2]);
    let result = assemble_payload(
        &s.cluster,
        &s.keys,
        PASSWORD,
        &s.workers,
        &record.sealed_order,
        &options(),
    )
    .await;
    assert!(matches!(
        result,
        Err(AssembleError::Consistency(
            ConsistencyError::InsufficientFragments {
                expected: 3,
                collected: 2
            }
        ))
    ));
}

#[tokio::test]
async fn a_stale_fragment_trips_the_consistency_gate() {
    let s = setup(3);
    let record = scatter_payload(
        &s.cluster,
        &s.keys,
        &s.recipient,
        b"all fragments must agree",
        &s.workers,
        Duration::from_secs(1),
    )
    .await
    .unwrap();

    // one worker is serving a record from fifty seconds in the past
    s.cluster
        .tamper_submission_time(&s.workers[1], Utc::now() - ChronoDuration::seconds(50));

    let result = assemble_payload(
        &s.cluster,
        &s.keys,
        PASSWORD,
        &s.workers,
        &record.sealed_order,
        &options(),
    )
    .await;
    match result {
        Err(AssembleError::Consistency(ConsistencyError::Outlier { worker, .. })) => {
            assert_eq!(worker, s.workers[1]);
        }
        other => panic!("expected an outlier failure, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn the_wrong_password_never_yields_plaintext() {
    let s = setup(3);
    let record = scatter_payload(
        &s.cluster,
        &s.keys,
        &s.recipient,
        b"password protected",
        &s.workers,
        Duration::from_secs(1),
    )
    .await
    .unwrap();

    let result = assemble_payload(
        &s.cluster,
        &s.keys,
        "not the password",
        &s.workers,
        &record.sealed_order,
        &options(),
    )
    .await;
    assert!(matches!(
        result,
        Err(AssembleError::Key(KeyError::WrongPassword { .. }))
    ));
}

#[tokio::test]
async fn oversized_payloads_are_rejected_up_front() {
    let s = setup(3);
    let too_big = vec![0u8; 191]; // over the 2048-bit OAEP bound
    let result = scatter_payload(
        &s.cluster,
        &s.keys,
        &s.recipient,
        &too_big,
        &s.workers,
        Duration::from_secs(1),
    )
    .await;
    assert!(matches!(
        result,
        Err(ScatterError::Key(KeyError::PayloadTooLarge { .. }))
    ));
}

#[tokio::test]
async fn partial_distribution_is_reported_not_fatal() {
    let s = setup(3);
    s.cluster.take_down(&s.workers[0]);
    let record = scatter_payload(
        &s.cluster,
        &s.keys,
        &s.recipient,
        b"best effort",
        &s.workers,
        Duration::from_secs(1),
    )
    .await
    .unwrap();
    assert_eq!(record.report.sent_count(), 2);
    assert_eq!(record.report.failures().count(), 1);
}

#[tokio::test]
async fn an_unreasonable_deadline_times_out() {
    let s = setup(2);
    let record = scatter_payload(
        &s.cluster,
        &s.keys,
        &s.recipient,
        b"hurry up",
        &s.workers,
        Duration::from_secs(1),
    )
    .await
    .unwrap();

    // workers answer, but far too slowly for the caller's deadline
    s.cluster.inject_latency(Duration::from_millis(500));
    let opts = AssembleOptions {
        deadline: Duration::from_millis(50),
        ..options()
    };
    let result = assemble_payload(
        &s.cluster,
        &s.keys,
        PASSWORD,
        &s.workers,
        &record.sealed_order,
        &opts,
    )
    .await;
    assert!(matches!(result, Err(AssembleError::DeadlineExceeded { .. })));
}

#[tokio::test]
async fn slow_workers_hit_the_per_call_timeout() {
    let s = setup(3);
    let record = scatter_payload(
        &s.cluster,
        &s.keys,
        &s.recipient,
        b"answer faster",
        &s.workers,
        Duration::from_secs(1),
    )
    .await
    .unwrap();

    // workers answer, but slower than any single call is allowed to take
    s.cluster.inject_latency(Duration::from_millis(200));

    let slow = scatter_payload(
        &s.cluster,
        &s.keys,
        &s.recipient,
        b"answer faster",
        &s.workers,
        Duration::from_millis(50),
    )
    .await
    .unwrap();
    assert_eq!(slow.report.sent_count(), 0);
    assert!(slow
        .report
        .failures()
        .all(|(_, f)| matches!(f, SendFailure::Unreachable(_))));

    // collection omits every slow worker, so the gate reports the shortfall
    let opts = AssembleOptions {
        call_timeout: Duration::from_millis(50),
        ..options()
    };
    let result = assemble_payload(
        &s.cluster,
        &s.keys,
        PASSWORD,
        &s.workers,
        &record.sealed_order,
        &opts,
    )
    .await;
    assert!(matches!(
        result,
        Err(AssembleError::Consistency(
            ConsistencyError::InsufficientFragments {
                expected: 3,
                collected: 0
            }
        ))
    ));
}

#[tokio::test]
async fn health_check_reports_each_worker() {
    let s = setup(3);
    s.cluster.take_down(&s.workers[1]);
    let report = check_workers(&s.cluster, &s.workers, Duration::from_secs(1)).await;
    assert_eq!(report[&s.workers[0]], WorkerHealth::Healthy);
    assert!(matches!(report[&s.workers[1]], WorkerHealth::Unhealthy(_)));
    assert_eq!(report[&s.workers[2]], WorkerHealth::Healthy);
}

#[tokio::test]
async fn public_key_exchange_round_trips() {
    let s = setup(1);
    s.cluster
        .serve_public_key(s.keys.public_key_pem().unwrap());
    let fetched = fetch_public_key(&s.cluster, &s.workers[0], Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(fetched, s.recipient);
}

#[tokio::test]
async fn an_unpublished_key_is_not_found() {
    let s = setup(1);
    let result = fetch_public_key(&s.cluster, &s.workers[0], Duration::from_secs(1)).await;
    assert!(result.is_err());
}
