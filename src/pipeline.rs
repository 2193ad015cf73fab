use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{info, warn};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::collector::collect;
use crate::consistency::validate;
use crate::distributor::{distribute, MAX_IN_FLIGHT};
use crate::errors::{AssembleError, ScatterError};
use crate::fragmenter::split;
use crate::keys::KeyManager;
use crate::models::address::WorkerAddress;
use crate::models::report::{DeliveryReport, WorkerHealth};
use crate::reassembler::reassemble;
use crate::worker::{WorkerClient, WorkerError};

/// Knobs for one assembly run. `min_fragments` defaults to the full worker
/// count; the reassembly step still needs every index the order metadata
/// names, so lowering it only relaxes the gate, not the protocol.
pub struct AssembleOptions {
    pub tolerance: chrono::Duration,
    pub min_fragments: Option<usize>,
    pub call_timeout: Duration,
    pub deadline: Duration,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        AssembleOptions {
            tolerance: chrono::Duration::seconds(5),
            min_fragments: None,
            call_timeout: Duration::from_secs(5),
            deadline: Duration::from_secs(30),
        }
    }
}

/// What the distributing side must hold on to between scatter and assembly:
/// the sealed order metadata and the per-worker delivery report.
pub struct DistributionRecord {
    pub sealed_order: Vec<u8>,
    pub report: DeliveryReport,
    pub submitted_at: DateTime<Utc>,
}

/// The full distributing sequence: encrypt the payload under the recipient
/// key, split into one fragment per worker, fan out. The payload must fit
/// the direct-encryption bound; oversized payloads are rejected up front.
pub async fn scatter_payload<C: WorkerClient + ?Sized>(
    client: &C,
    keys: &KeyManager,
    recipient: &RsaPublicKey,
    payload: &[u8],
    workers: &[WorkerAddress],
    call_timeout: Duration,
) -> Result<DistributionRecord, ScatterError> {
    let ciphertext = keys.encrypt(payload, recipient)?;
    let outcome = split(&ciphertext, workers.len(), keys, recipient)?;
    let submitted_at = Utc::now();
    let report = distribute(client, &outcome.fragments, workers, submitted_at, call_timeout).await?;
    if report.sent_count() < workers.len() {
        warn!(
            "partial distribution: {}/{} workers hold a fragment",
            report.sent_count(),
            workers.len()
        );
    }
    Ok(DistributionRecord {
        sealed_order: outcome.sealed_order,
        report,
        submitted_at,
    })
}

/// The full assembling sequence under one deadline: collect from every
/// worker, gate on count and timestamp consistency, restore the ciphertext,
/// decrypt. Blowing the deadline is a failure, never an indefinite wait.
pub async fn assemble_payload<C: WorkerClient + ?Sized>(
    client: &C,
    keys: &KeyManager,
    password: &str,
    workers: &[WorkerAddress],
    sealed_order: &[u8],
    opts: &AssembleOptions,
) -> Result<Vec<u8>, AssembleError> {
    let sequence = async {
        let collected = collect(client, workers, opts.call_timeout).await;
        let expected = opts.min_fragments.unwrap_or(workers.len());
        validate(&collected, expected, opts.tolerance)?;
        let ciphertext = reassemble(&collected, sealed_order, keys, password)?;
        let plaintext = keys.decrypt(&ciphertext, password)?;
        info!("assembled and decrypted {} bytes", plaintext.len());
        Ok(plaintext)
    };
    match tokio::time::timeout(opts.deadline, sequence).await {
        Ok(result) => result,
        Err(_) => Err(AssembleError::DeadlineExceeded {
            secs: opts.deadline.as_secs(),
        }),
    }
}

/// Probes every worker concurrently and reports per address.
pub async fn check_workers<C: WorkerClient + ?Sized>(
    client: &C,
    workers: &[WorkerAddress],
    call_timeout: Duration,
) -> BTreeMap<WorkerAddress, WorkerHealth> {
    stream::iter(workers.iter())
        .map(|addr| async move {
            let health = match tokio::time::timeout(call_timeout, client.health(addr)).await {
                Err(_) => WorkerHealth::Unhealthy(format!("no response within {:?}", call_timeout)),
                Ok(Err(e)) => WorkerHealth::Unhealthy(e.to_string()),
                Ok(Ok(())) => WorkerHealth::Healthy,
            };
            (addr.clone(), health)
        })
        .buffer_unordered(MAX_IN_FLIGHT)
        .collect::<Vec<(WorkerAddress, WorkerHealth)>>()
        .await
        .into_iter()
        .collect()
}

/// Fetches and parses a peer's PEM public key, for the distributing side to
/// encrypt against.
pub async fn fetch_public_key<C: WorkerClient + ?Sized>(
    client: &C,
    addr: &WorkerAddress,
    call_timeout: Duration,
) -> Result<RsaPublicKey, WorkerError> {
    let pem = match tokio::time::timeout(call_timeout, client.public_key(addr)).await {
        Err(_) => {
            return Err(WorkerError::Unreachable(format!(
                "no response within {:?}",
                call_timeout
            )))
        }
        Ok(result) => result?,
    };
    RsaPublicKey::from_public_key_pem(&pem)
        .map_err(|e| WorkerError::Malformed(format!("bad public key PEM: {}", e)))
}
