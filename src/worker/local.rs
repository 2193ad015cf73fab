use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::vault::Vault;
use super::{WorkerClient, WorkerError};
use crate::models::address::WorkerAddress;
use crate::models::wire::FragmentRecord;

/// An in-process cluster of vaults, one per address. Stands in for the real
/// transport in tests and supports knocking workers down and tampering with
/// stored records to exercise the failure paths.
pub struct LocalCluster {
    vaults: HashMap<WorkerAddress, Vault>,
    down: Mutex<HashSet<WorkerAddress>>,
    public_pem: Mutex<Option<String>>,
    latency: Mutex<Option<Duration>>,
}

impl LocalCluster {
    pub fn new(addresses: &[WorkerAddress]) -> Self {
        let vaults = addresses
            .iter()
            .map(|addr| (addr.clone(), Vault::in_memory()))
            .collect();
        LocalCluster {
            vaults,
            down: Mutex::new(HashSet::new()),
            public_pem: Mutex::new(None),
            latency: Mutex::new(None),
        }
    }

    /// Delays every call by `delay`, for exercising timeouts and deadlines.
    pub fn inject_latency(&self, delay: Duration) {
        *self.latency.lock().unwrap() = Some(delay);
    }

    pub fn take_down(&self, addr: &WorkerAddress) {
        self.down.lock().unwrap().insert(addr.clone());
    }

    pub fn bring_up(&self, addr: &WorkerAddress) {
        self.down.lock().unwrap().remove(addr);
    }

    pub fn serve_public_key(&self, pem: String) {
        *self.public_pem.lock().unwrap() = Some(pem);
    }

    /// Rewrites the submission time a worker stored, simulating a stale or
    /// replayed fragment.
    pub fn tamper_submission_time(&self, addr: &WorkerAddress, at: DateTime<Utc>) {
        let vault = self.vaults.get(addr).expect("unknown worker");
        if let Some(mut record) = vault.current() {
            record.submission_time = at;
            vault.store(record);
        }
    }

    async fn vault_for(&self, addr: &WorkerAddress) -> Result<&Vault, WorkerError> {
        let delay = *self.latency.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.down.lock().unwrap().contains(addr) {
            return Err(WorkerError::Unreachable("worker is down".to_string()));
        }
        self.vaults
            .get(addr)
            .ok_or_else(|| WorkerError::Unreachable(format!("no such worker {}", addr)))
    }
}

#[async_trait]
impl WorkerClient for LocalCluster {
    async fn submit(
        &self,
        addr: &WorkerAddress,
        record: FragmentRecord,
    ) -> Result<(), WorkerError> {
        self.vault_for(addr).await?.store(record);
        Ok(())
    }

    async fn retrieve(&self, addr: &WorkerAddress) -> Result<FragmentRecord, WorkerError> {
        self.vault_for(addr).await?.current().ok_or(WorkerError::Empty)
    }

    async fn health(&self, addr: &WorkerAddress) -> Result<(), WorkerError> {
        self.vault_for(addr).await.map(|_| ())
    }

    async fn public_key(&self, addr: &WorkerAddress) -> Result<String, WorkerError> {
        self.vault_for(addr).await?;
        self.public_pem
            .lock()
            .unwrap()
            .clone()
            .ok_or(WorkerError::NoPublicKey)
    }
}
