use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{WorkerClient, WorkerError};
use crate::models::address::WorkerAddress;
use crate::models::wire::FragmentRecord;

const FRAGMENT_FILE: &str = "fragment.bin";
const PUBLIC_KEY_FILE: &str = "public.pem";

/// A cluster laid out on the filesystem: one directory per worker address
/// under a common root, each holding at most one fragment record. Lets the
/// CLI run the full protocol without a network layer; a worker whose
/// directory is missing is simply unreachable.
pub struct DirCluster {
    root: PathBuf,
}

impl DirCluster {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirCluster { root: root.into() }
    }

    fn worker_dir(&self, addr: &WorkerAddress) -> Result<PathBuf, WorkerError> {
        let dir = self.root.join(addr.as_str());
        if !dir.is_dir() {
            return Err(WorkerError::Unreachable(format!(
                "no worker directory at {}",
                dir.display()
            )));
        }
        Ok(dir)
    }

    async fn read_file(path: &Path) -> Result<Vec<u8>, WorkerError> {
        match tokio::fs::read(path).await {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(WorkerError::Empty),
            Err(e) => Err(WorkerError::Unreachable(e.to_string())),
        }
    }
}

#[async_trait]
impl WorkerClient for DirCluster {
    async fn submit(
        &self,
        addr: &WorkerAddress,
        record: FragmentRecord,
    ) -> Result<(), WorkerError> {
        let dir = self.worker_dir(addr)?;
        let raw = bincode::serialize(&record).map_err(|e| WorkerError::Malformed(e.to_string()))?;
        tokio::fs::write(dir.join(FRAGMENT_FILE), raw)
            .await
            .map_err(|e| WorkerError::Unreachable(e.to_string()))
    }

    async fn retrieve(&self, addr: &WorkerAddress) -> Result<FragmentRecord, WorkerError> {
        let dir = self.worker_dir(addr)?;
        let raw = Self::read_file(&dir.join(FRAGMENT_FILE)).await?;
        bincode::deserialize(&raw).map_err(|e| WorkerError::Malformed(e.to_string()))
    }

    async fn health(&self, addr: &WorkerAddress) -> Result<(), WorkerError> {
        self.worker_dir(addr).map(|_| ())
    }

    async fn public_key(&self, addr: &WorkerAddress) -> Result<String, WorkerError> {
        let dir = self.worker_dir(addr)?;
        let raw = match Self::read_file(&dir.join(PUBLIC_KEY_FILE)).await {
            Ok(raw) => raw,
            Err(WorkerError::Empty) => return Err(WorkerError::NoPublicKey),
            Err(e) => return Err(e),
        };
        String::from_utf8(raw).map_err(|e| WorkerError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fragment::Fragment;
    use chrono::Utc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_worker_directory_is_unreachable() {
        let root = tempdir().unwrap();
        let cluster = DirCluster::new(root.path());
        let addr = WorkerAddress::from("w0");
        assert!(matches!(
            cluster.health(&addr).await,
            Err(WorkerError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn submit_then_retrieve_round_trips() {
        let root = tempdir().unwrap();
        std::fs::create_dir(root.path().join("w0")).unwrap();
        let cluster = DirCluster::new(root.path());
        let addr = WorkerAddress::from("w0");

        let record = FragmentRecord::from_fragment(&Fragment::new(2, vec![9, 9]), Utc::now());
        cluster.submit(&addr, record.clone()).await.unwrap();
        assert_eq!(cluster.retrieve(&addr).await.unwrap(), record);
    }

    #[tokio::test]
    async fn empty_vault_reports_empty() {
        let root = tempdir().unwrap();
        std::fs::create_dir(root.path().join("w0")).unwrap();
        let cluster = DirCluster::new(root.path());
        let addr = WorkerAddress::from("w0");
        assert!(matches!(
            cluster.retrieve(&addr).await,
            Err(WorkerError::Empty)
        ));
    }
}
