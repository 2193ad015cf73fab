use log::{info, warn};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::wire::FragmentRecord;

/// The worker-side fragment slot: at most one record, the most recent
/// submission winning. Optionally mirrored to disk so a worker restart does
/// not lose the fragment.
pub struct Vault {
    slot: Mutex<Option<FragmentRecord>>,
    path: Option<PathBuf>,
}

impl Vault {
    pub fn in_memory() -> Self {
        Vault {
            slot: Mutex::new(None),
            path: None,
        }
    }

    /// A vault backed by `path`, preloading whatever record survived a
    /// previous run.
    pub fn persistent(path: PathBuf) -> Self {
        let existing = std::fs::read(&path)
            .ok()
            .and_then(|raw| match bincode::deserialize(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("discarding unreadable record at {}: {}", path.display(), e);
                    None
                }
            });
        Vault {
            slot: Mutex::new(existing),
            path: Some(path),
        }
    }

    pub fn store(&self, record: FragmentRecord) {
        if let Some(path) = &self.path {
            match bincode::serialize(&record) {
                Ok(raw) => {
                    if let Err(e) = std::fs::write(path, raw) {
                        warn!("could not persist record to {}: {}", path.display(), e);
                    }
                }
                Err(e) => warn!("could not serialize record: {}", e),
            }
        }
        info!(
            "storing fragment with original index {} ({} b64 chars)",
            record.original_index,
            record.fragment_data.len()
        );
        *self.slot.lock().unwrap() = Some(record);
    }

    pub fn current(&self) -> Option<FragmentRecord> {
        self.slot.lock().unwrap().clone()
    }
}
