use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fragment::Fragment;

/// The record exchanged with a worker's fragment store. The same shape is
/// used on submit and on retrieve; `original_index` doubles as the worker's
/// identity indicator on the way back, since workers are queried by address
/// in no guaranteed order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FragmentRecord {
    pub fragment_data: String, // base64 of the fragment bytes
    pub submission_time: DateTime<Utc>,
    pub original_index: usize,
}

impl FragmentRecord {
    pub fn from_fragment(fragment: &Fragment, submitted_at: DateTime<Utc>) -> Self {
        FragmentRecord {
            fragment_data: BASE64.encode(&fragment.data),
            submission_time: submitted_at,
            original_index: fragment.original_index,
        }
    }

    pub fn decode_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.fragment_data)
    }
}
