use serde::{Deserialize, Serialize};
use std::fmt;

/// Network address of one worker node. Treated as an opaque label by the
/// protocol; only the transport layer interprets it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerAddress(String);

impl WorkerAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkerAddress {
    fn from(s: &str) -> Self {
        WorkerAddress(s.to_string())
    }
}

impl From<String> for WorkerAddress {
    fn from(s: String) -> Self {
        WorkerAddress(s)
    }
}
