mod key_error;
mod protocol_error;

pub use key_error::KeyError;
pub use protocol_error::{
    AssembleError, ConsistencyError, DistributionError, FragmentError, MetadataError, ScatterError,
};
