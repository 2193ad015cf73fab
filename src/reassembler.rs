use log::{debug, info};

use crate::collector::CollectedSet;
use crate::errors::{AssembleError, MetadataError};
use crate::keys::KeyManager;
use crate::models::send_order::SendOrder;

/// Unseals the order metadata, checks it against the collected set, and
/// stitches the fragments back into the original ciphertext by ascending
/// `original_index` (the send order only ever mattered for delivery).
///
/// The returned bytes still need `KeyManager::decrypt`; that final
/// decryption is the protocol's authoritative integrity check, so a wrong
/// boundary or substituted fragment surfaces there rather than here.
pub fn reassemble(
    collected: &CollectedSet,
    sealed_order: &[u8],
    keys: &KeyManager,
    password: &str,
) -> Result<Vec<u8>, AssembleError> {
    let metadata = keys.decrypt_blocks(sealed_order, password)?;
    let metadata = String::from_utf8(metadata).map_err(|_| MetadataError::Malformed {
        reason: "metadata is not UTF-8".to_string(),
    })?;
    let order = SendOrder::parse(&metadata)?;
    debug!("order metadata decrypted: {}", metadata);

    if order.len() != collected.len() {
        return Err(AssembleError::Metadata(MetadataError::LengthMismatch {
            order: order.len(),
            collected: collected.len(),
        }));
    }
    for index in order.iter() {
        if !collected.contains_key(&index) {
            return Err(AssembleError::Metadata(MetadataError::MissingFragment {
                index,
            }));
        }
    }

    // BTreeMap iteration is already ascending by original index
    let ciphertext: Vec<u8> = collected
        .values()
        .flat_map(|fragment| fragment.data.iter().copied())
        .collect();
    info!(
        "reassembled {} fragments into {} bytes",
        collected.len(),
        ciphertext.len()
    );
    Ok(ciphertext)
}
