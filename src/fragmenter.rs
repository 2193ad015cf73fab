use log::debug;
use rsa::RsaPublicKey;

use crate::errors::FragmentError;
use crate::keys::KeyManager;
use crate::models::fragment::Fragment;
use crate::models::send_order::SendOrder;

/// Everything `split` hands back: fragments already arranged in send order,
/// the order itself, and the sealed metadata required to undo it.
pub struct SplitOutcome {
    pub send_order: SendOrder,
    pub fragments: Vec<Fragment>,
    pub sealed_order: Vec<u8>,
}

/// Partitions a ciphertext into `worker_count` contiguous ranges, shuffles
/// the hand-out order, and seals the order under the recipient's public key.
///
/// Ranges are `floor(len / worker_count)` bytes each, with the final range
/// absorbing the remainder.
pub fn split(
    ciphertext: &[u8],
    worker_count: usize,
    keys: &KeyManager,
    recipient: &RsaPublicKey,
) -> Result<SplitOutcome, FragmentError> {
    if worker_count == 0 {
        return Err(FragmentError::NoWorkers);
    }
    if worker_count > ciphertext.len() {
        return Err(FragmentError::TooManyParts {
            parts: worker_count,
            len: ciphertext.len(),
        });
    }

    let chunk = ciphertext.len() / worker_count;
    let ranges: Vec<&[u8]> = (0..worker_count)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == worker_count {
                ciphertext.len()
            } else {
                start + chunk
            };
            &ciphertext[start..end]
        })
        .collect();

    let send_order = SendOrder::shuffled(worker_count);
    let fragments: Vec<Fragment> = send_order
        .iter()
        .map(|original_index| Fragment::new(original_index, ranges[original_index].to_vec()))
        .collect();

    // the encoded order grows with the worker count, so it is sealed in
    // blocks rather than a single bounded OAEP call
    let sealed_order = keys.encrypt_blocks(send_order.encode().as_bytes(), recipient)?;
    debug!(
        "split {} bytes into {} fragments, order sealed in {} bytes",
        ciphertext.len(),
        worker_count,
        sealed_order.len()
    );

    Ok(SplitOutcome {
        send_order,
        fragments,
        sealed_order,
    })
}
