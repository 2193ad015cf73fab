//! Scatters a confidential payload across independent worker nodes so that
//! no single node holds the complete secret, and later puts it back
//! together.
//!
//! The payload is encrypted under the recipient's public key, the ciphertext
//! split into contiguous fragments, and the fragments handed out in a
//! shuffled order that is itself encrypted. Getting the plaintext back takes
//! every fragment, submission timestamps that agree, the sealed order
//! metadata, and the private-key password.

pub mod collector;
pub mod config;
pub mod consistency;
pub mod distributor;
pub mod errors;
pub mod fragmenter;
pub mod keys;
pub mod models;
pub mod pipeline;
pub mod reassembler;
pub mod worker;
