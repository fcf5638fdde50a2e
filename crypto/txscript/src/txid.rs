//! Transaction identifiers.
//!
//! Version 3 transactions are identified by a hash over a fixed size preimage that
//! commits to every input and output through intermediate hashes, which keeps proofs
//! about a transaction's ancestry compact. All other versions use the legacy id.

use crate::sighash::{output_hashes_hash, sequence_hash};
use radiant_consensus_core::hashing::HasherExtensions;
use radiant_consensus_core::hashing::tx::id_v1;
use radiant_consensus_core::tx::{Transaction, TransactionId};
use radiant_hashes::{DoubleSha256, Hash, Hasher, HasherBase};
use radiant_txscript_errors::ScriptError;

pub const TX_VERSION_3: i32 = 3;

pub fn transaction_id(tx: &Transaction) -> Result<TransactionId, ScriptError> {
    if tx.version == TX_VERSION_3 { id_v3(tx) } else { Ok(id_v1(tx)) }
}

/// sha256d over `version ‖ n_inputs ‖ hash_prevout_inputs ‖ hash_sequence ‖
/// n_outputs ‖ hash_output_hashes ‖ lock_time`.
pub fn id_v3(tx: &Transaction) -> Result<TransactionId, ScriptError> {
    let mut hasher = DoubleSha256::default();
    hasher
        .write_i32(tx.version)
        .write_u32(tx.inputs.len() as u32)
        .update(prevout_inputs_hash(tx))
        .update(sequence_hash(tx))
        .write_u32(tx.outputs.len() as u32)
        .update(output_hashes_hash(tx)?)
        .write_u32(tx.lock_time);
    Ok(hasher.finalize())
}

/// sha256d over every input's `outpoint ‖ sha256d(signature_script)`.
fn prevout_inputs_hash(tx: &Transaction) -> Hash {
    let mut hasher = DoubleSha256::default();
    for input in tx.inputs.iter() {
        hasher.write_outpoint(&input.previous_outpoint).update(DoubleSha256::hash(&input.signature_script));
    }
    hasher.finalize()
}
