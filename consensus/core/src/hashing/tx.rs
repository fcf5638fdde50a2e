use super::{BytesWriter, HasherExtensions};
use crate::tx::{Transaction, TransactionId, TransactionInput};
use radiant_hashes::{DoubleSha256, Hasher, HasherBase};

/// Returns the wire serialization of `tx`.
pub fn serialize(tx: &Transaction) -> Vec<u8> {
    let mut writer = BytesWriter::new();
    write_transaction(&mut writer, tx);
    writer.into_bytes()
}

/// Returns the legacy transaction id, sha256d over the wire serialization.
///
/// Version 3 transactions are identified differently; see the script crate's txid module.
pub fn id_v1(tx: &Transaction) -> TransactionId {
    let mut hasher = DoubleSha256::default();
    write_transaction(&mut hasher, tx);
    hasher.finalize()
}

fn write_transaction<T: HasherBase>(hasher: &mut T, tx: &Transaction) {
    hasher.write_i32(tx.version).write_compact_size(tx.inputs.len());
    for input in tx.inputs.iter() {
        write_input(hasher, input);
    }

    hasher.write_compact_size(tx.outputs.len());
    for output in tx.outputs.iter() {
        hasher.write_output(output);
    }

    hasher.write_u32(tx.lock_time);
}

#[inline(always)]
fn write_input<T: HasherBase>(hasher: &mut T, input: &TransactionInput) {
    hasher.write_outpoint(&input.previous_outpoint).write_var_bytes(&input.signature_script).write_u32(input.sequence);
}
