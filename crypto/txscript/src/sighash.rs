use crate::opcodes::codes;
use crate::script::{RefId, ScriptIter, get_push_refs};
use crate::ScriptFlags;
use radiant_consensus_core::hashing::HasherExtensions;
use radiant_consensus_core::hashing::sighash_type::SigHashType;
use radiant_consensus_core::tx::{Transaction, TransactionOutput};
use radiant_hashes::{DoubleSha256, Hash, Hasher, HasherBase, ZERO_HASH};
use radiant_txscript_errors::ScriptError;
use std::collections::BTreeSet;

/// Legacy signature hash returned for SIGHASH_SINGLE without a matching output.
const SIGHASH_SINGLE_BUG: Hash = {
    let mut bytes = [0u8; 32];
    bytes[0] = 1;
    Hash::from_bytes(bytes)
};

/// Hashes of the parts of a transaction shared by all signature hashes of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrecomputedTransactionData {
    pub hash_prevouts: Hash,
    pub hash_sequence: Hash,
    pub hash_outputs: Hash,
    pub hash_output_hashes: Hash,
}

impl PrecomputedTransactionData {
    pub fn new(tx: &Transaction) -> Result<Self, ScriptError> {
        Ok(Self {
            hash_prevouts: prevouts_hash(tx),
            hash_sequence: sequence_hash(tx),
            hash_outputs: outputs_hash(tx),
            hash_output_hashes: output_hashes_hash(tx)?,
        })
    }
}

/// Summary of one locking script committed to by signature hashes, v3 transaction
/// ids and the data summary opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDataSummary {
    pub value: i64,
    pub script_hash: Hash,
    pub total_refs: u32,
    pub refs_hash: Hash,
}

impl OutputDataSummary {
    pub fn new(value: i64, script: &[u8]) -> Result<Self, ScriptError> {
        let refs = get_push_refs(script).map_err(|err| {
            log::warn!("output script with unparseable references: {err}");
            ScriptError::Unknown
        })?;
        Ok(Self::from_push_refs(value, script, &refs.push))
    }

    pub(crate) fn from_push_refs(value: i64, script: &[u8], push_refs: &BTreeSet<RefId>) -> Self {
        Self { value, script_hash: DoubleSha256::hash(script), total_refs: push_refs.len() as u32, refs_hash: refs_hash(push_refs) }
    }

    pub fn write<T: HasherBase>(&self, hasher: &mut T) {
        hasher.write_i64(self.value).update(self.script_hash).write_u32(self.total_refs).update(self.refs_hash);
    }

    /// sha256d of the serialized summary.
    pub fn hash(&self) -> Hash {
        let mut hasher = DoubleSha256::default();
        self.write(&mut hasher);
        hasher.finalize()
    }
}

/// sha256d over the concatenated references in set order, or the zero hash for an
/// empty set.
pub fn refs_hash(refs: &BTreeSet<RefId>) -> Hash {
    if refs.is_empty() {
        return ZERO_HASH;
    }
    let mut hasher = DoubleSha256::default();
    for id in refs {
        hasher.update(id);
    }
    hasher.finalize()
}

fn prevouts_hash(tx: &Transaction) -> Hash {
    let mut hasher = DoubleSha256::default();
    for input in tx.inputs.iter() {
        hasher.write_outpoint(&input.previous_outpoint);
    }
    hasher.finalize()
}

pub(crate) fn sequence_hash(tx: &Transaction) -> Hash {
    let mut hasher = DoubleSha256::default();
    for input in tx.inputs.iter() {
        hasher.write_u32(input.sequence);
    }
    hasher.finalize()
}

fn outputs_hash(tx: &Transaction) -> Hash {
    let mut hasher = DoubleSha256::default();
    for output in tx.outputs.iter() {
        hasher.write_output(output);
    }
    hasher.finalize()
}

pub(crate) fn output_hashes_hash(tx: &Transaction) -> Result<Hash, ScriptError> {
    let mut hasher = DoubleSha256::default();
    for output in tx.outputs.iter() {
        OutputDataSummary::new(output.value, &output.script_public_key)?.write(&mut hasher);
    }
    Ok(hasher.finalize())
}

/// Computes the digest signed by the signature for input `input_index`.
///
/// Hash types carrying FORKID use the BIP143 style preimage once `SIGHASH_FORKID` is
/// enabled, everything else hashes the legacy serialization.
pub fn signature_hash(
    script_code: &[u8],
    tx: &Transaction,
    input_index: usize,
    hash_type: SigHashType,
    amount: i64,
    cache: Option<&PrecomputedTransactionData>,
    flags: ScriptFlags,
) -> Result<Hash, ScriptError> {
    let Some(input) = tx.inputs.get(input_index) else {
        log::warn!("signature hash requested for input {input_index} of a {} input transaction", tx.inputs.len());
        return Err(ScriptError::Unknown);
    };

    if !(hash_type.has_fork_id() && flags.contains(ScriptFlags::SIGHASH_FORKID)) {
        return Ok(legacy_signature_hash(script_code, tx, input_index, hash_type));
    }

    let single_or_none = hash_type.is_sighash_single() || hash_type.is_sighash_none();
    let mut hash_prevouts = ZERO_HASH;
    let mut hash_sequence = ZERO_HASH;
    let mut hash_outputs = ZERO_HASH;
    let mut hash_output_hashes = ZERO_HASH;

    if !hash_type.is_sighash_anyone_can_pay() {
        hash_prevouts = cache.map_or_else(|| prevouts_hash(tx), |c| c.hash_prevouts);
        if !single_or_none {
            hash_sequence = cache.map_or_else(|| sequence_hash(tx), |c| c.hash_sequence);
        }
    }

    if !single_or_none {
        match cache {
            Some(c) => {
                hash_outputs = c.hash_outputs;
                hash_output_hashes = c.hash_output_hashes;
            }
            None => {
                hash_outputs = outputs_hash(tx);
                hash_output_hashes = output_hashes_hash(tx)?;
            }
        }
    } else if let Some(output) = tx.outputs.get(input_index).filter(|_| hash_type.is_sighash_single()) {
        let mut hasher = DoubleSha256::default();
        hasher.write_output(output);
        hash_outputs = hasher.finalize();

        let mut hasher = DoubleSha256::default();
        OutputDataSummary::new(output.value, &output.script_public_key)?.write(&mut hasher);
        hash_output_hashes = hasher.finalize();
    }

    let mut hasher = DoubleSha256::default();
    hasher
        .write_i32(tx.version)
        .update(hash_prevouts)
        .update(hash_sequence)
        .write_outpoint(&input.previous_outpoint)
        .write_var_bytes(script_code)
        .write_i64(amount)
        .write_u32(input.sequence)
        .update(hash_output_hashes)
        .update(hash_outputs)
        .write_u32(tx.lock_time)
        .write_u32(hash_type.to_u32());
    Ok(hasher.finalize())
}

fn legacy_signature_hash(script_code: &[u8], tx: &Transaction, input_index: usize, hash_type: SigHashType) -> Hash {
    if hash_type.is_sighash_single() && input_index >= tx.outputs.len() {
        return SIGHASH_SINGLE_BUG;
    }

    let anyone_can_pay = hash_type.is_sighash_anyone_can_pay();
    let single_or_none = hash_type.is_sighash_single() || hash_type.is_sighash_none();
    let mut hasher = DoubleSha256::default();

    hasher.write_i32(tx.version);
    let n_inputs = if anyone_can_pay { 1 } else { tx.inputs.len() };
    hasher.write_compact_size(n_inputs);
    for i in 0..n_inputs {
        let index = if anyone_can_pay { input_index } else { i };
        let input = &tx.inputs[index];
        hasher.write_outpoint(&input.previous_outpoint);
        if index == input_index {
            write_script_code(&mut hasher, script_code);
        } else {
            hasher.write_compact_size(0);
        }
        if index != input_index && single_or_none {
            hasher.write_u32(0);
        } else {
            hasher.write_u32(input.sequence);
        }
    }

    let n_outputs = if hash_type.is_sighash_none() {
        0
    } else if hash_type.is_sighash_single() {
        input_index + 1
    } else {
        tx.outputs.len()
    };
    hasher.write_compact_size(n_outputs);
    for (i, output) in tx.outputs.iter().take(n_outputs).enumerate() {
        if hash_type.is_sighash_single() && i != input_index {
            hasher.write_output(&TransactionOutput::null());
        } else {
            hasher.write_output(output);
        }
    }

    hasher.write_u32(tx.lock_time).write_u32(hash_type.to_u32());
    hasher.finalize()
}

/// Writes `script_code` with every OP_CODESEPARATOR removed.
///
/// The length prefix only discounts the separators found before a parse failure, and
/// the bytes written stop where the failing read stopped.
fn write_script_code<T: HasherBase>(hasher: &mut T, script_code: &[u8]) {
    let separators =
        ScriptIter::new(script_code).map_while(Result::ok).filter(|op| op.value == codes::OpCodeSeparator).count();
    hasher.write_compact_size(script_code.len() - separators);

    let mut iter = ScriptIter::new(script_code);
    let mut begin = 0;
    while let Some(Ok(op)) = iter.next() {
        if op.value == codes::OpCodeSeparator {
            hasher.update(&script_code[begin..op.offset]);
            begin = op.end;
        }
    }
    if begin != script_code.len() {
        hasher.update(&script_code[begin..iter.position()]);
    }
}
