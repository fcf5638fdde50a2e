use radiant_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Represents the ID of a Radiant transaction
pub type TransactionId = Hash;

/// Lock times below this threshold are block heights, at or above it they are UNIX timestamps.
pub const LOCK_TIME_THRESHOLD: u32 = 500_000_000;

/// Setting every input sequence to this value disables lock time checks for the transaction.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// If set on an input sequence, the sequence is not interpreted as a relative lock time.
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;

/// If set, the relative lock time is in units of 512 seconds, otherwise it is in blocks.
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;

/// Extracts the relative lock time value from an input sequence.
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;

/// Represents a Radiant transaction outpoint
#[derive(Eq, Hash, PartialEq, Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: u32,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self { transaction_id, index }
    }
}

impl Display for TransactionOutpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.transaction_id, self.index)
    }
}

/// Represents a Radiant transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, signature_script: Vec<u8>, sequence: u32) -> Self {
        Self { previous_outpoint, signature_script, sequence }
    }
}

/// Represents a Radiant transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: i64,
    pub script_public_key: Vec<u8>,
}

impl TransactionOutput {
    pub fn new(value: i64, script_public_key: Vec<u8>) -> Self {
        Self { value, script_public_key }
    }

    /// The placeholder output used by legacy SIGHASH_SINGLE serialization.
    pub fn null() -> Self {
        Self { value: -1, script_public_key: Vec::new() }
    }
}

/// Represents a Radiant transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(version: i32, inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, lock_time: u32) -> Self {
        Self { version, inputs, outputs, lock_time }
    }

    /// Wire serialization of the transaction.
    pub fn serialize(&self) -> Vec<u8> {
        crate::hashing::tx::serialize(self)
    }
}

/// Holds details about an individual transaction output in a utxo
/// set: its locking script, value, and the block that created it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub amount: i64,
    pub script_public_key: Vec<u8>,
    pub block_height: u32,
    pub is_coinbase: bool,
}

impl UtxoEntry {
    pub fn new(amount: i64, script_public_key: Vec<u8>, block_height: u32, is_coinbase: bool) -> Self {
        Self { amount, script_public_key, block_height, is_coinbase }
    }

    /// The null coin handed out for inputs whose previous output is unknown.
    pub fn spent() -> Self {
        Self { amount: -1, script_public_key: Vec::new(), block_height: 0, is_coinbase: false }
    }

    pub fn is_spent(&self) -> bool {
        self.amount == -1 && self.script_public_key.is_empty()
    }
}
