use std::iter::once;

use crate::{
    opcodes::{OP_DATA_MAX_VAL, OP_DATA_MIN_VAL, OP_SMALL_INT_MAX_VAL, codes::*},
    script::REF_SIZE,
    script_num::ScriptNum,
};

/// Initial capacity of the script buffer, enough for common locking scripts.
const DEFAULT_SCRIPT_ALLOC: usize = 512;

/// The byte pushed by OP_1NEGATE.
const OP_1_NEGATE_VAL: u8 = 0x81;

/// ScriptBuilder builds scripts from opcodes, integers and data, always choosing the
/// minimal push for data and numbers.
///
/// No engine limits are enforced: oversized pushes and scripts are written as asked,
/// so that rejection paths can be exercised.
///
/// ```
/// use radiant_txscript::opcodes::codes::*;
/// use radiant_txscript::script_builder::ScriptBuilder;
/// fn build_multisig_script(pub_key1: &[u8], pub_key2: &[u8], pub_key3: &[u8]) -> Vec<u8> {
///     ScriptBuilder::new()
///         .add_op(Op2)
///         .add_data(pub_key1).add_data(pub_key2).add_data(pub_key3)
///         .add_op(Op3)
///         .add_op(OpCheckMultiSig)
///         .drain()
/// }
/// ```
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self { script: Vec::with_capacity(DEFAULT_SCRIPT_ALLOC) }
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.script)
    }

    pub fn add_op(&mut self, opcode: u8) -> &mut Self {
        self.script.push(opcode);
        self
    }

    pub fn add_ops(&mut self, opcodes: &[u8]) -> &mut Self {
        self.script.extend_from_slice(opcodes);
        self
    }

    /// Appends a reference opcode together with its 36 byte operand.
    pub fn add_ref_op(&mut self, opcode: u8, id: &[u8; REF_SIZE]) -> &mut Self {
        self.script.push(opcode);
        self.script.extend_from_slice(id);
        self
    }

    /// Returns the number of bytes the minimal push of the data will take.
    pub fn canonical_data_size(data: &[u8]) -> usize {
        let data_len = data.len();

        // A single byte representable by a "small integer" opcode takes just that opcode
        if data_len == 0 || (data_len == 1 && ((1..=OP_SMALL_INT_MAX_VAL).contains(&data[0]) || data[0] == OP_1_NEGATE_VAL)) {
            return 1;
        }

        data_len
            + if data_len <= OP_DATA_MAX_VAL as usize {
                1
            } else if data_len <= u8::MAX as usize {
                2
            } else if data_len <= u16::MAX as usize {
                3
            } else {
                5
            }
    }

    /// Pushes the data with the shortest push opcode that encodes it. A zero length
    /// buffer pushes OP_0, a single zero byte needs OP_DATA_1.
    pub fn add_data(&mut self, data: &[u8]) -> &mut Self {
        let data_len = data.len();

        if data_len == 0 {
            self.script.push(Op0);
            return self;
        } else if data_len == 1 && (1..=OP_SMALL_INT_MAX_VAL).contains(&data[0]) {
            self.script.push((Op1 - 1) + data[0]);
            return self;
        } else if data_len == 1 && data[0] == OP_1_NEGATE_VAL {
            self.script.push(Op1Negate);
            return self;
        }

        if data_len <= OP_DATA_MAX_VAL as usize {
            self.script.push((OP_DATA_MIN_VAL - 1) + data_len as u8);
        } else if data_len <= u8::MAX as usize {
            self.script.extend(once(OpPushData1).chain(once(data_len as u8)));
        } else if data_len <= u16::MAX as usize {
            self.script.extend(once(OpPushData2).chain((data_len as u16).to_le_bytes()));
        } else {
            self.script.extend(once(OpPushData4).chain((data_len as u32).to_le_bytes()));
        }

        self.script.extend_from_slice(data);
        self
    }

    /// Pushes a script number. `i64::MIN`, which no 8 byte operand can hold, is
    /// written with its 9 byte encoding.
    pub fn add_i64(&mut self, val: i64) -> &mut Self {
        if val == 0 {
            self.script.push(Op0);
            return self;
        }
        if val == -1 || (1..=16).contains(&val) {
            self.script.push(((Op1 as i64 - 1) + val) as u8);
            return self;
        }

        let bytes = match ScriptNum::from_int(val) {
            Some(num) => num.serialize(),
            None => {
                let mut bytes = val.unsigned_abs().to_le_bytes().to_vec();
                bytes.push(0x80);
                bytes
            }
        };
        self.add_data(&bytes)
    }
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
