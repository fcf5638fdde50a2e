//! Script byte parsing and the structural helpers built on top of it.

use crate::opcodes::{OpcodeLength, codes, opcode_length};
use core::cmp::Ordering;
use core::fmt::{Debug, Display, Formatter};
use std::collections::BTreeSet;
use thiserror::Error;

/// Byte length of a reference identifier (a 32 byte txid followed by a 4 byte output index).
pub const REF_SIZE: usize = 36;

/// A 36 byte reference identifier as carried by the reference opcodes.
///
/// Ordering compares the bytes from the last one to the first, which is the
/// order in which reference sets are enumerated (and hence hashed).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefId([u8; REF_SIZE]);

impl RefId {
    pub const fn from_bytes(bytes: [u8; REF_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns `None` unless `bytes` is exactly [`REF_SIZE`] long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; REF_SIZE]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; REF_SIZE] {
        &self.0
    }
}

impl Ord for RefId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for RefId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AsRef<[u8]> for RefId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for RefId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; REF_SIZE * 2];
        faster_hex::hex_encode(&self.0, &mut hex).map_err(|_| std::fmt::Error)?;
        f.write_str(core::str::from_utf8(&hex).map_err(|_| std::fmt::Error)?)
    }
}

impl Debug for RefId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefId({self})")
    }
}

/// An operand ran past the end of the script.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("truncated operand for opcode {opcode:#04x} at offset {offset}")]
pub struct TruncatedOperand {
    pub opcode: u8,
    pub offset: usize,
}

/// One decoded instruction, borrowing its operand from the script buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ParsedOpcode<'a> {
    pub value: u8,
    pub data: &'a [u8],
    /// Offset of the opcode byte.
    pub offset: usize,
    /// Offset of the first byte after the instruction.
    pub end: usize,
}

impl ParsedOpcode<'_> {
    pub fn is_push(&self) -> bool {
        self.value <= codes::Op16
    }
}

impl Debug for ParsedOpcode<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = crate::opcodes::opcode_name(self.value).unwrap_or("OpUnknown");
        write!(f, "{name}<{:#04x}>{{ data: {} }}", self.value, faster_hex::hex_string(self.data))
    }
}

/// Walks a script instruction by instruction.
///
/// After yielding an error the iterator is exhausted. [`ScriptIter::position`] then
/// reports how far the failed read advanced: one byte past the opcode, plus the
/// length prefix if it could be read in full.
#[derive(Clone)]
pub struct ScriptIter<'a> {
    script: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ScriptIter<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        Self { script, pos: 0, failed: false }
    }

    fn starting_at(script: &'a [u8], pos: usize) -> Self {
        Self { script, pos, failed: false }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn read(&mut self) -> Result<ParsedOpcode<'a>, TruncatedOperand> {
        let offset = self.pos;
        let value = self.script[offset];
        self.pos += 1;
        let truncated = TruncatedOperand { opcode: value, offset };

        let len = match opcode_length(value) {
            OpcodeLength::Fixed(len) => len - 1,
            OpcodeLength::Prefixed(width) => {
                let prefix = self.script.get(self.pos..self.pos + width).ok_or(truncated)?;
                let mut buf = [0u8; 4];
                buf[..width].copy_from_slice(prefix);
                self.pos += width;
                u32::from_le_bytes(buf) as usize
            }
        };

        if self.script.len() - self.pos < len {
            return Err(truncated);
        }
        let data = &self.script[self.pos..self.pos + len];
        self.pos += len;
        Ok(ParsedOpcode { value, data, offset, end: self.pos })
    }
}

impl<'a> Iterator for ScriptIter<'a> {
    type Item = Result<ParsedOpcode<'a>, TruncatedOperand>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.script.len() {
            return None;
        }
        let result = self.read();
        self.failed = result.is_err();
        Some(result)
    }
}

/// Whether `data` pushed by `opcode` uses the shortest possible push.
pub fn check_minimal_push(data: &[u8], opcode: u8) -> bool {
    match data.len() {
        0 => opcode == codes::OpFalse,
        // Should have used OP_1 .. OP_16 or OP_1NEGATE
        1 if (1..=16).contains(&data[0]) || data[0] == 0x81 => false,
        len if len <= codes::OpData75 as usize => opcode as usize == len,
        len if len <= u8::MAX as usize => opcode == codes::OpPushData1,
        len if len <= u16::MAX as usize => opcode == codes::OpPushData2,
        _ => true,
    }
}

/// True when every instruction parses and is a push (`OP_16` or below).
pub fn is_push_only(script: &[u8]) -> bool {
    ScriptIter::new(script).all(|op| op.is_ok_and(|op| op.is_push()))
}

/// `OP_HASH160 <20 bytes> OP_EQUAL`
pub fn is_pay_to_script_hash(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == codes::OpHash160 && script[1] == codes::OpData20 && script[22] == codes::OpEqual
}

/// A version opcode followed by a single 2 to 40 byte push.
pub fn is_witness_program(script: &[u8]) -> bool {
    if !(4..=42).contains(&script.len()) {
        return false;
    }
    if script[0] != codes::OpFalse && !(codes::OpTrue..=codes::Op16).contains(&script[0]) {
        return false;
    }
    script[1] as usize + 2 == script.len()
}

/// Removes every occurrence of `pattern` that starts on an instruction boundary and
/// returns how many were removed.
pub fn find_and_delete(script: &mut Vec<u8>, pattern: &[u8]) -> usize {
    if pattern.is_empty() {
        return 0;
    }

    let mut found = 0;
    let mut result = Vec::with_capacity(script.len());
    let (mut pc, mut copied_to) = (0, 0);
    loop {
        result.extend_from_slice(&script[copied_to..pc]);
        while script[pc..].starts_with(pattern) {
            pc += pattern.len();
            found += 1;
        }
        copied_to = pc;
        match ScriptIter::starting_at(script, pc).next() {
            Some(Ok(op)) => pc = op.end,
            _ => break,
        }
    }

    if found > 0 {
        result.extend_from_slice(&script[copied_to..]);
        *script = result;
    }
    found
}

/// Reference sets declared by a script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushRefs {
    pub push: BTreeSet<RefId>,
    pub require: BTreeSet<RefId>,
    pub disallowed: BTreeSet<RefId>,
    pub disallowed_sibling: BTreeSet<RefId>,
    pub singleton: BTreeSet<RefId>,
    /// Byte offset just past the `OP_STATESEPARATOR`, zero when the script has none.
    pub state_separator_index: u32,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefsError {
    #[error(transparent)]
    Parse(#[from] TruncatedOperand),

    #[error("more than one OP_STATESEPARATOR")]
    DuplicateStateSeparator,

    #[error("OP_STATESEPARATOR after OP_RETURN")]
    StateSeparatorAfterReturn,

    #[error("reference {0} is both pushed and disallowed")]
    DisallowedRefPushed(RefId),
}

/// Collects the references a script declares through its reference opcodes.
pub fn get_push_refs(script: &[u8]) -> Result<PushRefs, RefsError> {
    let mut refs = PushRefs::default();
    let mut seen_return = false;
    let mut separator = None;

    for op in ScriptIter::new(script) {
        let op = op?;
        match op.value {
            codes::OpReturn => seen_return = true,
            codes::OpStateSeparator => {
                if separator.is_some() {
                    return Err(RefsError::DuplicateStateSeparator);
                }
                if seen_return {
                    return Err(RefsError::StateSeparatorAfterReturn);
                }
                separator = Some(op.end);
            }
            _ => {}
        }

        // The parser guarantees the operand length of reference opcodes
        let Some(id) = RefId::from_slice(op.data) else { continue };
        match op.value {
            codes::OpPushInputRef => {
                refs.push.insert(id);
            }
            codes::OpRequireInputRef => {
                refs.require.insert(id);
            }
            codes::OpDisallowPushInputRef => {
                refs.disallowed.insert(id);
            }
            codes::OpDisallowPushInputRefSibling => {
                refs.disallowed_sibling.insert(id);
            }
            codes::OpPushInputRefSingleton => {
                refs.push.insert(id);
                refs.disallowed_sibling.insert(id);
                refs.singleton.insert(id);
            }
            _ => {}
        }
    }

    if let Some(id) = refs.disallowed.intersection(&refs.push).next() {
        return Err(RefsError::DisallowedRefPushed(*id));
    }
    refs.state_separator_index = separator.unwrap_or(0) as u32;
    Ok(refs)
}
