use crate::tx::{TransactionOutpoint, TransactionOutput};
use radiant_hashes::HasherBase;

pub mod sighash_type;
pub mod tx;

/// Writes the consensus encoding of primitive values into a hasher (or any
/// other [`HasherBase`] sink such as [`BytesWriter`]).
pub trait HasherExtensions {
    /// Writes the Bitcoin style compact size encoding of `len`
    fn write_compact_size(&mut self, len: usize) -> &mut Self;

    fn write_u8(&mut self, val: u8) -> &mut Self;

    fn write_u16(&mut self, val: u16) -> &mut Self;

    fn write_u32(&mut self, val: u32) -> &mut Self;

    fn write_i32(&mut self, val: i32) -> &mut Self;

    fn write_u64(&mut self, val: u64) -> &mut Self;

    fn write_i64(&mut self, val: i64) -> &mut Self;

    /// Writes the compact size of `bytes` followed by the bytes themselves
    fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self;

    fn write_outpoint(&mut self, outpoint: &TransactionOutpoint) -> &mut Self;

    /// Writes `value ‖ var_bytes(script)`
    fn write_output(&mut self, output: &TransactionOutput) -> &mut Self;
}

impl<T: HasherBase> HasherExtensions for T {
    #[inline(always)]
    fn write_compact_size(&mut self, len: usize) -> &mut Self {
        let len = len as u64;
        if len < 0xfd {
            self.write_u8(len as u8)
        } else if len <= u16::MAX as u64 {
            self.write_u8(0xfd).write_u16(len as u16)
        } else if len <= u32::MAX as u64 {
            self.write_u8(0xfe).write_u32(len as u32)
        } else {
            self.write_u8(0xff).write_u64(len)
        }
    }

    #[inline(always)]
    fn write_u8(&mut self, val: u8) -> &mut Self {
        self.update(val.to_le_bytes())
    }

    #[inline(always)]
    fn write_u16(&mut self, val: u16) -> &mut Self {
        self.update(val.to_le_bytes())
    }

    #[inline(always)]
    fn write_u32(&mut self, val: u32) -> &mut Self {
        self.update(val.to_le_bytes())
    }

    #[inline(always)]
    fn write_i32(&mut self, val: i32) -> &mut Self {
        self.update(val.to_le_bytes())
    }

    #[inline(always)]
    fn write_u64(&mut self, val: u64) -> &mut Self {
        self.update(val.to_le_bytes())
    }

    #[inline(always)]
    fn write_i64(&mut self, val: i64) -> &mut Self {
        self.update(val.to_le_bytes())
    }

    #[inline(always)]
    fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_compact_size(bytes.len()).update(bytes)
    }

    #[inline(always)]
    fn write_outpoint(&mut self, outpoint: &TransactionOutpoint) -> &mut Self {
        self.update(outpoint.transaction_id).write_u32(outpoint.index)
    }

    #[inline(always)]
    fn write_output(&mut self, output: &TransactionOutput) -> &mut Self {
        self.write_i64(output.value).write_var_bytes(&output.script_public_key)
    }
}

/// A [`HasherBase`] sink that collects the written bytes.
#[derive(Clone, Default, Debug)]
pub struct BytesWriter(Vec<u8>);

impl BytesWriter {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl HasherBase for BytesWriter {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.extend_from_slice(data.as_ref());
        self
    }
}
