use radiant_txscript_errors::ScriptError;

/// Decodes the little endian checkbits of a Schnorr CHECKMULTISIG dummy element for
/// `size` public keys. The element must be exactly `ceil(size / 8)` bytes long and
/// may not set bits at or above `size`.
pub fn decode_bitfield(data: &[u8], size: usize) -> Result<u32, ScriptError> {
    if size > 32 {
        return Err(ScriptError::InvalidBitfieldSize);
    }
    if data.len() != size.div_ceil(8) {
        return Err(ScriptError::InvalidBitfieldSize);
    }

    let bitfield = data.iter().enumerate().fold(0u32, |acc, (i, &byte)| acc | (byte as u32) << (8 * i));
    let mask = ((1u64 << size) - 1) as u32;
    if bitfield & mask != bitfield {
        return Err(ScriptError::InvalidBitRange);
    }
    Ok(bitfield)
}
