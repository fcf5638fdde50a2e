//! Encoding rules for signatures and public keys.
//!
//! Transaction signatures carry a trailing hash type byte, data signatures do not.
//! A 64 byte signature (hash type excluded) is always a Schnorr signature, anything
//! else is treated as DER encoded ECDSA.

use crate::ScriptFlags;
use radiant_consensus_core::hashing::sighash_type::SigHashType;
use radiant_txscript_errors::ScriptError;

pub const SCHNORR_SIGNATURE_SIZE: usize = 64;

#[inline]
pub fn is_schnorr_signature(sig: &[u8]) -> bool {
    sig.len() == SCHNORR_SIGNATURE_SIZE
}

/// Strict DER check of an ECDSA signature without its hash type byte:
/// `0x30 <len> 0x02 <len R> <R> 0x02 <len S> <S>`, where R and S are positive and
/// minimally encoded.
pub fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    if sig.len() < 8 || sig.len() > 72 {
        return false;
    }
    if sig[0] != 0x30 || sig[1] as usize != sig.len() - 2 {
        return false;
    }

    let len_r = sig[3] as usize;
    if 5 + len_r >= sig.len() {
        return false;
    }
    let len_s = sig[5 + len_r] as usize;
    if len_r + len_s + 6 != sig.len() {
        return false;
    }

    if sig[2] != 0x02 || len_r == 0 || sig[4] & 0x80 != 0 {
        return false;
    }
    // Leading zero only allowed when the next byte would read as negative
    if len_r > 1 && sig[4] == 0 && sig[5] & 0x80 == 0 {
        return false;
    }

    if sig[len_r + 4] != 0x02 || len_s == 0 || sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    if len_s > 1 && sig[len_r + 6] == 0 && sig[len_r + 7] & 0x80 == 0 {
        return false;
    }

    true
}

/// Whether S is at most half the group order. Signatures that do not parse are not low S.
pub fn is_low_s(sig: &[u8]) -> bool {
    match secp256k1::ecdsa::Signature::from_der_lax(sig) {
        Ok(parsed) => {
            let mut normalized = parsed;
            normalized.normalize_s();
            normalized == parsed
        }
        Err(_) => false,
    }
}

fn check_raw_ecdsa_signature_encoding(sig: &[u8], flags: ScriptFlags) -> Result<(), ScriptError> {
    if flags.intersects(ScriptFlags::DERSIG | ScriptFlags::LOW_S | ScriptFlags::STRICTENC) && !is_valid_signature_encoding(sig) {
        return Err(ScriptError::SigDer);
    }
    if flags.contains(ScriptFlags::LOW_S) && !is_low_s(sig) {
        return Err(ScriptError::SigHighS);
    }
    Ok(())
}

fn check_raw_signature_encoding(sig: &[u8], flags: ScriptFlags) -> Result<(), ScriptError> {
    if is_schnorr_signature(sig) {
        return Ok(());
    }
    check_raw_ecdsa_signature_encoding(sig, flags)
}

fn check_sighash_encoding(hash_type: SigHashType, flags: ScriptFlags) -> Result<(), ScriptError> {
    if !flags.contains(ScriptFlags::STRICTENC) {
        return Ok(());
    }
    if !hash_type.is_defined() {
        return Err(ScriptError::SigHashType);
    }
    match (hash_type.has_fork_id(), flags.contains(ScriptFlags::SIGHASH_FORKID)) {
        (true, false) => Err(ScriptError::IllegalForkId),
        (false, true) => Err(ScriptError::MustUseForkId),
        _ => Ok(()),
    }
}

fn check_transaction_signature_with(
    sig: &[u8],
    flags: ScriptFlags,
    check_raw: impl FnOnce(&[u8], ScriptFlags) -> Result<(), ScriptError>,
) -> Result<(), ScriptError> {
    // The empty signature is the canonical way to fail a check on purpose
    let Some((&hash_type, raw)) = sig.split_last() else {
        return Ok(());
    };
    check_raw(raw, flags)?;
    check_sighash_encoding(SigHashType::from_u32(hash_type as u32), flags)
}

/// Rules for the signature operand of CHECKDATASIG, which has no hash type byte.
pub fn check_data_signature_encoding(sig: &[u8], flags: ScriptFlags) -> Result<(), ScriptError> {
    if sig.is_empty() {
        return Ok(());
    }
    check_raw_signature_encoding(sig, flags)
}

/// Rules for CHECKSIG, which accepts both signature schemes.
pub fn check_transaction_signature_encoding(sig: &[u8], flags: ScriptFlags) -> Result<(), ScriptError> {
    check_transaction_signature_with(sig, flags, check_raw_signature_encoding)
}

/// Rules for legacy CHECKMULTISIG, which only accepts ECDSA.
pub fn check_transaction_ecdsa_signature_encoding(sig: &[u8], flags: ScriptFlags) -> Result<(), ScriptError> {
    check_transaction_signature_with(sig, flags, |raw, flags| {
        if is_schnorr_signature(raw) {
            return Err(ScriptError::SigBadLength);
        }
        check_raw_ecdsa_signature_encoding(raw, flags)
    })
}

/// Rules for bitfield CHECKMULTISIG, which only accepts Schnorr.
pub fn check_transaction_schnorr_signature_encoding(sig: &[u8], flags: ScriptFlags) -> Result<(), ScriptError> {
    check_transaction_signature_with(sig, flags, |raw, _| match is_schnorr_signature(raw) {
        true => Ok(()),
        false => Err(ScriptError::SigNonSchnorr),
    })
}

/// Compressed (`02`/`03`, 33 bytes) or uncompressed (`04`, 65 bytes) SEC1 key.
pub fn is_compressed_or_uncompressed_pub_key(key: &[u8]) -> bool {
    match key.first() {
        Some(0x02 | 0x03) => key.len() == 33,
        Some(0x04) => key.len() == 65,
        _ => false,
    }
}

pub fn check_pub_key_encoding(key: &[u8], flags: ScriptFlags) -> Result<(), ScriptError> {
    if flags.contains(ScriptFlags::STRICTENC) && !is_compressed_or_uncompressed_pub_key(key) {
        return Err(ScriptError::PubkeyType);
    }
    Ok(())
}
