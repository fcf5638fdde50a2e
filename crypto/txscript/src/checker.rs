use crate::caches::{SigCache, SigCacheKey};
use crate::context::ScriptExecutionContext;
use crate::script_num::ScriptNum;
use crate::sig_encoding::{SCHNORR_SIGNATURE_SIZE, is_schnorr_signature};
use crate::sighash::{PrecomputedTransactionData, signature_hash};
use crate::ScriptFlags;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, FieldElement, ProjectivePoint, Scalar, U256};
use radiant_consensus_core::hashing::sighash_type::SigHashType;
use radiant_consensus_core::tx::{
    LOCK_TIME_THRESHOLD, SEQUENCE_FINAL, SEQUENCE_LOCKTIME_DISABLE_FLAG, SEQUENCE_LOCKTIME_MASK, SEQUENCE_LOCKTIME_TYPE_FLAG,
    Transaction,
};
use radiant_hashes::{Hash, Hasher, HasherBase, Sha256Hasher};
use radiant_txscript_errors::ScriptError;

/// The capabilities the engine needs from its environment to check signatures and
/// time locks. The defaults reject everything, which is what scripts evaluated outside
/// of a transaction see.
pub trait SignatureChecker {
    /// Verifies `sig` (no hash type byte) over `sighash`. 64 byte signatures are
    /// Schnorr, everything else ECDSA.
    fn verify_signature(&self, sig: &[u8], pub_key: &[u8], sighash: &Hash) -> bool {
        verify_signature(sig, pub_key, sighash)
    }

    /// Checks a transaction signature, hash type byte included, against `script_code`.
    fn check_sig(&self, _sig: &[u8], _pub_key: &[u8], _script_code: &[u8], _flags: ScriptFlags) -> Result<bool, ScriptError> {
        Ok(false)
    }

    fn check_lock_time(&self, _lock_time: ScriptNum) -> bool {
        false
    }

    fn check_sequence(&self, _sequence: ScriptNum) -> bool {
        false
    }
}

/// A checker bound to no transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseSignatureChecker;

impl SignatureChecker for BaseSignatureChecker {}

/// Checks signatures and time locks of one input of a transaction.
#[derive(Clone)]
pub struct TransactionSignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    amount: i64,
    precomputed: Option<&'a PrecomputedTransactionData>,
    sig_cache: Option<&'a SigCache>,
}

impl<'a> TransactionSignatureChecker<'a> {
    /// `amount` is the value of the coin spent by the input.
    pub fn new(tx: &'a Transaction, input_index: usize, amount: i64) -> Self {
        Self { tx, input_index, amount, precomputed: None, sig_cache: None }
    }

    /// Binds to the transaction, input and coin of an execution context.
    pub fn from_context(context: &'a ScriptExecutionContext) -> Self {
        let input_index = context.input_index();
        Self::new(context.tx(), input_index, context.coin_amount(input_index).unwrap_or_default())
    }

    pub fn with_precomputed(mut self, precomputed: &'a PrecomputedTransactionData) -> Self {
        self.precomputed = Some(precomputed);
        self
    }

    pub fn with_sig_cache(mut self, sig_cache: &'a SigCache) -> Self {
        self.sig_cache = Some(sig_cache);
        self
    }
}

impl SignatureChecker for TransactionSignatureChecker<'_> {
    fn verify_signature(&self, sig: &[u8], pub_key: &[u8], sighash: &Hash) -> bool {
        let Some(cache) = self.sig_cache else {
            return verify_signature(sig, pub_key, sighash);
        };

        let key = SigCacheKey { signature: sig.to_vec(), pub_key: pub_key.to_vec(), message: *sighash };
        match cache.get(&key) {
            Some(valid) => valid,
            None => {
                let valid = verify_signature(sig, pub_key, sighash);
                cache.insert(key, valid);
                valid
            }
        }
    }

    fn check_sig(&self, sig: &[u8], pub_key: &[u8], script_code: &[u8], flags: ScriptFlags) -> Result<bool, ScriptError> {
        if !is_valid_pub_key(pub_key) {
            return Ok(false);
        }
        let Some((&hash_type, sig)) = sig.split_last() else {
            return Ok(false);
        };

        let hash_type = SigHashType::from_u32(hash_type as u32);
        let sighash = signature_hash(script_code, self.tx, self.input_index, hash_type, self.amount, self.precomputed, flags)?;
        Ok(self.verify_signature(sig, pub_key, &sighash))
    }

    fn check_lock_time(&self, lock_time: ScriptNum) -> bool {
        let tx_lock_time = self.tx.lock_time;
        let threshold = LOCK_TIME_THRESHOLD as i64;

        // Block heights only compare with block heights, timestamps with timestamps
        if (tx_lock_time < LOCK_TIME_THRESHOLD) != (lock_time < threshold) {
            return false;
        }
        if lock_time > tx_lock_time as i64 {
            return false;
        }

        // A final input would let the transaction in regardless of its lock time
        match self.tx.inputs.get(self.input_index) {
            Some(input) => input.sequence != SEQUENCE_FINAL,
            None => false,
        }
    }

    fn check_sequence(&self, sequence: ScriptNum) -> bool {
        let Some(input) = self.tx.inputs.get(self.input_index) else {
            return false;
        };
        let tx_sequence = input.sequence as i64;

        // Relative lock times need version 2 or above
        if (self.tx.version as u32) < 2 {
            return false;
        }
        if tx_sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG as i64 != 0 {
            return false;
        }

        let mask = (SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK) as i64;
        let tx_sequence_masked = tx_sequence & mask;
        let Some(sequence_masked) = sequence.safe_bitwise_and(ScriptNum::from_int_unchecked(mask)) else {
            return false;
        };

        let type_flag = SEQUENCE_LOCKTIME_TYPE_FLAG as i64;
        if (tx_sequence_masked < type_flag) != (sequence_masked < type_flag) {
            return false;
        }
        sequence_masked <= tx_sequence_masked
    }
}

/// The length implied by the SEC1 prefix must match. Hybrid keys (`06`/`07`) count
/// as valid.
pub fn is_valid_pub_key(key: &[u8]) -> bool {
    let expected = match key.first() {
        Some(0x02 | 0x03) => 33,
        Some(0x04 | 0x06 | 0x07) => 65,
        _ => return false,
    };
    key.len() == expected
}

pub fn verify_signature(sig: &[u8], pub_key: &[u8], sighash: &Hash) -> bool {
    match is_schnorr_signature(sig) {
        true => verify_schnorr(sig, pub_key, sighash),
        false => verify_ecdsa(sig, pub_key, sighash),
    }
}

/// ECDSA over secp256k1. The signature is parsed leniently and its S normalized, the
/// strict encoding rules are enforced by the engine beforehand when enabled.
pub fn verify_ecdsa(sig: &[u8], pub_key: &[u8], sighash: &Hash) -> bool {
    if !is_valid_pub_key(pub_key) || sig.is_empty() {
        return false;
    }
    let Ok(key) = secp256k1::PublicKey::from_slice(pub_key) else {
        return false;
    };
    let Ok(mut sig) = secp256k1::ecdsa::Signature::from_der_lax(sig) else {
        return false;
    };
    sig.normalize_s();

    let msg = secp256k1::Message::from_digest(sighash.as_bytes());
    sig.verify(&msg, &key).is_ok()
}

/// Schnorr as used by Bitcoin Cash: `sig = r ‖ s`, `e = sha256(r ‖ P ‖ m)` with P
/// compressed, and `R = sG - eP` must have a square y coordinate and `R.x == r`.
pub fn verify_schnorr(sig: &[u8], pub_key: &[u8], sighash: &Hash) -> bool {
    if sig.len() != SCHNORR_SIGNATURE_SIZE || !is_valid_pub_key(pub_key) {
        return false;
    }
    let Ok(key) = secp256k1::PublicKey::from_slice(pub_key) else {
        return false;
    };
    let compressed = key.serialize();
    let Ok(point) = k256::PublicKey::from_sec1_bytes(&compressed) else {
        return false;
    };

    let (r, s) = sig.split_at(32);
    // r must be a field element, s a scalar
    if bool::from(FieldElement::from_bytes(&FieldBytes::clone_from_slice(r)).is_none()) {
        return false;
    }
    let Some(s) = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(s))) else {
        return false;
    };

    let e = schnorr_challenge(r, &compressed, sighash);
    let big_r = (ProjectivePoint::GENERATOR * s - point.to_projective() * e).to_affine().to_encoded_point(false);
    let (Some(x), Some(y)) = (big_r.x(), big_r.y()) else {
        // Point at infinity
        return false;
    };
    has_square_y(y) && x.as_slice() == r
}

fn schnorr_challenge(r: &[u8], compressed_pub_key: &[u8], sighash: &Hash) -> Scalar {
    let mut hasher = Sha256Hasher::default();
    hasher.update(r).update(compressed_pub_key).update(sighash);
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(hasher.finalize().as_bytes()))
}

fn has_square_y(y: &FieldBytes) -> bool {
    Option::<FieldElement>::from(FieldElement::from_bytes(y)).is_some_and(|y| bool::from(y.sqrt().is_some()))
}
