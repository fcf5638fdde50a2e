use super::OpCodeResult;
use crate::bitfield::decode_bitfield;
use crate::data_stack::DataStack;
use crate::sig_encoding::{
    check_data_signature_encoding, check_pub_key_encoding, check_transaction_ecdsa_signature_encoding,
    check_transaction_schnorr_signature_encoding, check_transaction_signature_encoding,
};
use crate::{MAX_OPS_PER_SCRIPT, MAX_PUBKEYS_PER_MULTISIG, ScriptEngine, ScriptFlags};
use radiant_hashes::Hash;
use radiant_txscript_errors::ScriptError;

pub(super) fn op_hash(vm: &mut ScriptEngine<'_>, f: impl FnOnce(&[u8]) -> Vec<u8>) -> OpCodeResult {
    let top = vm.dstack.top_mut(-1)?;
    let digest = f(top);
    *top = digest;
    Ok(())
}

/// `sig pubkey -- bool`
pub(super) fn op_check_sig(vm: &mut ScriptEngine<'_>, verify: bool) -> OpCodeResult {
    let [sig, pub_key] = vm.dstack.peek_raw::<2>()?;
    check_transaction_signature_encoding(&sig, vm.flags)?;
    check_pub_key_encoding(&pub_key, vm.flags)?;

    let mut success = false;
    if !sig.is_empty() {
        success = vm.checker.check_sig(&sig, &pub_key, vm.script_code(), vm.flags)?;
        vm.metrics.sig_checks += 1;
        if !success && vm.flags.contains(ScriptFlags::NULLFAIL) {
            return Err(ScriptError::SigNullFail);
        }
    }

    vm.dstack.drop_items::<2>()?;
    push_result(vm, success, verify, ScriptError::CheckSigVerify)
}

/// `sig message pubkey -- bool`, the signature covers sha256(message).
pub(super) fn op_check_data_sig(vm: &mut ScriptEngine<'_>, verify: bool) -> OpCodeResult {
    let [sig, message, pub_key] = vm.dstack.peek_raw::<3>()?;
    check_data_signature_encoding(&sig, vm.flags)?;
    check_pub_key_encoding(&pub_key, vm.flags)?;

    let mut success = false;
    if !sig.is_empty() {
        let digest = Hash::from_bytes(radiant_hashes::sha256(&message));
        success = vm.checker.verify_signature(&sig, &pub_key, &digest);
        vm.metrics.sig_checks += 1;
        if !success && vm.flags.contains(ScriptFlags::NULLFAIL) {
            return Err(ScriptError::SigNullFail);
        }
    }

    vm.dstack.drop_items::<3>()?;
    push_result(vm, success, verify, ScriptError::CheckDataSigVerify)
}

/// `dummy sig_1 .. sig_m m pubkey_1 .. pubkey_n n -- bool`
///
/// A non empty dummy under SCHNORR_MULTISIG is a bitfield selecting which keys the
/// Schnorr signatures belong to. Otherwise signatures are ECDSA and matched greedily
/// against the keys in order.
pub(super) fn op_check_multisig(vm: &mut ScriptEngine<'_>, verify: bool) -> OpCodeResult {
    let idx_key_count = 1usize;
    let num_keys = vm.top_num(-1)?.get_int64();
    if !(0..=MAX_PUBKEYS_PER_MULTISIG as i64).contains(&num_keys) {
        return Err(ScriptError::PubkeyCount);
    }
    let num_keys = num_keys as usize;
    vm.num_ops += num_keys;
    if vm.num_ops > MAX_OPS_PER_SCRIPT {
        return Err(ScriptError::OpCount);
    }

    let idx_top_key = idx_key_count + 1;
    let idx_sig_count = idx_top_key + num_keys;
    if vm.dstack.len() < idx_sig_count {
        return Err(ScriptError::InvalidStackOperation);
    }
    let num_sigs = vm.top_num(-(idx_sig_count as isize))?.get_int64();
    if num_sigs < 0 || num_sigs > num_keys as i64 {
        return Err(ScriptError::SigCount);
    }
    let num_sigs = num_sigs as usize;

    let idx_top_sig = idx_sig_count + 1;
    let idx_dummy = idx_top_sig + num_sigs;
    if vm.dstack.len() < idx_dummy {
        return Err(ScriptError::InvalidStackOperation);
    }

    let at = |vm: &ScriptEngine<'_>, depth: usize| vm.dstack.top(-(depth as isize)).cloned();
    let script_code = vm.script_code();
    let mut success = true;

    let dummy = at(vm, idx_dummy)?;
    if vm.flags.contains(ScriptFlags::SCHNORR_MULTISIG) && !dummy.is_empty() {
        let check_bits = decode_bitfield(&dummy, num_keys)?;
        if check_bits.count_ones() as usize != num_sigs {
            return Err(ScriptError::InvalidBitCount);
        }

        // Signatures and keys are paired from the bottom up
        let idx_bottom_key = idx_top_key + num_keys - 1;
        let idx_bottom_sig = idx_top_sig + num_sigs - 1;
        let mut key = 0usize;
        for sig_index in 0..num_sigs {
            if check_bits >> key == 0 {
                return Err(ScriptError::InvalidBitRange);
            }
            while (check_bits >> key) & 0x01 == 0 {
                key += 1;
            }
            if key >= num_keys {
                return Err(ScriptError::PubkeyCount);
            }

            let sig = at(vm, idx_bottom_sig - sig_index)?;
            let pub_key = at(vm, idx_bottom_key - key)?;
            check_transaction_schnorr_signature_encoding(&sig, vm.flags)?;
            check_pub_key_encoding(&pub_key, vm.flags)?;
            if !vm.checker.check_sig(&sig, &pub_key, script_code, vm.flags)? {
                return Err(ScriptError::SigNullFail);
            }
            vm.metrics.sig_checks += 1;
            key += 1;
        }

        if check_bits >> key != 0 {
            return Err(ScriptError::InvalidBitCount);
        }
    } else {
        let mut sigs_remaining = num_sigs;
        let mut keys_remaining = num_keys;
        while success && sigs_remaining > 0 {
            let sig = at(vm, idx_top_sig + (num_sigs - sigs_remaining))?;
            let pub_key = at(vm, idx_top_key + (num_keys - keys_remaining))?;
            check_transaction_ecdsa_signature_encoding(&sig, vm.flags)?;
            check_pub_key_encoding(&pub_key, vm.flags)?;

            if vm.checker.check_sig(&sig, &pub_key, script_code, vm.flags)? {
                sigs_remaining -= 1;
            }
            keys_remaining -= 1;

            // More signatures left than keys to match them with
            if sigs_remaining > keys_remaining {
                success = false;
            }
        }

        let len = vm.dstack.len();
        let all_null = (0..num_sigs).all(|i| vm.dstack[len - idx_top_sig - i].is_empty());
        if !success && vm.flags.contains(ScriptFlags::NULLFAIL) && !all_null {
            return Err(ScriptError::SigNullFail);
        }
        if !all_null {
            vm.metrics.sig_checks += num_keys as u32;
        }
    }

    vm.dstack.truncate(vm.dstack.len() - idx_dummy);
    push_result(vm, success, verify, ScriptError::CheckMultiSigVerify)
}

fn push_result(vm: &mut ScriptEngine<'_>, success: bool, verify: bool, verify_error: ScriptError) -> OpCodeResult {
    match verify {
        true if success => Ok(()),
        true => Err(verify_error),
        false => {
            vm.dstack.push_bool(success);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::checker::test_signing::{compressed_pub_key, secret_key, sign_ecdsa, sign_schnorr, with_hash_type};
    use crate::checker::SignatureChecker;
    use crate::opcodes::codes;
    use crate::opcodes::tests::{ErrorTestCase, TestCase, run_error_test_cases, run_test_cases, run_with_checker};
    use crate::{ScriptExecutionMetrics, ScriptFlags};
    use radiant_consensus_core::hashing::sighash_type::SIG_HASH_ALL;
    use radiant_hashes::Hash;
    use radiant_txscript_errors::ScriptError;

    /// Accepts exactly the signatures made by `sign_schnorr`/`sign_ecdsa` over a fixed digest.
    struct FixedDigestChecker;

    impl FixedDigestChecker {
        const DIGEST: [u8; 32] = [7; 32];
    }

    impl SignatureChecker for FixedDigestChecker {
        fn check_sig(&self, sig: &[u8], pub_key: &[u8], _script_code: &[u8], _flags: ScriptFlags) -> Result<bool, ScriptError> {
            let Some((_, sig)) = sig.split_last() else { return Ok(false) };
            Ok(self.verify_signature(sig, pub_key, &Hash::from_bytes(Self::DIGEST)))
        }
    }

    fn schnorr_sig(seed: u8) -> Vec<u8> {
        with_hash_type(sign_schnorr(&secret_key(seed), &Hash::from_bytes(FixedDigestChecker::DIGEST)), SIG_HASH_ALL.with_fork_id(true))
    }

    fn ecdsa_sig(seed: u8) -> Vec<u8> {
        with_hash_type(sign_ecdsa(&secret_key(seed), &Hash::from_bytes(FixedDigestChecker::DIGEST)), SIG_HASH_ALL.with_fork_id(true))
    }

    fn key(seed: u8) -> Vec<u8> {
        compressed_pub_key(&secret_key(seed))
    }

    #[test]
    fn test_hash_opcodes() {
        let abc = b"abc".to_vec();
        run_test_cases(
            vec![
                TestCase {
                    init: vec![abc.clone()],
                    code: codes::OpSha256,
                    dstack: vec![
                        hex::decode("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad").expect("failed parsing hex"),
                    ],
                },
                TestCase {
                    init: vec![abc.clone()],
                    code: codes::OpRipemd160,
                    dstack: vec![hex::decode("8eb208f7e05d987a9b044a8e98c6b087f15a0bfc").expect("failed parsing hex")],
                },
                TestCase {
                    init: vec![abc.clone()],
                    code: codes::OpSha1,
                    dstack: vec![hex::decode("a9993e364706816aba3e25717850c26c9cd0d89d").expect("failed parsing hex")],
                },
                TestCase {
                    init: vec![abc],
                    code: codes::OpSha512_256,
                    dstack: vec![
                        hex::decode("53048e2681941ef99b2e29b76b4c7dabe4c2d0c634fc6d46e0e2f13107e7af23").expect("failed parsing hex"),
                    ],
                },
            ],
            ScriptFlags::NONE,
        );
        run_error_test_cases(
            vec![ErrorTestCase { init: vec![], code: codes::OpHash160, error: ScriptError::InvalidStackOperation }],
            ScriptFlags::NONE,
        );
    }

    #[test]
    fn test_check_sig_without_transaction() {
        // The base checker rejects every signature
        run_test_cases(
            vec![
                TestCase { init: vec![vec![], key(1)], code: codes::OpCheckSig, dstack: vec![vec![]] },
                TestCase { init: vec![schnorr_sig(1), key(1)], code: codes::OpCheckSig, dstack: vec![vec![]] },
            ],
            ScriptFlags::NONE,
        );
        run_error_test_cases(
            vec![
                ErrorTestCase { init: vec![key(1)], code: codes::OpCheckSig, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![schnorr_sig(1), key(1)], code: codes::OpCheckSig, error: ScriptError::SigNullFail },
                ErrorTestCase { init: vec![vec![], key(1)], code: codes::OpCheckSigVerify, error: ScriptError::CheckSigVerify },
                ErrorTestCase { init: vec![vec![], vec![5; 33]], code: codes::OpCheckSig, error: ScriptError::PubkeyType },
            ],
            ScriptFlags::NULLFAIL | ScriptFlags::STRICTENC | ScriptFlags::SIGHASH_FORKID,
        );
    }

    #[test]
    fn test_check_sig_metrics() {
        let flags = ScriptFlags::STRICTENC | ScriptFlags::SIGHASH_FORKID;
        let (result, stack, metrics) = run_with_checker(vec![schnorr_sig(1), key(1)], codes::OpCheckSig, flags, &FixedDigestChecker);
        assert_eq!(result, Ok(()));
        assert_eq!(stack, vec![vec![1]]);
        assert_eq!(metrics, ScriptExecutionMetrics { sig_checks: 1 });

        // Null signatures are not checked
        let (result, stack, metrics) = run_with_checker(vec![vec![], key(1)], codes::OpCheckSig, flags, &FixedDigestChecker);
        assert_eq!(result, Ok(()));
        assert_eq!(stack, vec![Vec::<u8>::new()]);
        assert_eq!(metrics, ScriptExecutionMetrics { sig_checks: 0 });
    }

    #[test]
    fn test_check_data_sig() {
        let message = b"radiant".to_vec();
        let digest = Hash::from_bytes(radiant_hashes::sha256(&message));
        let sig = sign_schnorr(&secret_key(3), &digest);
        let ecdsa = sign_ecdsa(&secret_key(3), &digest);

        run_test_cases(
            vec![
                TestCase { init: vec![sig.clone(), message.clone(), key(3)], code: codes::OpCheckDataSig, dstack: vec![vec![1]] },
                TestCase { init: vec![ecdsa, message.clone(), key(3)], code: codes::OpCheckDataSig, dstack: vec![vec![1]] },
                TestCase { init: vec![sig.clone(), message.clone(), key(4)], code: codes::OpCheckDataSig, dstack: vec![vec![]] },
                TestCase { init: vec![vec![], message.clone(), key(3)], code: codes::OpCheckDataSig, dstack: vec![vec![]] },
                TestCase { init: vec![sig.clone(), message.clone(), key(3)], code: codes::OpCheckDataSigVerify, dstack: vec![] },
            ],
            ScriptFlags::STRICTENC,
        );
        run_error_test_cases(
            vec![
                ErrorTestCase { init: vec![message.clone(), key(3)], code: codes::OpCheckDataSig, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![sig.clone(), b"other".to_vec(), key(3)], code: codes::OpCheckDataSig, error: ScriptError::SigNullFail },
                ErrorTestCase { init: vec![vec![], message, key(3)], code: codes::OpCheckDataSigVerify, error: ScriptError::CheckDataSigVerify },
            ],
            ScriptFlags::STRICTENC | ScriptFlags::NULLFAIL,
        );
    }

    #[test]
    fn test_legacy_multisig() {
        let flags = ScriptFlags::STRICTENC | ScriptFlags::SIGHASH_FORKID | ScriptFlags::NULLFAIL;

        // 1-of-2 where the signature matches the second key
        let init = vec![vec![], ecdsa_sig(2), vec![1], key(1), key(2), vec![2]];
        let (result, stack, metrics) = run_with_checker(init, codes::OpCheckMultiSig, flags, &FixedDigestChecker);
        assert_eq!(result, Ok(()));
        assert_eq!(stack, vec![vec![1]]);
        assert_eq!(metrics, ScriptExecutionMetrics { sig_checks: 2 });

        // Signatures out of key order cannot match
        let init = vec![vec![], ecdsa_sig(2), ecdsa_sig(1), vec![2], key(1), key(2), vec![2]];
        let (result, _, _) = run_with_checker(init, codes::OpCheckMultiSig, flags, &FixedDigestChecker);
        assert_eq!(result, Err(ScriptError::SigNullFail));

        // All null signatures fail without NULLFAIL and without sig checks
        let init = vec![vec![], vec![], vec![1], key(1), key(2), vec![2]];
        let (result, stack, metrics) = run_with_checker(init, codes::OpCheckMultiSig, flags, &FixedDigestChecker);
        assert_eq!(result, Ok(()));
        assert_eq!(stack, vec![Vec::<u8>::new()]);
        assert_eq!(metrics, ScriptExecutionMetrics { sig_checks: 0 });

        // 0-of-0
        let (result, stack, _) = run_with_checker(vec![vec![], vec![], vec![]], codes::OpCheckMultiSig, flags, &FixedDigestChecker);
        assert_eq!(result, Ok(()));
        assert_eq!(stack, vec![vec![1]]);
    }

    #[test]
    fn test_schnorr_multisig() {
        let flags = ScriptFlags::STRICTENC | ScriptFlags::SIGHASH_FORKID | ScriptFlags::NULLFAIL | ScriptFlags::SCHNORR_MULTISIG;

        // 2-of-3 using keys 0 and 2, bitfield 0b101
        let init = vec![vec![0b101], schnorr_sig(1), schnorr_sig(3), vec![2], key(1), key(2), key(3), vec![3]];
        let (result, stack, metrics) = run_with_checker(init, codes::OpCheckMultiSigVerify, flags, &FixedDigestChecker);
        assert_eq!(result, Ok(()));
        assert!(stack.is_empty());
        assert_eq!(metrics, ScriptExecutionMetrics { sig_checks: 2 });

        struct MultisigTestCase {
            name: &'static str,
            init: Vec<Vec<u8>>,
            error: ScriptError,
        }

        let tests = vec![
            MultisigTestCase {
                name: "bit count mismatch",
                init: vec![vec![0b111], schnorr_sig(1), schnorr_sig(3), vec![2], key(1), key(2), key(3), vec![3]],
                error: ScriptError::InvalidBitCount,
            },
            MultisigTestCase {
                name: "bit out of range",
                init: vec![vec![0b1001], schnorr_sig(1), schnorr_sig(3), vec![2], key(1), key(2), key(3), vec![3]],
                error: ScriptError::InvalidBitRange,
            },
            MultisigTestCase {
                name: "oversized bitfield",
                init: vec![vec![0b101, 0], schnorr_sig(1), schnorr_sig(3), vec![2], key(1), key(2), key(3), vec![3]],
                error: ScriptError::InvalidBitfieldSize,
            },
            MultisigTestCase {
                name: "wrong key selected",
                init: vec![vec![0b011], schnorr_sig(1), schnorr_sig(3), vec![2], key(1), key(2), key(3), vec![3]],
                error: ScriptError::SigNullFail,
            },
            MultisigTestCase {
                name: "ecdsa signature in schnorr mode",
                init: vec![vec![0b001], ecdsa_sig(1), vec![1], key(1), vec![1]],
                error: ScriptError::SigNonSchnorr,
            },
            MultisigTestCase {
                name: "schnorr signature in legacy mode",
                init: vec![vec![], schnorr_sig(1), vec![1], key(1), vec![1]],
                error: ScriptError::SigBadLength,
            },
            MultisigTestCase {
                name: "too many keys",
                init: vec![vec![], vec![], vec![21]],
                error: ScriptError::PubkeyCount,
            },
            MultisigTestCase {
                name: "more signatures than keys",
                init: vec![vec![], vec![], vec![2], key(1), vec![1]],
                error: ScriptError::SigCount,
            },
            MultisigTestCase {
                name: "missing dummy",
                init: vec![schnorr_sig(1), vec![1], key(1), vec![1]],
                error: ScriptError::InvalidStackOperation,
            },
        ];

        for test in tests {
            let (result, _, _) = run_with_checker(test.init, codes::OpCheckMultiSig, flags, &FixedDigestChecker);
            assert_eq!(result, Err(test.error), "{}", test.name);
        }
    }
}
