//! Spending check of one input: signature script, locking script and, for P2SH
//! outputs, the redeem script.

use crate::checker::SignatureChecker;
use crate::context::ScriptExecutionContext;
use crate::data_stack::cast_to_bool;
use crate::script::{is_pay_to_script_hash, is_push_only, is_witness_program};
use crate::{ScriptExecutionMetrics, ScriptFlags, eval_script};
use log::debug;
use radiant_txscript_errors::ScriptError;

/// Checks that `script_sig` satisfies `script_pub_key`.
///
/// Returns the metrics accumulated over every evaluated script. Metrics of a failed
/// verification are not reported.
pub fn verify_script(
    script_sig: &[u8],
    script_pub_key: &[u8],
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
    context: Option<&ScriptExecutionContext>,
) -> Result<ScriptExecutionMetrics, ScriptError> {
    let mut flags = flags;
    if flags.contains(ScriptFlags::SIGHASH_FORKID) {
        flags |= ScriptFlags::STRICTENC;
    }

    if flags.contains(ScriptFlags::SIGPUSHONLY) && !is_push_only(script_sig) {
        return Err(ScriptError::SigPushOnly);
    }

    let mut metrics = ScriptExecutionMetrics::default();
    let mut stack = Vec::new();
    eval_script(&mut stack, script_sig, flags, checker, &mut metrics, context)?;

    let p2sh = flags.contains(ScriptFlags::P2SH);
    let stack_copy = if p2sh { stack.clone() } else { Vec::new() };

    eval_script(&mut stack, script_pub_key, flags, checker, &mut metrics, context)?;
    check_top(&stack)?;

    if p2sh && is_pay_to_script_hash(script_pub_key) {
        // The redeem script is data, so the signature script must be pushes only
        if !is_push_only(script_sig) {
            return Err(ScriptError::SigPushOnly);
        }

        stack = stack_copy;
        // The hash check above consumed an element, so the copy cannot be empty
        let redeem_script = stack.pop().ok_or(ScriptError::EvalFalse)?;

        // Coins sent by mistake to a P2SH-wrapped segwit program stay spendable
        if !flags.contains(ScriptFlags::DISALLOW_SEGWIT_RECOVERY) && stack.is_empty() && is_witness_program(&redeem_script) {
            debug!("recovering P2SH segwit program {}", faster_hex::hex_string(&redeem_script));
            return Ok(metrics);
        }

        eval_script(&mut stack, &redeem_script, flags, checker, &mut metrics, context)?;
        check_top(&stack)?;
    }

    // Only meaningful once the redeem script has run, the P2SH inputs remain otherwise
    if flags.contains(ScriptFlags::CLEANSTACK) && stack.len() != 1 {
        return Err(ScriptError::CleanStack);
    }

    Ok(metrics)
}

fn check_top(stack: &[Vec<u8>]) -> Result<(), ScriptError> {
    match stack.last() {
        Some(top) if cast_to_bool(top) => Ok(()),
        _ => Err(ScriptError::EvalFalse),
    }
}
