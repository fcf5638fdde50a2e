//! Reference (token) opcodes and the queries over the reference and code script
//! aggregates of a transaction.

use super::OpCodeResult;
use crate::context::ScriptExecutionContext;
use crate::data_stack::DataStack;
use crate::script::{REF_SIZE, RefId};
use crate::script_num::ScriptNum;
use crate::{MAX_SCRIPT_ELEMENT_SIZE, ScriptEngine, ScriptFlags};
use radiant_hashes::Hash;
use radiant_txscript_errors::ScriptError;
use std::collections::BTreeSet;

fn ensure_flag(vm: &ScriptEngine<'_>, flag: ScriptFlags) -> OpCodeResult {
    match vm.flags.contains(flag) {
        true => Ok(()),
        false => Err(ScriptError::BadOpcode),
    }
}

fn push_int(vm: &mut ScriptEngine<'_>, value: i64) -> OpCodeResult {
    vm.dstack.push_num(ScriptNum::from_int(value).ok_or(ScriptError::Unknown)?);
    Ok(())
}

fn pop_index(vm: &mut ScriptEngine<'_>) -> Result<i64, ScriptError> {
    let index = vm.top_num(-1)?.get_int64();
    vm.dstack.pop();
    Ok(index)
}

fn check_ref_operand(data: &[u8]) -> Result<[u8; REF_SIZE], ScriptError> {
    data.try_into().map_err(|_| ScriptError::InvalidTxRefSize)
}

/// The id a reference operand is recorded under. Before PUSH_TX_STATE the operand was
/// parsed as a hex string, which maps most operands to the zero id.
fn recorded_ref_id(operand: [u8; REF_SIZE], flags: ScriptFlags) -> RefId {
    match flags.contains(ScriptFlags::PUSH_TX_STATE) {
        true => RefId::from_bytes(operand),
        false => legacy_ref_id(&operand),
    }
}

/// Reads `operand` as a NUL terminated hex string: leading whitespace and an optional
/// `0x` prefix are skipped and the digits up to the first non hex byte fill the id from
/// its least significant byte.
pub(crate) fn legacy_ref_id(operand: &[u8]) -> RefId {
    let mut text = operand;
    while let [b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r', rest @ ..] = text {
        text = rest;
    }
    if let [b'0', b'x' | b'X', rest @ ..] = text {
        text = rest;
    }
    let digits: Vec<u8> = text.iter().map_while(|&c| (c as char).to_digit(16).map(|d| d as u8)).collect();

    let mut bytes = [0u8; REF_SIZE];
    for (byte, pair) in bytes.iter_mut().zip(digits.rchunks(2)) {
        *byte = match *pair {
            [high, low] => (high << 4) | low,
            [low] => low,
            _ => 0,
        };
    }
    RefId::from_bytes(bytes)
}

pub(super) fn op_push_input_ref(vm: &mut ScriptEngine<'_>, data: &[u8]) -> OpCodeResult {
    let operand = check_ref_operand(data)?;
    vm.dstack.push(data.to_vec());
    vm.found_push_refs.insert(recorded_ref_id(operand, vm.flags));
    Ok(())
}

pub(super) fn op_disallow_push_input_ref(vm: &mut ScriptEngine<'_>, data: &[u8]) -> OpCodeResult {
    let operand = check_ref_operand(data)?;
    vm.disallowed_refs.insert(recorded_ref_id(operand, vm.flags));
    vm.dstack.push(data.to_vec());
    Ok(())
}

/// REQUIREINPUTREF and DISALLOWPUSHINPUTREFSIBLING are enforced when transactions are
/// accepted, the interpreter only pushes their operand.
pub(super) fn op_push_ref_operand(vm: &mut ScriptEngine<'_>, data: &[u8]) -> OpCodeResult {
    check_ref_operand(data)?;
    vm.dstack.push(data.to_vec());
    Ok(())
}

pub(super) fn op_push_input_ref_singleton(vm: &mut ScriptEngine<'_>, data: &[u8]) -> OpCodeResult {
    ensure_flag(vm, ScriptFlags::ENHANCED_REFERENCES)?;
    op_push_ref_operand(vm, data)
}

pub(super) fn op_state_separator(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    ensure_flag(vm, ScriptFlags::ENHANCED_REFERENCES)
}

pub(super) fn op_state_separator_index_utxo(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    ensure_flag(vm, ScriptFlags::ENHANCED_REFERENCES)?;
    let ctx = vm.context()?;
    let index = ctx.check_utxo_index(pop_index(vm)?)?;
    let separator = ctx.state_separator_index_utxo(index).ok_or(ScriptError::InvalidTxInputIndex)?;
    push_int(vm, separator as i64)
}

pub(super) fn op_state_separator_index_output(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    ensure_flag(vm, ScriptFlags::ENHANCED_REFERENCES)?;
    let ctx = vm.context()?;
    let index = ctx.check_output_index(pop_index(vm)?)?;
    // Output indexes are compared against the input index here as well
    ctx.check_sibling(index)?;
    let separator = ctx.state_separator_index_output(index).ok_or(ScriptError::InvalidTxOutputIndex)?;
    push_int(vm, separator as i64)
}

pub(super) fn op_ref_hash_data_summary_utxo(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let ctx = vm.context()?;
    let index = ctx.check_utxo_index(pop_index(vm)?)?;
    let summary = ctx.ref_hash_data_summary_utxo(index).ok_or(ScriptError::InvalidTxInputIndex)?;
    vm.dstack.push(summary.as_slice().to_vec());
    Ok(())
}

pub(super) fn op_ref_hash_data_summary_output(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let ctx = vm.context()?;
    let index = ctx.check_output_index(pop_index(vm)?)?;
    let summary = ctx.ref_hash_data_summary_output(index).ok_or(ScriptError::InvalidTxOutputIndex)?;
    vm.dstack.push(summary.as_slice().to_vec());
    Ok(())
}

/// Total value of the coins (or outputs) whose sorted reference set hashes to the
/// 32 byte operand.
pub(super) fn op_ref_hash_value_sum(vm: &mut ScriptEngine<'_>, outputs: bool) -> OpCodeResult {
    if outputs {
        ensure_flag(vm, ScriptFlags::ENHANCED_REFERENCES)?;
    }
    let ctx = vm.context()?;
    let refs_hash = Hash::from_slice(vm.dstack.top(-1)?).ok_or(ScriptError::InvalidTxRefHashSize)?;
    vm.dstack.pop();

    let sum = match outputs {
        true => ctx.ref_hash_value_sum_outputs(&refs_hash),
        false => ctx.ref_hash_value_sum_utxos(&refs_hash),
    };
    push_int(vm, sum)
}

/// Replaces the reference id on top of the stack with `query(id)`.
///
/// Aggregates over coins do not fail in a limited context: sibling coins are
/// unknown there and contribute nothing.
pub(super) fn op_ref_query(vm: &mut ScriptEngine<'_>, query: impl FnOnce(&ScriptExecutionContext, &RefId) -> i64) -> OpCodeResult {
    let ctx = vm.context()?;
    let id = RefId::from_slice(vm.dstack.top(-1)?).ok_or(ScriptError::InvalidTxRefSize)?;
    vm.dstack.pop();
    push_int(vm, query(ctx, &id))
}

fn push_refs(vm: &mut ScriptEngine<'_>, refs: Option<&BTreeSet<RefId>>) -> OpCodeResult {
    match refs {
        Some(refs) if !refs.is_empty() => {
            vm.dstack.push(refs.iter().flat_map(|id| id.as_bytes().iter().copied()).collect());
            Ok(())
        }
        _ => push_int(vm, 0),
    }
}

/// The sorted references of a coin, concatenated.
pub(super) fn op_ref_data_summary_utxo(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let ctx = vm.context()?;
    let index = ctx.check_utxo_index(pop_index(vm)?)?;
    push_refs(vm, ctx.refs_per_utxo(index))
}

pub(super) fn op_ref_data_summary_output(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let ctx = vm.context()?;
    let index = ctx.check_output_index(pop_index(vm)?)?;
    push_refs(vm, ctx.refs_per_output(index))
}

/// Replaces the code script hash on top of the stack with `query(hash)`.
pub(super) fn op_code_script_hash_query(
    vm: &mut ScriptEngine<'_>,
    query: impl FnOnce(&ScriptExecutionContext, &Hash) -> i64,
) -> OpCodeResult {
    let ctx = vm.context()?;
    let hash = Hash::from_slice(vm.dstack.top(-1)?).ok_or(ScriptError::InvalidTxHashSize)?;
    vm.dstack.pop();
    push_int(vm, query(ctx, &hash))
}

/// Splits `script` at its state separator: the code part follows it, the state part
/// precedes it (the separator itself excluded).
fn split_at_separator(script: &[u8], separator: u32) -> Result<(&[u8], &[u8]), ScriptError> {
    if script.len() > MAX_SCRIPT_ELEMENT_SIZE {
        return Err(ScriptError::PushSize);
    }
    let separator = (separator as usize).min(script.len());
    let state = match separator {
        0 => &[][..],
        _ => &script[..separator - 1],
    };
    Ok((state, &script[separator..]))
}

fn utxo_script_parts(vm: &mut ScriptEngine<'_>) -> Result<(Vec<u8>, Vec<u8>), ScriptError> {
    let ctx = vm.context()?;
    let index = ctx.check_utxo_index(pop_index(vm)?)?;
    let script = ctx.coin_script_pub_key(index).ok_or(ScriptError::InvalidTxInputIndex)?;
    let separator = ctx.state_separator_index_utxo(index).unwrap_or_default();
    let (state, code) = split_at_separator(script, separator)?;
    Ok((state.to_vec(), code.to_vec()))
}

fn output_script_parts(vm: &mut ScriptEngine<'_>) -> Result<(Vec<u8>, Vec<u8>), ScriptError> {
    let ctx = vm.context()?;
    let index = ctx.check_output_index(pop_index(vm)?)?;
    let script = &ctx.tx().outputs[index].script_public_key;
    let separator = ctx.state_separator_index_output(index).unwrap_or_default();
    let (state, code) = split_at_separator(script, separator)?;
    Ok((state.to_vec(), code.to_vec()))
}

pub(super) fn op_code_script_bytecode_utxo(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let (_, code) = utxo_script_parts(vm)?;
    vm.dstack.push(code);
    Ok(())
}

pub(super) fn op_code_script_bytecode_output(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let (_, code) = output_script_parts(vm)?;
    vm.dstack.push(code);
    Ok(())
}

pub(super) fn op_state_script_bytecode_utxo(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    ensure_flag(vm, ScriptFlags::NATIVE_INTROSPECTION)?;
    let (state, _) = utxo_script_parts(vm)?;
    vm.dstack.push(state);
    Ok(())
}

pub(super) fn op_state_script_bytecode_output(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    ensure_flag(vm, ScriptFlags::NATIVE_INTROSPECTION)?;
    let (state, _) = output_script_parts(vm)?;
    vm.dstack.push(state);
    Ok(())
}

const TX_STATE_ID: i64 = 0;
const TX_STATE_INPUT_SUM: i64 = 1;
const TX_STATE_OUTPUT_SUM: i64 = 2;

/// Pushes one field of the transaction state: its id, the total value of the coins it
/// spends or the total value of its outputs.
pub(super) fn op_push_tx_state(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    ensure_flag(vm, ScriptFlags::PUSH_TX_STATE)?;
    let ctx = vm.context()?;
    let item = pop_index(vm)?;

    match item {
        TX_STATE_ID => {
            vm.dstack.push(ctx.tx_id().as_slice().to_vec());
            Ok(())
        }
        TX_STATE_INPUT_SUM => {
            let sum = (0..ctx.tx().inputs.len())
                .try_fold(0i64, |sum, i| sum.checked_add(ctx.coin_amount(i).unwrap_or_default()))
                .ok_or(ScriptError::Unknown)?;
            push_int(vm, sum)
        }
        TX_STATE_OUTPUT_SUM => {
            let sum = ctx.tx().outputs.iter().try_fold(0i64, |sum, output| sum.checked_add(output.value)).ok_or(ScriptError::Unknown)?;
            push_int(vm, sum)
        }
        _ => Err(ScriptError::InvalidTxStateItem),
    }
}
