//! Native introspection: opcodes reading the transaction being verified and the coins
//! it spends.

use super::{OpCodeResult, codes};
use crate::data_stack::DataStack;
use crate::script_num::ScriptNum;
use crate::{MAX_SCRIPT_ELEMENT_SIZE, ScriptEngine, ScriptFlags};
use radiant_txscript_errors::ScriptError;

fn ensure_enabled(vm: &ScriptEngine<'_>) -> OpCodeResult {
    match vm.flags.contains(ScriptFlags::NATIVE_INTROSPECTION) {
        true => Ok(()),
        false => Err(ScriptError::BadOpcode),
    }
}

fn push_bytes(vm: &mut ScriptEngine<'_>, bytes: &[u8]) -> OpCodeResult {
    if bytes.len() > MAX_SCRIPT_ELEMENT_SIZE {
        return Err(ScriptError::PushSize);
    }
    vm.dstack.push(bytes.to_vec());
    Ok(())
}

fn push_int(vm: &mut ScriptEngine<'_>, value: i64) -> OpCodeResult {
    vm.dstack.push_num(ScriptNum::from_int(value).ok_or(ScriptError::Unknown)?);
    Ok(())
}

/// Opcodes taking no operand.
pub(super) fn op_nullary(vm: &mut ScriptEngine<'_>, opcode: u8) -> OpCodeResult {
    ensure_enabled(vm)?;
    let ctx = vm.context()?;
    let tx = ctx.tx();
    match opcode {
        codes::OpInputIndex => push_int(vm, ctx.input_index() as i64),
        codes::OpActiveBytecode => {
            let script_code = vm.script_code();
            push_bytes(vm, script_code)
        }
        codes::OpTxVersion => push_int(vm, tx.version as i64),
        codes::OpTxInputCount => push_int(vm, tx.inputs.len() as i64),
        codes::OpTxOutputCount => push_int(vm, tx.outputs.len() as i64),
        codes::OpTxLockTime => push_int(vm, tx.lock_time as i64),
        _ => Err(ScriptError::BadOpcode),
    }
}

/// Opcodes taking an input or output index from the top of the stack.
pub(super) fn op_unary(vm: &mut ScriptEngine<'_>, opcode: u8) -> OpCodeResult {
    ensure_enabled(vm)?;
    let ctx = vm.context()?;
    let index = vm.top_num(-1)?.get_int64();
    vm.dstack.pop();

    let tx = ctx.tx();
    match opcode {
        codes::OpUtxoValue => {
            let index = ctx.check_utxo_index(index)?;
            push_int(vm, ctx.coin_amount(index).ok_or(ScriptError::InvalidTxInputIndex)?)
        }
        codes::OpUtxoBytecode => {
            let index = ctx.check_utxo_index(index)?;
            push_bytes(vm, ctx.coin_script_pub_key(index).ok_or(ScriptError::InvalidTxInputIndex)?)
        }
        codes::OpOutpointTxHash => {
            let index = ctx.check_input_index(index)?;
            push_bytes(vm, tx.inputs[index].previous_outpoint.transaction_id.as_slice())
        }
        codes::OpOutpointIndex => {
            let index = ctx.check_input_index(index)?;
            push_int(vm, tx.inputs[index].previous_outpoint.index as i64)
        }
        codes::OpInputBytecode => {
            let index = ctx.check_input_index(index)?;
            push_bytes(vm, &tx.inputs[index].signature_script)
        }
        codes::OpInputSequenceNumber => {
            let index = ctx.check_input_index(index)?;
            push_int(vm, tx.inputs[index].sequence as i64)
        }
        codes::OpOutputValue => {
            let index = ctx.check_output_index(index)?;
            push_int(vm, tx.outputs[index].value)
        }
        codes::OpOutputBytecode => {
            let index = ctx.check_output_index(index)?;
            push_bytes(vm, &tx.outputs[index].script_public_key)
        }
        _ => Err(ScriptError::BadOpcode),
    }
}
