#[macro_use]
mod macros;

mod arithmetic;
mod bitwise;
mod crypto;
mod introspection;
mod references;
mod stack;

use crate::data_stack::{DataStack, cast_to_bool};
use crate::script::ParsedOpcode;
use crate::script_num::ScriptNum;
use crate::{ScriptEngine, ScriptFlags};
use radiant_txscript_errors::ScriptError;

/// First value in the range formed by the "small integer" Op# opcodes
pub const OP_SMALL_INT_MIN_VAL: u8 = 1;
/// Last value in the range formed by the "small integer" Op# opcodes
pub const OP_SMALL_INT_MAX_VAL: u8 = 16;
/// First value in the range formed by OpData# opcodes (where opcode == value)
pub const OP_DATA_MIN_VAL: u8 = self::codes::OpData1;
/// Last value in the range formed by OpData# opcodes (where opcode == value)
pub const OP_DATA_MAX_VAL: u8 = self::codes::OpData75;

pub(crate) type OpCodeResult = Result<(), ScriptError>;

/// Operand layout of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeLength {
    /// Total instruction length, opcode byte included.
    Fixed(usize),
    /// Width in bytes of the little endian length prefix that follows the opcode.
    Prefixed(usize),
}

/// Opcodes rejected with [`ScriptError::DisabledOpcode`] wherever they appear,
/// executed branch or not.
pub fn is_opcode_disabled(opcode: u8, flags: ScriptFlags) -> bool {
    use codes::*;
    match opcode {
        Op2Mul | Op2Div | OpLShift | OpRShift => true,
        OpRefHashDataSummaryOutput
        | OpRefHashValueSumOutputs
        | OpPushInputRefSingleton
        | OpRefTypeUtxo
        | OpRefTypeOutput
        | OpStateSeparator
        | OpStateSeparatorIndexUtxo
        | OpStateSeparatorIndexOutput
        | OpRefValueSumUtxos
        | OpRefValueSumOutputs
        | OpRefOutputCountUtxos
        | OpRefOutputCountOutputs
        | OpRefOutputCountZeroValuedUtxos
        | OpRefOutputCountZeroValuedOutputs
        | OpRefDataSummaryUtxo
        | OpRefDataSummaryOutput
        | OpCodeScriptHashValueSumUtxos
        | OpCodeScriptHashValueSumOutputs
        | OpCodeScriptHashOutputCountUtxos
        | OpCodeScriptHashOutputCountOutputs
        | OpCodeScriptHashZeroValuedOutputCountUtxos
        | OpCodeScriptHashZeroValuedOutputCountOutputs
        | OpCodeScriptBytecodeUtxo
        | OpCodeScriptBytecodeOutput
        | OpStateScriptBytecodeUtxo
        | OpStateScriptBytecodeOutput => !flags.contains(ScriptFlags::ENHANCED_REFERENCES),
        OpPushTxState => !flags.contains(ScriptFlags::PUSH_TX_STATE),
        _ => false,
    }
}

/// IF, NOTIF, VERIF, VERNOTIF, ELSE and ENDIF run even inside a branch that is not taken.
#[inline]
pub fn is_conditional(opcode: u8) -> bool {
    (codes::OpIf..=codes::OpEndIf).contains(&opcode)
}

// Helpers for some opcodes with shared data
#[inline]
fn push_data(data: &[u8], vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    vm.dstack.push(data.to_vec());
    Ok(())
}

#[inline]
fn push_number(number: i64, vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    vm.dstack.push_num(ScriptNum::from_int_unchecked(number));
    Ok(())
}

#[inline]
fn upgradable_nop(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    match vm.flags.contains(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
        true => Err(ScriptError::DiscourageUpgradableNops),
        false => Ok(()),
    }
}

fn op_if(vm: &mut ScriptEngine<'_>, negate: bool) -> OpCodeResult {
    let mut value = false;
    if vm.is_executing() {
        let top = vm.dstack.last().ok_or(ScriptError::UnbalancedConditional)?;
        if vm.flags.contains(ScriptFlags::MINIMALIF) && (top.len() > 1 || (top.len() == 1 && top[0] != 1)) {
            return Err(ScriptError::MinimalIf);
        }
        value = cast_to_bool(top) != negate;
        vm.dstack.pop();
    }
    vm.cond_stack.push_back(value);
    Ok(())
}

fn op_verify(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    match cast_to_bool(vm.dstack.top(-1)?) {
        true => {
            vm.dstack.pop();
            Ok(())
        }
        false => Err(ScriptError::Verify),
    }
}

fn op_return(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    match vm.dstack.is_empty() {
        true => {
            vm.returned_early = true;
            Ok(())
        }
        false => Err(ScriptError::OpReturn),
    }
}

/*
Every byte value is listed below together with its operand layout and execution code.

```
opcode OpCodeName<value, length>(op, vm) expression
opcode |OpCodeAlias| OpCodeName<value, length>(op, vm) expression
```

A numeric length is the full instruction length (the opcode byte included), `u8`, `u16`
and `u32` denote a length prefixed operand. `op` is the parsed instruction and `vm` the
running engine. Push opcodes are listed for their names and layout, the engine pushes
their operand itself.

Implementation details in `opcodes/macros.rs`.
*/
opcode_list! {

    // Data push opcodes.
    opcode |Op0| OpFalse<0x00, 1>(op, vm) push_data(op.data, vm)

    opcode OpData1<0x01, 2>(op, vm) push_data(op.data, vm)
    opcode OpData2<0x02, 3>(op, vm) push_data(op.data, vm)
    opcode OpData3<0x03, 4>(op, vm) push_data(op.data, vm)
    opcode OpData4<0x04, 5>(op, vm) push_data(op.data, vm)
    opcode OpData5<0x05, 6>(op, vm) push_data(op.data, vm)
    opcode OpData6<0x06, 7>(op, vm) push_data(op.data, vm)
    opcode OpData7<0x07, 8>(op, vm) push_data(op.data, vm)
    opcode OpData8<0x08, 9>(op, vm) push_data(op.data, vm)
    opcode OpData9<0x09, 10>(op, vm) push_data(op.data, vm)
    opcode OpData10<0x0a, 11>(op, vm) push_data(op.data, vm)
    opcode OpData11<0x0b, 12>(op, vm) push_data(op.data, vm)
    opcode OpData12<0x0c, 13>(op, vm) push_data(op.data, vm)
    opcode OpData13<0x0d, 14>(op, vm) push_data(op.data, vm)
    opcode OpData14<0x0e, 15>(op, vm) push_data(op.data, vm)
    opcode OpData15<0x0f, 16>(op, vm) push_data(op.data, vm)
    opcode OpData16<0x10, 17>(op, vm) push_data(op.data, vm)
    opcode OpData17<0x11, 18>(op, vm) push_data(op.data, vm)
    opcode OpData18<0x12, 19>(op, vm) push_data(op.data, vm)
    opcode OpData19<0x13, 20>(op, vm) push_data(op.data, vm)
    opcode OpData20<0x14, 21>(op, vm) push_data(op.data, vm)
    opcode OpData21<0x15, 22>(op, vm) push_data(op.data, vm)
    opcode OpData22<0x16, 23>(op, vm) push_data(op.data, vm)
    opcode OpData23<0x17, 24>(op, vm) push_data(op.data, vm)
    opcode OpData24<0x18, 25>(op, vm) push_data(op.data, vm)
    opcode OpData25<0x19, 26>(op, vm) push_data(op.data, vm)
    opcode OpData26<0x1a, 27>(op, vm) push_data(op.data, vm)
    opcode OpData27<0x1b, 28>(op, vm) push_data(op.data, vm)
    opcode OpData28<0x1c, 29>(op, vm) push_data(op.data, vm)
    opcode OpData29<0x1d, 30>(op, vm) push_data(op.data, vm)
    opcode OpData30<0x1e, 31>(op, vm) push_data(op.data, vm)
    opcode OpData31<0x1f, 32>(op, vm) push_data(op.data, vm)
    opcode OpData32<0x20, 33>(op, vm) push_data(op.data, vm)
    opcode OpData33<0x21, 34>(op, vm) push_data(op.data, vm)
    opcode OpData34<0x22, 35>(op, vm) push_data(op.data, vm)
    opcode OpData35<0x23, 36>(op, vm) push_data(op.data, vm)
    opcode OpData36<0x24, 37>(op, vm) push_data(op.data, vm)
    opcode OpData37<0x25, 38>(op, vm) push_data(op.data, vm)
    opcode OpData38<0x26, 39>(op, vm) push_data(op.data, vm)
    opcode OpData39<0x27, 40>(op, vm) push_data(op.data, vm)
    opcode OpData40<0x28, 41>(op, vm) push_data(op.data, vm)
    opcode OpData41<0x29, 42>(op, vm) push_data(op.data, vm)
    opcode OpData42<0x2a, 43>(op, vm) push_data(op.data, vm)
    opcode OpData43<0x2b, 44>(op, vm) push_data(op.data, vm)
    opcode OpData44<0x2c, 45>(op, vm) push_data(op.data, vm)
    opcode OpData45<0x2d, 46>(op, vm) push_data(op.data, vm)
    opcode OpData46<0x2e, 47>(op, vm) push_data(op.data, vm)
    opcode OpData47<0x2f, 48>(op, vm) push_data(op.data, vm)
    opcode OpData48<0x30, 49>(op, vm) push_data(op.data, vm)
    opcode OpData49<0x31, 50>(op, vm) push_data(op.data, vm)
    opcode OpData50<0x32, 51>(op, vm) push_data(op.data, vm)
    opcode OpData51<0x33, 52>(op, vm) push_data(op.data, vm)
    opcode OpData52<0x34, 53>(op, vm) push_data(op.data, vm)
    opcode OpData53<0x35, 54>(op, vm) push_data(op.data, vm)
    opcode OpData54<0x36, 55>(op, vm) push_data(op.data, vm)
    opcode OpData55<0x37, 56>(op, vm) push_data(op.data, vm)
    opcode OpData56<0x38, 57>(op, vm) push_data(op.data, vm)
    opcode OpData57<0x39, 58>(op, vm) push_data(op.data, vm)
    opcode OpData58<0x3a, 59>(op, vm) push_data(op.data, vm)
    opcode OpData59<0x3b, 60>(op, vm) push_data(op.data, vm)
    opcode OpData60<0x3c, 61>(op, vm) push_data(op.data, vm)
    opcode OpData61<0x3d, 62>(op, vm) push_data(op.data, vm)
    opcode OpData62<0x3e, 63>(op, vm) push_data(op.data, vm)
    opcode OpData63<0x3f, 64>(op, vm) push_data(op.data, vm)
    opcode OpData64<0x40, 65>(op, vm) push_data(op.data, vm)
    opcode OpData65<0x41, 66>(op, vm) push_data(op.data, vm)
    opcode OpData66<0x42, 67>(op, vm) push_data(op.data, vm)
    opcode OpData67<0x43, 68>(op, vm) push_data(op.data, vm)
    opcode OpData68<0x44, 69>(op, vm) push_data(op.data, vm)
    opcode OpData69<0x45, 70>(op, vm) push_data(op.data, vm)
    opcode OpData70<0x46, 71>(op, vm) push_data(op.data, vm)
    opcode OpData71<0x47, 72>(op, vm) push_data(op.data, vm)
    opcode OpData72<0x48, 73>(op, vm) push_data(op.data, vm)
    opcode OpData73<0x49, 74>(op, vm) push_data(op.data, vm)
    opcode OpData74<0x4a, 75>(op, vm) push_data(op.data, vm)
    opcode OpData75<0x4b, 76>(op, vm) push_data(op.data, vm)
    opcode OpPushData1<0x4c, u8>(op, vm) push_data(op.data, vm)
    opcode OpPushData2<0x4d, u16>(op, vm) push_data(op.data, vm)
    opcode OpPushData4<0x4e, u32>(op, vm) push_data(op.data, vm)

    opcode Op1Negate<0x4f, 1>(op, vm) push_number(-1, vm)

    opcode OpReserved<0x50, 1>(op, vm) Err(ScriptError::BadOpcode)

    opcode |Op1| OpTrue<0x51, 1>(op, vm) push_number(1, vm)
    opcode Op2<0x52, 1>(op, vm) push_number(2, vm)
    opcode Op3<0x53, 1>(op, vm) push_number(3, vm)
    opcode Op4<0x54, 1>(op, vm) push_number(4, vm)
    opcode Op5<0x55, 1>(op, vm) push_number(5, vm)
    opcode Op6<0x56, 1>(op, vm) push_number(6, vm)
    opcode Op7<0x57, 1>(op, vm) push_number(7, vm)
    opcode Op8<0x58, 1>(op, vm) push_number(8, vm)
    opcode Op9<0x59, 1>(op, vm) push_number(9, vm)
    opcode Op10<0x5a, 1>(op, vm) push_number(10, vm)
    opcode Op11<0x5b, 1>(op, vm) push_number(11, vm)
    opcode Op12<0x5c, 1>(op, vm) push_number(12, vm)
    opcode Op13<0x5d, 1>(op, vm) push_number(13, vm)
    opcode Op14<0x5e, 1>(op, vm) push_number(14, vm)
    opcode Op15<0x5f, 1>(op, vm) push_number(15, vm)
    opcode Op16<0x60, 1>(op, vm) push_number(16, vm)

    // Control opcodes.
    opcode OpNop<0x61, 1>(op, vm) Ok(())
    opcode OpVer<0x62, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpIf<0x63, 1>(op, vm) op_if(vm, false)
    opcode OpNotIf<0x64, 1>(op, vm) op_if(vm, true)
    opcode OpVerIf<0x65, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpVerNotIf<0x66, 1>(op, vm) Err(ScriptError::BadOpcode)

    opcode OpElse<0x67, 1>(op, vm) {
        if vm.cond_stack.is_empty() {
            return Err(ScriptError::UnbalancedConditional);
        }
        vm.cond_stack.toggle_top();
        Ok(())
    }

    opcode OpEndIf<0x68, 1>(op, vm) {
        if vm.cond_stack.is_empty() {
            return Err(ScriptError::UnbalancedConditional);
        }
        vm.cond_stack.pop_back();
        Ok(())
    }

    opcode OpVerify<0x69, 1>(op, vm) op_verify(vm)
    opcode OpReturn<0x6a, 1>(op, vm) op_return(vm)

    // Stack opcodes.
    opcode OpToAltStack<0x6b, 1>(op, vm) {
        let item = vm.dstack.pop_item()?;
        vm.astack.push(item);
        Ok(())
    }

    opcode OpFromAltStack<0x6c, 1>(op, vm) {
        let item = vm.astack.pop().ok_or(ScriptError::InvalidAltstackOperation)?;
        vm.dstack.push(item);
        Ok(())
    }

    opcode Op2Drop<0x6d, 1>(op, vm) vm.dstack.drop_items::<2>()
    opcode Op2Dup<0x6e, 1>(op, vm) vm.dstack.dup_items::<2>()
    opcode Op3Dup<0x6f, 1>(op, vm) vm.dstack.dup_items::<3>()
    opcode Op2Over<0x70, 1>(op, vm) vm.dstack.over_items::<2>()
    opcode Op2Rot<0x71, 1>(op, vm) vm.dstack.rot_items::<2>()
    opcode Op2Swap<0x72, 1>(op, vm) vm.dstack.swap_items::<2>()
    opcode OpIfDup<0x73, 1>(op, vm) stack::op_ifdup(vm)
    opcode OpDepth<0x74, 1>(op, vm) push_number(vm.dstack.len() as i64, vm)
    opcode OpDrop<0x75, 1>(op, vm) vm.dstack.drop_items::<1>()
    opcode OpDup<0x76, 1>(op, vm) vm.dstack.dup_items::<1>()
    opcode OpNip<0x77, 1>(op, vm) stack::op_nip(vm)
    opcode OpOver<0x78, 1>(op, vm) vm.dstack.over_items::<1>()
    opcode OpPick<0x79, 1>(op, vm) stack::op_pick_roll(vm, false)
    opcode OpRoll<0x7a, 1>(op, vm) stack::op_pick_roll(vm, true)
    opcode OpRot<0x7b, 1>(op, vm) vm.dstack.rot_items::<1>()
    opcode OpSwap<0x7c, 1>(op, vm) vm.dstack.swap_items::<1>()
    opcode OpTuck<0x7d, 1>(op, vm) stack::op_tuck(vm)

    // Splice opcodes.
    opcode OpCat<0x7e, 1>(op, vm) bitwise::op_cat(vm)
    opcode OpSplit<0x7f, 1>(op, vm) bitwise::op_split(vm)
    opcode OpNum2Bin<0x80, 1>(op, vm) arithmetic::op_num2bin(vm)
    opcode OpBin2Num<0x81, 1>(op, vm) arithmetic::op_bin2num(vm)
    opcode OpSize<0x82, 1>(op, vm) stack::op_size(vm)

    // Bitwise logic opcodes.
    opcode OpInvert<0x83, 1>(op, vm) bitwise::op_invert(vm)
    opcode OpAnd<0x84, 1>(op, vm) bitwise::op_bitwise(vm, |a, b| a & b)
    opcode OpOr<0x85, 1>(op, vm) bitwise::op_bitwise(vm, |a, b| a | b)
    opcode OpXor<0x86, 1>(op, vm) bitwise::op_bitwise(vm, |a, b| a ^ b)
    opcode OpEqual<0x87, 1>(op, vm) bitwise::op_equal(vm, false)
    opcode OpEqualVerify<0x88, 1>(op, vm) bitwise::op_equal(vm, true)
    opcode OpReserved1<0x89, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpReserved2<0x8a, 1>(op, vm) Err(ScriptError::BadOpcode)

    // Numeric related opcodes.
    opcode Op1Add<0x8b, 1>(op, vm) arithmetic::op_unary(vm, |n| n.safe_add(ScriptNum::from_int_unchecked(1)))
    opcode Op1Sub<0x8c, 1>(op, vm) arithmetic::op_unary(vm, |n| n.safe_sub(ScriptNum::from_int_unchecked(1)))
    opcode Op2Mul<0x8d, 1>(op, vm) Err(ScriptError::DisabledOpcode)
    opcode Op2Div<0x8e, 1>(op, vm) Err(ScriptError::DisabledOpcode)
    opcode OpNegate<0x8f, 1>(op, vm) arithmetic::op_unary(vm, |n| Some(-n))
    opcode OpAbs<0x90, 1>(op, vm) arithmetic::op_unary(vm, |n| Some(if n < 0 { -n } else { n }))
    opcode OpNot<0x91, 1>(op, vm) arithmetic::op_unary(vm, |n| Some(ScriptNum::from_int_unchecked((n == 0) as i64)))
    opcode Op0NotEqual<0x92, 1>(op, vm) arithmetic::op_unary(vm, |n| Some(ScriptNum::from_int_unchecked((n != 0) as i64)))
    opcode OpAdd<0x93, 1>(op, vm) arithmetic::op_binary(vm, |a, b| a.safe_add(b).ok_or(ScriptError::InvalidNumberRange64Bit))
    opcode OpSub<0x94, 1>(op, vm) arithmetic::op_binary(vm, |a, b| a.safe_sub(b).ok_or(ScriptError::InvalidNumberRange64Bit))
    opcode OpMul<0x95, 1>(op, vm) arithmetic::op_binary(vm, |a, b| a.safe_mul(b).ok_or(ScriptError::InvalidNumberRange64Bit))
    opcode OpDiv<0x96, 1>(op, vm) arithmetic::op_binary(vm, |a, b| if b == 0 { Err(ScriptError::DivByZero) } else { Ok(a / b) })
    opcode OpMod<0x97, 1>(op, vm) arithmetic::op_binary(vm, |a, b| if b == 0 { Err(ScriptError::ModByZero) } else { Ok(a % b) })
    opcode OpLShift<0x98, 1>(op, vm) Err(ScriptError::DisabledOpcode)
    opcode OpRShift<0x99, 1>(op, vm) Err(ScriptError::DisabledOpcode)
    opcode OpBoolAnd<0x9a, 1>(op, vm) arithmetic::op_compare(vm, |a, b| a != 0 && b != 0)
    opcode OpBoolOr<0x9b, 1>(op, vm) arithmetic::op_compare(vm, |a, b| a != 0 || b != 0)
    opcode OpNumEqual<0x9c, 1>(op, vm) arithmetic::op_compare(vm, |a, b| a == b)
    opcode OpNumEqualVerify<0x9d, 1>(op, vm) arithmetic::op_num_equal_verify(vm)
    opcode OpNumNotEqual<0x9e, 1>(op, vm) arithmetic::op_compare(vm, |a, b| a != b)
    opcode OpLessThan<0x9f, 1>(op, vm) arithmetic::op_compare(vm, |a, b| a < b)
    opcode OpGreaterThan<0xa0, 1>(op, vm) arithmetic::op_compare(vm, |a, b| a > b)
    opcode OpLessThanOrEqual<0xa1, 1>(op, vm) arithmetic::op_compare(vm, |a, b| a <= b)
    opcode OpGreaterThanOrEqual<0xa2, 1>(op, vm) arithmetic::op_compare(vm, |a, b| a >= b)
    opcode OpMin<0xa3, 1>(op, vm) arithmetic::op_binary(vm, |a, b| Ok(a.min(b)))
    opcode OpMax<0xa4, 1>(op, vm) arithmetic::op_binary(vm, |a, b| Ok(a.max(b)))
    opcode OpWithin<0xa5, 1>(op, vm) arithmetic::op_within(vm)

    // Crypto opcodes.
    opcode OpRipemd160<0xa6, 1>(op, vm) crypto::op_hash(vm, |data| radiant_hashes::ripemd160(data).to_vec())
    opcode OpSha1<0xa7, 1>(op, vm) crypto::op_hash(vm, |data| radiant_hashes::sha1(data).to_vec())
    opcode OpSha256<0xa8, 1>(op, vm) crypto::op_hash(vm, |data| radiant_hashes::sha256(data).to_vec())
    opcode OpHash160<0xa9, 1>(op, vm) crypto::op_hash(vm, |data| radiant_hashes::hash160(data).to_vec())
    opcode OpHash256<0xaa, 1>(op, vm) crypto::op_hash(vm, |data| radiant_hashes::sha256d(data).to_vec())

    opcode OpCodeSeparator<0xab, 1>(op, vm) {
        vm.begin_code_hash = op.end;
        Ok(())
    }

    opcode OpCheckSig<0xac, 1>(op, vm) crypto::op_check_sig(vm, false)
    opcode OpCheckSigVerify<0xad, 1>(op, vm) crypto::op_check_sig(vm, true)
    opcode OpCheckMultiSig<0xae, 1>(op, vm) crypto::op_check_multisig(vm, false)
    opcode OpCheckMultiSigVerify<0xaf, 1>(op, vm) crypto::op_check_multisig(vm, true)

    // Expansion opcodes.
    opcode OpNop1<0xb0, 1>(op, vm) upgradable_nop(vm)
    opcode |OpNop2| OpCheckLockTimeVerify<0xb1, 1>(op, vm) arithmetic::op_check_lock_time_verify(vm)
    opcode |OpNop3| OpCheckSequenceVerify<0xb2, 1>(op, vm) arithmetic::op_check_sequence_verify(vm)
    opcode OpNop4<0xb3, 1>(op, vm) upgradable_nop(vm)
    opcode OpNop5<0xb4, 1>(op, vm) upgradable_nop(vm)
    opcode OpNop6<0xb5, 1>(op, vm) upgradable_nop(vm)
    opcode OpNop7<0xb6, 1>(op, vm) upgradable_nop(vm)
    opcode OpNop8<0xb7, 1>(op, vm) upgradable_nop(vm)
    opcode OpNop9<0xb8, 1>(op, vm) upgradable_nop(vm)
    opcode OpNop10<0xb9, 1>(op, vm) upgradable_nop(vm)

    opcode OpCheckDataSig<0xba, 1>(op, vm) crypto::op_check_data_sig(vm, false)
    opcode OpCheckDataSigVerify<0xbb, 1>(op, vm) crypto::op_check_data_sig(vm, true)

    opcode OpReverseBytes<0xbc, 1>(op, vm) bitwise::op_reverse_bytes(vm)

    // State separation opcodes.
    opcode OpStateSeparator<0xbd, 1>(op, vm) references::op_state_separator(vm)
    opcode OpStateSeparatorIndexUtxo<0xbe, 1>(op, vm) references::op_state_separator_index_utxo(vm)
    opcode OpStateSeparatorIndexOutput<0xbf, 1>(op, vm) references::op_state_separator_index_output(vm)

    // Native introspection opcodes.
    opcode OpInputIndex<0xc0, 1>(op, vm) introspection::op_nullary(vm, op.value)
    opcode OpActiveBytecode<0xc1, 1>(op, vm) introspection::op_nullary(vm, op.value)
    opcode OpTxVersion<0xc2, 1>(op, vm) introspection::op_nullary(vm, op.value)
    opcode OpTxInputCount<0xc3, 1>(op, vm) introspection::op_nullary(vm, op.value)
    opcode OpTxOutputCount<0xc4, 1>(op, vm) introspection::op_nullary(vm, op.value)
    opcode OpTxLockTime<0xc5, 1>(op, vm) introspection::op_nullary(vm, op.value)
    opcode OpUtxoValue<0xc6, 1>(op, vm) introspection::op_unary(vm, op.value)
    opcode OpUtxoBytecode<0xc7, 1>(op, vm) introspection::op_unary(vm, op.value)
    opcode OpOutpointTxHash<0xc8, 1>(op, vm) introspection::op_unary(vm, op.value)
    opcode OpOutpointIndex<0xc9, 1>(op, vm) introspection::op_unary(vm, op.value)
    opcode OpInputBytecode<0xca, 1>(op, vm) introspection::op_unary(vm, op.value)
    opcode OpInputSequenceNumber<0xcb, 1>(op, vm) introspection::op_unary(vm, op.value)
    opcode OpOutputValue<0xcc, 1>(op, vm) introspection::op_unary(vm, op.value)
    opcode OpOutputBytecode<0xcd, 1>(op, vm) introspection::op_unary(vm, op.value)

    opcode OpSha512_256<0xce, 1>(op, vm) crypto::op_hash(vm, |data| radiant_hashes::sha512_256(data).to_vec())
    opcode OpHash512_256<0xcf, 1>(op, vm) crypto::op_hash(vm, |data| radiant_hashes::hash512_256(data).to_vec())

    // Reference opcodes.
    opcode OpPushInputRef<0xd0, 37>(op, vm) references::op_push_input_ref(vm, op.data)
    opcode OpRequireInputRef<0xd1, 37>(op, vm) references::op_push_ref_operand(vm, op.data)
    opcode OpDisallowPushInputRef<0xd2, 37>(op, vm) references::op_disallow_push_input_ref(vm, op.data)
    opcode OpDisallowPushInputRefSibling<0xd3, 37>(op, vm) references::op_push_ref_operand(vm, op.data)
    opcode OpRefHashDataSummaryUtxo<0xd4, 1>(op, vm) references::op_ref_hash_data_summary_utxo(vm)
    opcode OpRefHashValueSumUtxos<0xd5, 1>(op, vm) references::op_ref_hash_value_sum(vm, false)
    opcode OpRefHashDataSummaryOutput<0xd6, 1>(op, vm) references::op_ref_hash_data_summary_output(vm)
    opcode OpRefHashValueSumOutputs<0xd7, 1>(op, vm) references::op_ref_hash_value_sum(vm, true)
    opcode OpPushInputRefSingleton<0xd8, 37>(op, vm) references::op_push_input_ref_singleton(vm, op.data)
    opcode OpRefTypeUtxo<0xd9, 1>(op, vm) references::op_ref_query(vm, |ctx, id| ctx.ref_type_utxo(id))
    opcode OpRefTypeOutput<0xda, 1>(op, vm) references::op_ref_query(vm, |ctx, id| ctx.ref_type_output(id))
    opcode OpRefValueSumUtxos<0xdb, 1>(op, vm) references::op_ref_query(vm, |ctx, id| ctx.ref_value_sum_utxos(id))
    opcode OpRefValueSumOutputs<0xdc, 1>(op, vm) references::op_ref_query(vm, |ctx, id| ctx.ref_value_sum_outputs(id))
    opcode OpRefOutputCountUtxos<0xdd, 1>(op, vm) references::op_ref_query(vm, |ctx, id| ctx.ref_output_count_utxos(id))
    opcode OpRefOutputCountOutputs<0xde, 1>(op, vm) references::op_ref_query(vm, |ctx, id| ctx.ref_output_count_outputs(id))
    opcode OpRefOutputCountZeroValuedUtxos<0xdf, 1>(op, vm) references::op_ref_query(vm, |ctx, id| ctx.ref_output_zero_valued_count_utxos(id))
    opcode OpRefOutputCountZeroValuedOutputs<0xe0, 1>(op, vm) references::op_ref_query(vm, |ctx, id| ctx.ref_output_zero_valued_count_outputs(id))
    opcode OpRefDataSummaryUtxo<0xe1, 1>(op, vm) references::op_ref_data_summary_utxo(vm)
    opcode OpRefDataSummaryOutput<0xe2, 1>(op, vm) references::op_ref_data_summary_output(vm)
    opcode OpCodeScriptHashValueSumUtxos<0xe3, 1>(op, vm) references::op_code_script_hash_query(vm, |ctx, h| ctx.code_script_hash_value_sum_utxos(h))
    opcode OpCodeScriptHashValueSumOutputs<0xe4, 1>(op, vm) references::op_code_script_hash_query(vm, |ctx, h| ctx.code_script_hash_value_sum_outputs(h))
    opcode OpCodeScriptHashOutputCountUtxos<0xe5, 1>(op, vm) references::op_code_script_hash_query(vm, |ctx, h| ctx.code_script_hash_output_count_utxos(h))
    opcode OpCodeScriptHashOutputCountOutputs<0xe6, 1>(op, vm) references::op_code_script_hash_query(vm, |ctx, h| ctx.code_script_hash_output_count_outputs(h))
    opcode OpCodeScriptHashZeroValuedOutputCountUtxos<0xe7, 1>(op, vm) references::op_code_script_hash_query(vm, |ctx, h| ctx.code_script_hash_zero_valued_output_count_utxos(h))
    opcode OpCodeScriptHashZeroValuedOutputCountOutputs<0xe8, 1>(op, vm) references::op_code_script_hash_query(vm, |ctx, h| ctx.code_script_hash_zero_valued_output_count_outputs(h))
    opcode OpCodeScriptBytecodeUtxo<0xe9, 1>(op, vm) references::op_code_script_bytecode_utxo(vm)
    opcode OpCodeScriptBytecodeOutput<0xea, 1>(op, vm) references::op_code_script_bytecode_output(vm)
    opcode OpStateScriptBytecodeUtxo<0xeb, 1>(op, vm) references::op_state_script_bytecode_utxo(vm)
    opcode OpStateScriptBytecodeOutput<0xec, 1>(op, vm) references::op_state_script_bytecode_output(vm)
    opcode OpPushTxState<0xed, 1>(op, vm) references::op_push_tx_state(vm)

    // Undefined opcodes.
    opcode OpUnknown238<0xee, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown239<0xef, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown240<0xf0, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown241<0xf1, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown242<0xf2, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown243<0xf3, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown244<0xf4, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown245<0xf5, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown246<0xf6, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown247<0xf7, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown248<0xf8, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown249<0xf9, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown250<0xfa, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown251<0xfb, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown252<0xfc, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown253<0xfd, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpUnknown254<0xfe, 1>(op, vm) Err(ScriptError::BadOpcode)
    opcode OpInvalidOpCode<0xff, 1>(op, vm) Err(ScriptError::BadOpcode)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::checker::{BaseSignatureChecker, SignatureChecker};
    use crate::context::ScriptExecutionContext;
    use crate::data_stack::Stack;
    use crate::ScriptExecutionMetrics;

    pub(crate) struct TestCase {
        pub init: Stack,
        pub code: u8,
        pub dstack: Stack,
    }

    pub(crate) struct ErrorTestCase {
        pub init: Stack,
        pub code: u8,
        pub error: ScriptError,
    }

    fn run(
        init: Stack,
        code: u8,
        data: &[u8],
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
        context: Option<&ScriptExecutionContext>,
    ) -> (OpCodeResult, Stack, ScriptExecutionMetrics) {
        let mut vm = ScriptEngine::new(init, flags, checker, context);
        let opcode = ParsedOpcode { value: code, data, offset: 0, end: 1 + data.len() };
        let result = execute(&opcode, &mut vm);
        (result, vm.dstack, vm.metrics)
    }

    /// Runs a single opcode outside of any script.
    pub(crate) fn run_opcode(
        init: Stack,
        code: u8,
        data: &[u8],
        flags: ScriptFlags,
        context: Option<&ScriptExecutionContext>,
    ) -> (OpCodeResult, Stack, ScriptExecutionMetrics) {
        run(init, code, data, flags, &BaseSignatureChecker, context)
    }

    pub(crate) fn run_with_checker(
        init: Stack,
        code: u8,
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
    ) -> (OpCodeResult, Stack, ScriptExecutionMetrics) {
        run(init, code, &[], flags, checker, None)
    }

    pub(crate) fn run_with_context(
        init: Stack,
        code: u8,
        flags: ScriptFlags,
        context: &ScriptExecutionContext,
    ) -> (OpCodeResult, Stack, ScriptExecutionMetrics) {
        run(init, code, &[], flags, &BaseSignatureChecker, Some(context))
    }

    pub(crate) fn run_test_cases(tests: Vec<TestCase>, flags: ScriptFlags) {
        for TestCase { init, code, dstack } in tests {
            let (result, stack, _) = run_opcode(init.clone(), code, &[], flags, None);
            assert_eq!(result, Ok(()), "{:?} failed on {:?}", opcode_name(code), init);
            assert_eq!(stack, dstack, "{:?} on {:?}", opcode_name(code), init);
        }
    }

    pub(crate) fn run_error_test_cases(tests: Vec<ErrorTestCase>, flags: ScriptFlags) {
        for ErrorTestCase { init, code, error } in tests {
            let (result, _, _) = run_opcode(init.clone(), code, &[], flags, None);
            assert_eq!(result, Err(error), "{:?} on {:?}", opcode_name(code), init);
        }
    }

    #[test]
    fn test_opcode_table() {
        struct TestCase {
            value: u8,
            name: &'static str,
            length: OpcodeLength,
        }

        let tests = [
            TestCase { value: 0x00, name: "OpFalse", length: OpcodeLength::Fixed(1) },
            TestCase { value: 0x14, name: "OpData20", length: OpcodeLength::Fixed(21) },
            TestCase { value: 0x4c, name: "OpPushData1", length: OpcodeLength::Prefixed(1) },
            TestCase { value: 0x4d, name: "OpPushData2", length: OpcodeLength::Prefixed(2) },
            TestCase { value: 0x4e, name: "OpPushData4", length: OpcodeLength::Prefixed(4) },
            TestCase { value: 0x51, name: "OpTrue", length: OpcodeLength::Fixed(1) },
            TestCase { value: 0xb1, name: "OpCheckLockTimeVerify", length: OpcodeLength::Fixed(1) },
            TestCase { value: 0xd0, name: "OpPushInputRef", length: OpcodeLength::Fixed(37) },
            TestCase { value: 0xd3, name: "OpDisallowPushInputRefSibling", length: OpcodeLength::Fixed(37) },
            TestCase { value: 0xd8, name: "OpPushInputRefSingleton", length: OpcodeLength::Fixed(37) },
            TestCase { value: 0xd9, name: "OpRefTypeUtxo", length: OpcodeLength::Fixed(1) },
            TestCase { value: 0xed, name: "OpPushTxState", length: OpcodeLength::Fixed(1) },
            TestCase { value: 0xff, name: "OpInvalidOpCode", length: OpcodeLength::Fixed(1) },
        ];

        for test in tests {
            assert_eq!(opcode_name(test.value), Some(test.name), "opcode {:#04x}", test.value);
            assert_eq!(opcode_length(test.value), test.length, "opcode {:#04x}", test.value);
        }
        assert!((0..=255u8).all(|value| opcode_name(value).is_some()));
        assert_eq!(codes::Op0, codes::OpFalse);
        assert_eq!(codes::OpNop2, codes::OpCheckLockTimeVerify);
    }

    #[test]
    fn test_disabled_opcodes() {
        for opcode in [codes::Op2Mul, codes::Op2Div, codes::OpLShift, codes::OpRShift] {
            assert!(is_opcode_disabled(opcode, ScriptFlags::all()));
        }
        assert!(is_opcode_disabled(codes::OpStateSeparator, ScriptFlags::NONE));
        assert!(!is_opcode_disabled(codes::OpStateSeparator, ScriptFlags::ENHANCED_REFERENCES));
        assert!(is_opcode_disabled(codes::OpPushTxState, ScriptFlags::ENHANCED_REFERENCES));
        assert!(!is_opcode_disabled(codes::OpPushTxState, ScriptFlags::PUSH_TX_STATE));
        // Always available regardless of flags
        assert!(!is_opcode_disabled(codes::OpPushInputRef, ScriptFlags::NONE));
        assert!(!is_opcode_disabled(codes::OpRefHashDataSummaryUtxo, ScriptFlags::NONE));
        assert!(!is_opcode_disabled(codes::OpMul, ScriptFlags::NONE));
    }
}
