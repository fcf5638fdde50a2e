use super::OpCodeResult;
use crate::data_stack::DataStack;
use crate::script_num::{LOCKTIME_INTEGER_SIZE, ScriptNum, is_minimally_encoded, minimally_encode};
use crate::{MAX_SCRIPT_ELEMENT_SIZE, ScriptEngine, ScriptFlags};
use radiant_consensus_core::tx::SEQUENCE_LOCKTIME_DISABLE_FLAG;
use radiant_txscript_errors::ScriptError;

pub(super) fn op_num2bin(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    if vm.dstack.len() < 2 {
        return Err(ScriptError::InvalidStackOperation);
    }
    // A negative size wraps around and fails the limit below
    let size = vm.top_num(-1)?.get_int64() as u64;
    if size > MAX_SCRIPT_ELEMENT_SIZE as u64 {
        return Err(ScriptError::PushSize);
    }
    let size = size as usize;

    vm.dstack.pop();
    let raw = vm.dstack.top_mut(-1)?;
    minimally_encode(raw);
    if raw.len() > size {
        return Err(ScriptError::ImpossibleEncoding);
    }
    if raw.len() == size {
        return Ok(());
    }

    let mut sign_bit = 0x00;
    if let Some(last) = raw.last_mut() {
        sign_bit = *last & 0x80;
        *last &= 0x7f;
    }
    raw.resize(size - 1, 0x00);
    raw.push(sign_bit);
    Ok(())
}

pub(super) fn op_bin2num(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let max_size = vm.flags.max_integer_size();
    let num_error = vm.num_error();
    let n = vm.dstack.top_mut(-1)?;
    minimally_encode(n);
    match is_minimally_encoded(n, max_size) {
        true => Ok(()),
        false => Err(num_error),
    }
}

/// Replaces the top number with `f(top)`. `None` is an out of range result.
pub(super) fn op_unary(vm: &mut ScriptEngine<'_>, f: impl FnOnce(ScriptNum) -> Option<ScriptNum>) -> OpCodeResult {
    let n = vm.top_num(-1)?;
    let result = f(n).ok_or(ScriptError::InvalidNumberRange64Bit)?;
    vm.dstack.pop();
    vm.dstack.push_num(result);
    Ok(())
}

/// Replaces the top two numbers `a b` with `f(a, b)`.
pub(super) fn op_binary(vm: &mut ScriptEngine<'_>, f: impl FnOnce(ScriptNum, ScriptNum) -> Result<ScriptNum, ScriptError>) -> OpCodeResult {
    let (a, b) = binary_operands(vm)?;
    let result = f(a, b)?;
    vm.dstack.drop_items::<2>()?;
    vm.dstack.push_num(result);
    Ok(())
}

pub(super) fn op_compare(vm: &mut ScriptEngine<'_>, f: impl FnOnce(ScriptNum, ScriptNum) -> bool) -> OpCodeResult {
    let (a, b) = binary_operands(vm)?;
    vm.dstack.drop_items::<2>()?;
    vm.dstack.push_bool(f(a, b));
    Ok(())
}

pub(super) fn op_num_equal_verify(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let (a, b) = binary_operands(vm)?;
    vm.dstack.drop_items::<2>()?;
    match a == b {
        true => Ok(()),
        false => Err(ScriptError::NumEqualVerify),
    }
}

fn binary_operands(vm: &ScriptEngine<'_>) -> Result<(ScriptNum, ScriptNum), ScriptError> {
    if vm.dstack.len() < 2 {
        return Err(ScriptError::InvalidStackOperation);
    }
    Ok((vm.top_num(-2)?, vm.top_num(-1)?))
}

/// `x min max -- (min <= x < max)`
pub(super) fn op_within(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    if vm.dstack.len() < 3 {
        return Err(ScriptError::InvalidStackOperation);
    }
    let x = vm.top_num(-3)?;
    let min = vm.top_num(-2)?;
    let max = vm.top_num(-1)?;
    vm.dstack.drop_items::<3>()?;
    vm.dstack.push_bool(min <= x && x < max);
    Ok(())
}

/// Decodes the lock time operand of CLTV or CSV, leaving it on the stack.
fn lock_time_operand(vm: &ScriptEngine<'_>) -> Result<ScriptNum, ScriptError> {
    let lock_time = vm.top_num_sized(-1, LOCKTIME_INTEGER_SIZE)?;
    match lock_time < 0 {
        true => Err(ScriptError::NegativeLocktime),
        false => Ok(lock_time),
    }
}

pub(super) fn op_check_lock_time_verify(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    if !vm.flags.contains(ScriptFlags::CHECKLOCKTIMEVERIFY) {
        return Ok(());
    }
    let lock_time = lock_time_operand(vm)?;
    match vm.checker.check_lock_time(lock_time) {
        true => Ok(()),
        false => Err(ScriptError::UnsatisfiedLocktime),
    }
}

pub(super) fn op_check_sequence_verify(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    if !vm.flags.contains(ScriptFlags::CHECKSEQUENCEVERIFY) {
        return Ok(());
    }
    let sequence = lock_time_operand(vm)?;

    // With the disable flag set the sequence is not a relative lock time
    let disabled = sequence
        .safe_bitwise_and(ScriptNum::from_int_unchecked(SEQUENCE_LOCKTIME_DISABLE_FLAG as i64))
        .ok_or(ScriptError::InvalidNumberRange64Bit)?;
    if disabled != 0 {
        return Ok(());
    }

    match vm.checker.check_sequence(sequence) {
        true => Ok(()),
        false => Err(ScriptError::UnsatisfiedLocktime),
    }
}

#[cfg(test)]
mod tests {
    use crate::opcodes::codes;
    use crate::opcodes::tests::{ErrorTestCase, TestCase, run_error_test_cases, run_test_cases};
    use crate::ScriptFlags;
    use radiant_txscript_errors::ScriptError;

    fn num(hex_str: &str) -> Vec<u8> {
        hex::decode(hex_str).expect("failed parsing hex")
    }

    #[test]
    fn test_numeric_opcodes() {
        run_test_cases(
            vec![
                TestCase { init: vec![num("01")], code: codes::Op1Add, dstack: vec![num("02")] },
                TestCase { init: vec![num("")], code: codes::Op1Sub, dstack: vec![num("81")] },
                TestCase { init: vec![num("05")], code: codes::OpNegate, dstack: vec![num("85")] },
                TestCase { init: vec![num("85")], code: codes::OpAbs, dstack: vec![num("05")] },
                TestCase { init: vec![num("")], code: codes::OpNot, dstack: vec![num("01")] },
                TestCase { init: vec![num("07")], code: codes::OpNot, dstack: vec![num("")] },
                TestCase { init: vec![num("81")], code: codes::Op0NotEqual, dstack: vec![num("01")] },
                TestCase { init: vec![num("ffffff7f"), num("01")], code: codes::OpAdd, dstack: vec![num("0000008000")] },
                TestCase { init: vec![num("02"), num("05")], code: codes::OpSub, dstack: vec![num("83")] },
                TestCase { init: vec![num("83"), num("05")], code: codes::OpMul, dstack: vec![num("8f")] },
                TestCase { init: vec![num("87"), num("02")], code: codes::OpDiv, dstack: vec![num("83")] },
                TestCase { init: vec![num("87"), num("02")], code: codes::OpMod, dstack: vec![num("81")] },
                TestCase { init: vec![num("01"), num("")], code: codes::OpBoolAnd, dstack: vec![num("")] },
                TestCase { init: vec![num("01"), num("")], code: codes::OpBoolOr, dstack: vec![num("01")] },
                TestCase { init: vec![num("02"), num("02")], code: codes::OpNumEqual, dstack: vec![num("01")] },
                TestCase { init: vec![num("02"), num("02")], code: codes::OpNumEqualVerify, dstack: vec![] },
                TestCase { init: vec![num("02"), num("03")], code: codes::OpNumNotEqual, dstack: vec![num("01")] },
                TestCase { init: vec![num("82"), num("01")], code: codes::OpLessThan, dstack: vec![num("01")] },
                TestCase { init: vec![num("82"), num("01")], code: codes::OpGreaterThan, dstack: vec![num("")] },
                TestCase { init: vec![num("01"), num("01")], code: codes::OpLessThanOrEqual, dstack: vec![num("01")] },
                TestCase { init: vec![num("01"), num("02")], code: codes::OpGreaterThanOrEqual, dstack: vec![num("")] },
                TestCase { init: vec![num("82"), num("01")], code: codes::OpMin, dstack: vec![num("82")] },
                TestCase { init: vec![num("82"), num("01")], code: codes::OpMax, dstack: vec![num("01")] },
                TestCase { init: vec![num("02"), num("02"), num("03")], code: codes::OpWithin, dstack: vec![num("01")] },
                TestCase { init: vec![num("03"), num("02"), num("03")], code: codes::OpWithin, dstack: vec![num("")] },
            ],
            ScriptFlags::NONE,
        );
    }

    #[test]
    fn test_64_bit_numbers() {
        run_test_cases(
            vec![
                TestCase { init: vec![num("0000008000"), num("02")], code: codes::OpMul, dstack: vec![num("0000000001")] },
                TestCase { init: vec![num("feffffffffffff7f")], code: codes::Op1Add, dstack: vec![num("ffffffffffffff7f")] },
                TestCase { init: vec![num("ffffffffffffff7f")], code: codes::OpNegate, dstack: vec![num("ffffffffffffffff")] },
            ],
            ScriptFlags::INTEGERS_64_BIT,
        );
        run_error_test_cases(
            vec![
                ErrorTestCase { init: vec![num("ffffffffffffff7f")], code: codes::Op1Add, error: ScriptError::InvalidNumberRange64Bit },
                ErrorTestCase { init: vec![num("ffffffffffffffff")], code: codes::Op1Sub, error: ScriptError::InvalidNumberRange64Bit },
                ErrorTestCase {
                    init: vec![num("ffffffffffffff7f"), num("01")],
                    code: codes::OpAdd,
                    error: ScriptError::InvalidNumberRange64Bit,
                },
                ErrorTestCase {
                    init: vec![num("ffffffffffffff3f"), num("03")],
                    code: codes::OpMul,
                    error: ScriptError::InvalidNumberRange64Bit,
                },
                ErrorTestCase { init: vec![num("000000000000000001")], code: codes::OpAbs, error: ScriptError::InvalidNumberRange64Bit },
            ],
            ScriptFlags::INTEGERS_64_BIT,
        );
    }

    #[test]
    fn test_numeric_opcode_errors() {
        run_error_test_cases(
            vec![
                ErrorTestCase { init: vec![], code: codes::OpNegate, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![num("01")], code: codes::OpAdd, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![num("0000008000")], code: codes::Op1Add, error: ScriptError::InvalidNumberRange },
                ErrorTestCase { init: vec![num("01"), num("")], code: codes::OpDiv, error: ScriptError::DivByZero },
                ErrorTestCase { init: vec![num("01"), num("")], code: codes::OpMod, error: ScriptError::ModByZero },
                ErrorTestCase { init: vec![num("01"), num("02")], code: codes::OpNumEqualVerify, error: ScriptError::NumEqualVerify },
                ErrorTestCase { init: vec![num("01"), num("02")], code: codes::OpWithin, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![num("01"), num("01")], code: codes::Op2Mul, error: ScriptError::DisabledOpcode },
            ],
            ScriptFlags::NONE,
        );
        // Padded numbers are rejected under MINIMALDATA only
        run_error_test_cases(
            vec![ErrorTestCase { init: vec![num("0100")], code: codes::Op1Add, error: ScriptError::InvalidNumberRange }],
            ScriptFlags::MINIMALDATA,
        );
        run_test_cases(vec![TestCase { init: vec![num("0100")], code: codes::Op1Add, dstack: vec![num("02")] }], ScriptFlags::NONE);
    }

    #[test]
    fn test_num2bin_bin2num() {
        run_test_cases(
            vec![
                TestCase { init: vec![num("02"), num("04")], code: codes::OpNum2Bin, dstack: vec![num("02000000")] },
                TestCase { init: vec![num("85"), num("04")], code: codes::OpNum2Bin, dstack: vec![num("05000080")] },
                TestCase { init: vec![num("0100"), num("01")], code: codes::OpNum2Bin, dstack: vec![num("01")] },
                TestCase { init: vec![num(""), num("02")], code: codes::OpNum2Bin, dstack: vec![num("0000")] },
                TestCase { init: vec![num("80"), num("")], code: codes::OpNum2Bin, dstack: vec![num("")] },
                TestCase { init: vec![num("02000000")], code: codes::OpBin2Num, dstack: vec![num("02")] },
                TestCase { init: vec![num("05000080")], code: codes::OpBin2Num, dstack: vec![num("85")] },
                TestCase { init: vec![num("0000")], code: codes::OpBin2Num, dstack: vec![num("")] },
            ],
            ScriptFlags::NONE,
        );
        run_error_test_cases(
            vec![
                ErrorTestCase { init: vec![num("0201"), num("01")], code: codes::OpNum2Bin, error: ScriptError::ImpossibleEncoding },
                ErrorTestCase { init: vec![num("01"), num("0902")], code: codes::OpNum2Bin, error: ScriptError::PushSize },
                ErrorTestCase { init: vec![num("01"), num("81")], code: codes::OpNum2Bin, error: ScriptError::PushSize },
                ErrorTestCase { init: vec![num("01")], code: codes::OpNum2Bin, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![num("0000000001")], code: codes::OpBin2Num, error: ScriptError::InvalidNumberRange },
                ErrorTestCase { init: vec![], code: codes::OpBin2Num, error: ScriptError::InvalidStackOperation },
            ],
            ScriptFlags::NONE,
        );
    }
}
