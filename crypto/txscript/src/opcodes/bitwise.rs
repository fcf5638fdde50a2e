use super::OpCodeResult;
use crate::data_stack::DataStack;
use crate::{MAX_SCRIPT_ELEMENT_SIZE, ScriptEngine};
use radiant_txscript_errors::ScriptError;

pub(super) fn op_cat(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let [a, b] = vm.dstack.peek_raw::<2>()?;
    if a.len() + b.len() > MAX_SCRIPT_ELEMENT_SIZE {
        return Err(ScriptError::PushSize);
    }
    vm.dstack.pop();
    vm.dstack.top_mut(-1)?.extend_from_slice(&b);
    Ok(())
}

pub(super) fn op_split(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    if vm.dstack.len() < 2 {
        return Err(ScriptError::InvalidStackOperation);
    }
    let position = vm.top_num(-1)?.get_int64();
    let data = vm.dstack.top_mut(-2)?;
    if position < 0 || position as u64 > data.len() as u64 {
        return Err(ScriptError::InvalidSplitRange);
    }

    let tail = data.split_off(position as usize);
    *vm.dstack.top_mut(-1)? = tail;
    Ok(())
}

pub(super) fn op_invert(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    vm.dstack.top_mut(-1)?.iter_mut().for_each(|b| *b = !*b);
    Ok(())
}

/// AND, OR and XOR over two equally sized operands.
pub(super) fn op_bitwise(vm: &mut ScriptEngine<'_>, f: impl Fn(u8, u8) -> u8) -> OpCodeResult {
    if vm.dstack.len() < 2 {
        return Err(ScriptError::InvalidStackOperation);
    }
    let b = vm.dstack.top(-1)?;
    if b.len() != vm.dstack.top(-2)?.len() {
        return Err(ScriptError::InvalidOperandSize);
    }

    let b = vm.dstack.pop_item()?;
    vm.dstack.top_mut(-1)?.iter_mut().zip(b).for_each(|(a, b)| *a = f(*a, b));
    Ok(())
}

pub(super) fn op_equal(vm: &mut ScriptEngine<'_>, verify: bool) -> OpCodeResult {
    let [a, b] = vm.dstack.pop_raw::<2>()?;
    let equal = a == b;
    match verify {
        true if equal => Ok(()),
        true => Err(ScriptError::EqualVerify),
        false => {
            vm.dstack.push_bool(equal);
            Ok(())
        }
    }
}

pub(super) fn op_reverse_bytes(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    vm.dstack.top_mut(-1)?.reverse();
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::opcodes::codes;
    use crate::opcodes::tests::{ErrorTestCase, TestCase, run_error_test_cases, run_test_cases};
    use crate::{MAX_SCRIPT_ELEMENT_SIZE, ScriptFlags};
    use radiant_txscript_errors::ScriptError;

    #[test]
    fn test_splice_opcodes() {
        run_test_cases(
            vec![
                TestCase { init: vec![vec![1, 2], vec![3]], code: codes::OpCat, dstack: vec![vec![1, 2, 3]] },
                TestCase { init: vec![vec![], vec![]], code: codes::OpCat, dstack: vec![vec![]] },
                TestCase {
                    init: vec![vec![0; MAX_SCRIPT_ELEMENT_SIZE - 1], vec![1]],
                    code: codes::OpCat,
                    dstack: vec![[vec![0; MAX_SCRIPT_ELEMENT_SIZE - 1], vec![1]].concat()],
                },
                TestCase { init: vec![vec![1, 2, 3], vec![1]], code: codes::OpSplit, dstack: vec![vec![1], vec![2, 3]] },
                TestCase { init: vec![vec![1, 2, 3], vec![]], code: codes::OpSplit, dstack: vec![vec![], vec![1, 2, 3]] },
                TestCase { init: vec![vec![1, 2, 3], vec![3]], code: codes::OpSplit, dstack: vec![vec![1, 2, 3], vec![]] },
                TestCase { init: vec![vec![1, 2, 3]], code: codes::OpReverseBytes, dstack: vec![vec![3, 2, 1]] },
                TestCase { init: vec![vec![]], code: codes::OpReverseBytes, dstack: vec![vec![]] },
            ],
            ScriptFlags::NONE,
        );
    }

    #[test]
    fn test_bitwise_opcodes() {
        run_test_cases(
            vec![
                TestCase { init: vec![vec![0x0f, 0x00]], code: codes::OpInvert, dstack: vec![vec![0xf0, 0xff]] },
                TestCase { init: vec![vec![0x0f, 0xff], vec![0x3c, 0x01]], code: codes::OpAnd, dstack: vec![vec![0x0c, 0x01]] },
                TestCase { init: vec![vec![0x0f, 0xf0], vec![0x30, 0x01]], code: codes::OpOr, dstack: vec![vec![0x3f, 0xf1]] },
                TestCase { init: vec![vec![0xff], vec![0x0f]], code: codes::OpXor, dstack: vec![vec![0xf0]] },
                TestCase { init: vec![vec![], vec![]], code: codes::OpAnd, dstack: vec![vec![]] },
                TestCase { init: vec![vec![1, 2], vec![1, 2]], code: codes::OpEqual, dstack: vec![vec![1]] },
                TestCase { init: vec![vec![1, 2], vec![1, 2, 0]], code: codes::OpEqual, dstack: vec![vec![]] },
                TestCase { init: vec![vec![7], vec![1, 2], vec![1, 2]], code: codes::OpEqualVerify, dstack: vec![vec![7]] },
            ],
            ScriptFlags::NONE,
        );
    }

    #[test]
    fn test_bitwise_opcode_errors() {
        run_error_test_cases(
            vec![
                ErrorTestCase { init: vec![vec![1]], code: codes::OpCat, error: ScriptError::InvalidStackOperation },
                ErrorTestCase {
                    init: vec![vec![0; MAX_SCRIPT_ELEMENT_SIZE], vec![1]],
                    code: codes::OpCat,
                    error: ScriptError::PushSize,
                },
                ErrorTestCase { init: vec![vec![1, 2]], code: codes::OpSplit, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![vec![1, 2], vec![3]], code: codes::OpSplit, error: ScriptError::InvalidSplitRange },
                ErrorTestCase { init: vec![vec![1, 2], vec![0x81]], code: codes::OpSplit, error: ScriptError::InvalidSplitRange },
                ErrorTestCase { init: vec![vec![1, 2], vec![1]], code: codes::OpAnd, error: ScriptError::InvalidOperandSize },
                ErrorTestCase { init: vec![vec![1]], code: codes::OpXor, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![], code: codes::OpInvert, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![vec![1]], code: codes::OpEqual, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![vec![1], vec![2]], code: codes::OpEqualVerify, error: ScriptError::EqualVerify },
                ErrorTestCase { init: vec![], code: codes::OpReverseBytes, error: ScriptError::InvalidStackOperation },
            ],
            ScriptFlags::NONE,
        );
    }
}
