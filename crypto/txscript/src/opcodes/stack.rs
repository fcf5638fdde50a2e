use super::OpCodeResult;
use crate::ScriptEngine;
use crate::data_stack::{DataStack, cast_to_bool};
use crate::script_num::ScriptNum;
use radiant_txscript_errors::ScriptError;

pub(super) fn op_ifdup(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let top = vm.dstack.top(-1)?;
    if cast_to_bool(top) {
        let top = top.clone();
        vm.dstack.push(top);
    }
    Ok(())
}

pub(super) fn op_nip(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    if vm.dstack.len() < 2 {
        return Err(ScriptError::InvalidStackOperation);
    }
    vm.dstack.remove(vm.dstack.len() - 2);
    Ok(())
}

/// PICK copies the item `n` deep to the top, ROLL moves it there.
pub(super) fn op_pick_roll(vm: &mut ScriptEngine<'_>, roll: bool) -> OpCodeResult {
    if vm.dstack.len() < 2 {
        return Err(ScriptError::InvalidStackOperation);
    }
    let n = vm.pop_num()?.get_int64();
    if n < 0 || n as u64 >= vm.dstack.len() as u64 {
        return Err(ScriptError::InvalidStackOperation);
    }

    let idx = vm.dstack.len() - 1 - n as usize;
    let item = match roll {
        true => vm.dstack.remove(idx),
        false => vm.dstack[idx].clone(),
    };
    vm.dstack.push(item);
    Ok(())
}

pub(super) fn op_tuck(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    if vm.dstack.len() < 2 {
        return Err(ScriptError::InvalidStackOperation);
    }
    let top = vm.dstack.top(-1)?.clone();
    vm.dstack.insert(vm.dstack.len() - 2, top);
    Ok(())
}

pub(super) fn op_size(vm: &mut ScriptEngine<'_>) -> OpCodeResult {
    let len = vm.dstack.top(-1)?.len();
    vm.dstack.push_num(ScriptNum::from_int_unchecked(len as i64));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::opcodes::codes;
    use crate::opcodes::tests::{ErrorTestCase, TestCase, run_error_test_cases, run_test_cases};
    use crate::ScriptFlags;
    use radiant_txscript_errors::ScriptError;

    #[test]
    fn test_stack_opcodes() {
        run_test_cases(
            vec![
                TestCase { init: vec![vec![1]], code: codes::OpIfDup, dstack: vec![vec![1], vec![1]] },
                TestCase { init: vec![vec![0x80]], code: codes::OpIfDup, dstack: vec![vec![0x80]] },
                TestCase { init: vec![vec![1], vec![2]], code: codes::OpNip, dstack: vec![vec![2]] },
                TestCase { init: vec![vec![1], vec![2], vec![3], vec![2]], code: codes::OpPick, dstack: vec![vec![1], vec![2], vec![3], vec![1]] },
                TestCase { init: vec![vec![1], vec![2], vec![3], vec![]], code: codes::OpPick, dstack: vec![vec![1], vec![2], vec![3], vec![3]] },
                TestCase { init: vec![vec![1], vec![2], vec![3], vec![2]], code: codes::OpRoll, dstack: vec![vec![2], vec![3], vec![1]] },
                TestCase { init: vec![vec![1], vec![2]], code: codes::OpTuck, dstack: vec![vec![2], vec![1], vec![2]] },
                TestCase { init: vec![vec![1, 2, 3]], code: codes::OpSize, dstack: vec![vec![1, 2, 3], vec![3]] },
                TestCase { init: vec![vec![]], code: codes::OpSize, dstack: vec![vec![], vec![]] },
                TestCase { init: vec![vec![1], vec![2]], code: codes::OpDepth, dstack: vec![vec![1], vec![2], vec![2]] },
            ],
            ScriptFlags::NONE,
        );
    }

    #[test]
    fn test_stack_opcode_errors() {
        run_error_test_cases(
            vec![
                ErrorTestCase { init: vec![], code: codes::OpIfDup, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![vec![1]], code: codes::OpNip, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![vec![1]], code: codes::OpPick, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![vec![1], vec![1]], code: codes::OpPick, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![vec![1], vec![0x81]], code: codes::OpRoll, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![vec![1], vec![1, 0, 0, 0, 0]], code: codes::OpPick, error: ScriptError::InvalidNumberRange },
                ErrorTestCase { init: vec![vec![1]], code: codes::OpTuck, error: ScriptError::InvalidStackOperation },
                ErrorTestCase { init: vec![], code: codes::OpSize, error: ScriptError::InvalidStackOperation },
            ],
            ScriptFlags::NONE,
        );
    }
}
