pub mod bitfield;
pub mod caches;
pub mod checker;
mod condition_stack;
pub mod context;
mod data_stack;
pub mod flags;
pub mod opcodes;
pub mod script;
pub mod script_builder;
pub mod script_num;
pub mod sig_encoding;
pub mod sighash;
pub mod txid;
pub mod verify;

use crate::condition_stack::ConditionStack;
use crate::data_stack::{DataStack, Stack};
use crate::script::{ParsedOpcode, RefId, ScriptIter, check_minimal_push};
use crate::script_num::ScriptNum;
use itertools::Itertools;
use log::{debug, trace};
use opcodes::{is_conditional, is_opcode_disabled};
use std::collections::BTreeSet;

pub use checker::{BaseSignatureChecker, SignatureChecker, TransactionSignatureChecker};
pub use context::ScriptExecutionContext;
pub use flags::ScriptFlags;
pub use radiant_txscript_errors::ScriptError;
pub use verify::verify_script;

pub const MAX_SCRIPT_SIZE: usize = 10_000;
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
pub const MAX_OPS_PER_SCRIPT: usize = 201;
pub const MAX_STACK_SIZE: usize = 1000;
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

// The last opcode that does not count toward operations.
// Note that this includes OP_RESERVED which counts as a push operation.
pub const NO_COST_OPCODE: u8 = opcodes::codes::Op16;

/// Counters collected while evaluating the scripts of one input, consumed by block
/// validation for the sigchecks density limit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptExecutionMetrics {
    /// Signature verifications actually performed, empty signatures excluded.
    pub sig_checks: u32,
}

/// Interpreter state for the evaluation of a single script.
///
/// The main stack is handed in by the caller and read back once the script ends.
/// Everything else (alt stack, IF nesting, operation count, reference sets) is
/// scoped to one script.
pub struct ScriptEngine<'a> {
    pub(crate) dstack: Stack,
    pub(crate) astack: Stack,
    pub(crate) cond_stack: ConditionStack,

    pub(crate) flags: ScriptFlags,
    pub(crate) checker: &'a dyn SignatureChecker,
    pub(crate) context: Option<&'a ScriptExecutionContext>,
    pub(crate) metrics: ScriptExecutionMetrics,

    pub(crate) script: &'a [u8],
    // Offset just past the last executed OP_CODESEPARATOR
    pub(crate) begin_code_hash: usize,
    pub(crate) num_ops: usize,

    pub(crate) found_push_refs: BTreeSet<RefId>,
    pub(crate) disallowed_refs: BTreeSet<RefId>,
    pub(crate) returned_early: bool,
}

impl<'a> ScriptEngine<'a> {
    pub fn new(
        stack: Vec<Vec<u8>>,
        flags: ScriptFlags,
        checker: &'a dyn SignatureChecker,
        context: Option<&'a ScriptExecutionContext>,
    ) -> Self {
        Self {
            dstack: stack,
            astack: Vec::new(),
            cond_stack: ConditionStack::new(),
            flags,
            checker,
            context,
            metrics: ScriptExecutionMetrics::default(),
            script: &[],
            begin_code_hash: 0,
            num_ops: 0,
            found_push_refs: BTreeSet::new(),
            disallowed_refs: BTreeSet::new(),
            returned_early: false,
        }
    }

    pub fn stack(&self) -> &[Vec<u8>] {
        &self.dstack
    }

    pub fn into_stack(self) -> Vec<Vec<u8>> {
        self.dstack
    }

    pub fn metrics(&self) -> ScriptExecutionMetrics {
        self.metrics
    }

    #[inline]
    pub fn is_executing(&self) -> bool {
        self.cond_stack.all_true()
    }

    /// The script hashed by signature checks: everything after the last executed
    /// OP_CODESEPARATOR.
    #[inline]
    pub(crate) fn script_code(&self) -> &'a [u8] {
        &self.script[self.begin_code_hash..]
    }

    pub(crate) fn context(&self) -> Result<&'a ScriptExecutionContext, ScriptError> {
        self.context.ok_or(ScriptError::ContextNotPresent)
    }

    /// Error reported for a number operand that is too long or not minimally encoded.
    #[inline]
    pub(crate) fn num_error(&self) -> ScriptError {
        ScriptError::number_range(self.flags.contains(ScriptFlags::INTEGERS_64_BIT))
    }

    /// Decodes the stack element at `offset` as a number of the size allowed by the flags.
    pub(crate) fn top_num(&self, offset: isize) -> Result<ScriptNum, ScriptError> {
        self.top_num_sized(offset, self.flags.max_integer_size())
    }

    pub(crate) fn top_num_sized(&self, offset: isize, max_size: usize) -> Result<ScriptNum, ScriptError> {
        let item = self.dstack.top(offset)?;
        ScriptNum::decode(item, self.flags.contains(ScriptFlags::MINIMALDATA), max_size).map_err(|_| self.num_error())
    }

    pub(crate) fn pop_num(&mut self) -> Result<ScriptNum, ScriptError> {
        let num = self.top_num(-1)?;
        self.dstack.pop();
        Ok(num)
    }

    fn execute_opcode(&mut self, opcode: &ParsedOpcode<'a>) -> Result<(), ScriptError> {
        if opcode.data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::PushSize);
        }

        if opcode.value > NO_COST_OPCODE {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS_PER_SCRIPT {
                return Err(ScriptError::OpCount);
            }
        }

        // Disabled opcodes fail even inside a branch that is not taken
        if is_opcode_disabled(opcode.value, self.flags) {
            return Err(ScriptError::DisabledOpcode);
        }

        let executing = self.is_executing();
        if executing && opcode.value <= opcodes::codes::OpPushData4 {
            if self.flags.contains(ScriptFlags::MINIMALDATA) && !check_minimal_push(opcode.data, opcode.value) {
                return Err(ScriptError::MinimalData);
            }
            self.dstack.push(opcode.data.to_vec());
            Ok(())
        } else if executing || is_conditional(opcode.value) {
            opcodes::execute(opcode, self)
        } else {
            Ok(())
        }
    }

    /// Runs `script` over the current stack.
    ///
    /// An OP_RETURN reached with an empty stack ends the script successfully, whatever
    /// follows it.
    pub fn execute(&mut self, script: &'a [u8]) -> Result<(), ScriptError> {
        if script.len() > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptSize);
        }
        self.script = script;

        for opcode in ScriptIter::new(script) {
            let opcode = opcode.map_err(|_| ScriptError::BadOpcode)?;
            trace!("executing {:?} on stack [{}]", opcode, self.dstack.iter().map(|item| faster_hex::hex_string(item)).format(", "));
            self.execute_opcode(&opcode)?;

            if self.returned_early {
                return Ok(());
            }

            if self.dstack.len() + self.astack.len() > MAX_STACK_SIZE {
                return Err(ScriptError::StackSize);
            }
        }

        self.check_end_conditions()
    }

    fn check_end_conditions(&self) -> Result<(), ScriptError> {
        if !self.cond_stack.is_empty() {
            return Err(ScriptError::UnbalancedConditional);
        }
        // No reference disallowed anywhere in the script may also be pushed by it
        if self.disallowed_refs.intersection(&self.found_push_refs).next().is_some() {
            return Err(ScriptError::InvalidTxOutputContainsDisallowedPushref);
        }
        Ok(())
    }
}

/// Evaluates `script` on `stack`.
///
/// `stack` holds the resulting main stack and `metrics` the accumulated counters once
/// the call returns, failed evaluations included.
pub fn eval_script(
    stack: &mut Vec<Vec<u8>>,
    script: &[u8],
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
    metrics: &mut ScriptExecutionMetrics,
    context: Option<&ScriptExecutionContext>,
) -> Result<(), ScriptError> {
    let mut vm = ScriptEngine::new(std::mem::take(stack), flags, checker, context);
    vm.metrics = *metrics;
    let result = vm.execute(script);
    if let Err(err) = &result {
        debug!("script evaluation failed: {err}");
    }

    *metrics = vm.metrics;
    *stack = vm.into_stack();
    result
}
