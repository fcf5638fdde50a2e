use thiserror::Error;

/// Every reason a script can be rejected for. A successful evaluation is `Ok(..)`.
#[derive(Error, PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum ScriptError {
    #[error("unknown error")]
    Unknown,
    #[error("script evaluated without error but finished with a false/empty top stack element")]
    EvalFalse,
    #[error("OP_RETURN was encountered")]
    OpReturn,

    // Max sizes
    #[error("script is too big")]
    ScriptSize,
    #[error("push value size limit exceeded")]
    PushSize,
    #[error("operation limit exceeded")]
    OpCount,
    #[error("stack size limit exceeded")]
    StackSize,
    #[error("signature count negative or greater than pubkey count")]
    SigCount,
    #[error("pubkey count negative or limit exceeded")]
    PubkeyCount,

    // Operands checks
    #[error("invalid operand size")]
    InvalidOperandSize,
    #[error("given operand is not a number within the valid range [-2^31 + 1, 2^31 - 1]")]
    InvalidNumberRange,
    #[error("given operand is not a number within the valid range [-2^63 + 1, 2^63 - 1]")]
    InvalidNumberRange64Bit,
    #[error("the requested encoding is impossible to satisfy")]
    ImpossibleEncoding,
    #[error("invalid OP_SPLIT range")]
    InvalidSplitRange,
    #[error("invalid number of bit set in OP_CHECKMULTISIG")]
    InvalidBitCount,

    // Failed verify operations
    #[error("script failed an OP_VERIFY operation")]
    Verify,
    #[error("script failed an OP_EQUALVERIFY operation")]
    EqualVerify,
    #[error("script failed an OP_CHECKMULTISIGVERIFY operation")]
    CheckMultiSigVerify,
    #[error("script failed an OP_CHECKSIGVERIFY operation")]
    CheckSigVerify,
    #[error("script failed an OP_CHECKDATASIGVERIFY operation")]
    CheckDataSigVerify,
    #[error("script failed an OP_NUMEQUALVERIFY operation")]
    NumEqualVerify,

    // Logical/Format/Canonical errors
    #[error("opcode missing or not understood")]
    BadOpcode,
    #[error("attempted to use a disabled opcode")]
    DisabledOpcode,
    #[error("operation not valid with the current stack size")]
    InvalidStackOperation,
    #[error("operation not valid with the current altstack size")]
    InvalidAltstackOperation,
    #[error("invalid OP_IF construction")]
    UnbalancedConditional,

    // Divisor errors
    #[error("division by zero error")]
    DivByZero,
    #[error("modulo by zero error")]
    ModByZero,

    // Bitfield errors
    #[error("bitfield of unexpected size error")]
    InvalidBitfieldSize,
    #[error("bitfield's bit out of the expected range")]
    InvalidBitRange,

    // CHECKLOCKTIMEVERIFY and CHECKSEQUENCEVERIFY
    #[error("negative locktime")]
    NegativeLocktime,
    #[error("locktime requirement not satisfied")]
    UnsatisfiedLocktime,

    // Malleability
    #[error("signature hash type missing or not understood")]
    SigHashType,
    #[error("non-canonical DER signature")]
    SigDer,
    #[error("data push larger than necessary")]
    MinimalData,
    #[error("only push operators allowed in signature scripts")]
    SigPushOnly,
    #[error("non-canonical signature: S value is unnecessarily high")]
    SigHighS,
    #[error("public key is neither compressed or uncompressed")]
    PubkeyType,
    #[error("extra items left on stack after execution")]
    CleanStack,
    #[error("OP_IF/NOTIF argument must be minimal")]
    MinimalIf,
    #[error("signature must be zero for failed CHECK(MULTI)SIG operation")]
    SigNullFail,

    // Schnorr
    #[error("signature cannot be 65 bytes in CHECKMULTISIG")]
    SigBadLength,
    #[error("only Schnorr signatures allowed in this operation")]
    SigNonSchnorr,

    // Softfork safeness
    #[error("NOPx reserved for soft-fork upgrades")]
    DiscourageUpgradableNops,

    // Fork id
    #[error("illegal use of SIGHASH_FORKID")]
    IllegalForkId,
    #[error("signature must use SIGHASH_FORKID")]
    MustUseForkId,

    // Native introspection and references
    #[error("script execution context is not present")]
    ContextNotPresent,
    #[error("invalid transaction input index")]
    InvalidTxInputIndex,
    #[error("invalid transaction output index")]
    InvalidTxOutputIndex,
    #[error("limited script execution context has no information about sibling inputs")]
    LimitedContextNoSiblingInfo,
    #[error("invalid reference size, must be 36 bytes")]
    InvalidTxRefSize,
    #[error("invalid reference hash size, must be 32 bytes")]
    InvalidTxRefHashSize,
    #[error("invalid hash size, must be 32 bytes")]
    InvalidTxHashSize,
    #[error("invalid transaction state item")]
    InvalidTxStateItem,
    #[error("transaction output contains a disallowed push reference")]
    InvalidTxOutputContainsDisallowedPushref,
}

impl ScriptError {
    /// Returns the out-of-range error matching the active integer width.
    pub fn number_range(integers_64_bit: bool) -> Self {
        if integers_64_bit { ScriptError::InvalidNumberRange64Bit } else { ScriptError::InvalidNumberRange }
    }
}

#[cfg(test)]
mod tests {
    use super::ScriptError;

    #[test]
    fn test_number_range() {
        assert_eq!(ScriptError::number_range(false), ScriptError::InvalidNumberRange);
        assert_eq!(ScriptError::number_range(true), ScriptError::InvalidNumberRange64Bit);
        assert_eq!(ScriptError::OpReturn.to_string(), "OP_RETURN was encountered");
    }
}
