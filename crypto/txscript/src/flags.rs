use bitflags::bitflags;

bitflags! {
    /// Script verification flags. The bit values match the ones used by the
    /// Radiant node so that a raw `u32` can be passed through unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScriptFlags: u32 {
        const NONE = 0;
        /// Evaluate pay-to-script-hash redeem scripts.
        const P2SH = 1 << 0;
        /// Enforce strict signature, hashtype and public key encodings.
        const STRICTENC = 1 << 1;
        const DERSIG = 1 << 2;
        const LOW_S = 1 << 3;
        const SIGPUSHONLY = 1 << 5;
        /// Require minimal pushes and minimally encoded numbers.
        const MINIMALDATA = 1 << 6;
        const DISCOURAGE_UPGRADABLE_NOPS = 1 << 7;
        const CLEANSTACK = 1 << 8;
        const CHECKLOCKTIMEVERIFY = 1 << 9;
        const CHECKSEQUENCEVERIFY = 1 << 10;
        /// The argument of IF/NOTIF must be empty or exactly `[1]`.
        const MINIMALIF = 1 << 13;
        /// A failed signature check must come with an empty signature.
        const NULLFAIL = 1 << 14;
        const SIGHASH_FORKID = 1 << 16;
        const DISALLOW_SEGWIT_RECOVERY = 1 << 20;
        const SCHNORR_MULTISIG = 1 << 21;
        /// Per-input sigcheck density limit. Carried for flag-word compatibility;
        /// the Radiant verifier no longer applies it.
        const INPUT_SIGCHECKS = 1 << 22;
        /// Block-level sigcheck limits. Enforced by block validation, not by the interpreter.
        const ENFORCE_SIGCHECKS = 1 << 23;
        const INTEGERS_64_BIT = 1 << 24;
        const NATIVE_INTROSPECTION = 1 << 25;
        const ENHANCED_REFERENCES = 1 << 26;
        const PUSH_TX_STATE = 1 << 27;

        /// Flags every block must satisfy.
        const MANDATORY = Self::STRICTENC.bits()
            | Self::SIGHASH_FORKID.bits()
            | Self::LOW_S.bits()
            | Self::NULLFAIL.bits()
            | Self::MINIMALDATA.bits()
            | Self::SCHNORR_MULTISIG.bits()
            | Self::ENFORCE_SIGCHECKS.bits()
            | Self::SIGPUSHONLY.bits()
            | Self::INTEGERS_64_BIT.bits()
            | Self::NATIVE_INTROSPECTION.bits();

        /// Flags applied by relay policy on top of [`ScriptFlags::MANDATORY`].
        const STANDARD = Self::MANDATORY.bits()
            | Self::DERSIG.bits()
            | Self::DISCOURAGE_UPGRADABLE_NOPS.bits()
            | Self::CLEANSTACK.bits()
            | Self::CHECKLOCKTIMEVERIFY.bits()
            | Self::CHECKSEQUENCEVERIFY.bits()
            | Self::DISALLOW_SEGWIT_RECOVERY.bits()
            | Self::INPUT_SIGCHECKS.bits();
    }
}

impl ScriptFlags {
    /// Maximum byte length of a script number operand under these flags.
    pub fn max_integer_size(&self) -> usize {
        if self.contains(Self::INTEGERS_64_BIT) {
            crate::script_num::MAX_INTEGER_SIZE_64_BIT
        } else {
            crate::script_num::MAX_INTEGER_SIZE_32_BIT
        }
    }
}
