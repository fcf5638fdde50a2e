pub const SIG_HASH_ALL: SigHashType = SigHashType(0x01);
pub const SIG_HASH_NONE: SigHashType = SigHashType(0x02);
pub const SIG_HASH_SINGLE: SigHashType = SigHashType(0x03);
pub const SIG_HASH_FORKID: SigHashType = SigHashType(0x40);
pub const SIG_HASH_ANY_ONE_CAN_PAY: SigHashType = SigHashType(0x80);

/// SIG_HASH_MASK selects the bits of the hash type which identify which outputs are signed.
pub const SIG_HASH_MASK: u32 = 0x1f;

/// The hash type byte appended to every transaction signature.
///
/// Unknown base types are representable: legacy signatures may carry them and are
/// hashed as if they were ALL.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct SigHashType(u32);

impl SigHashType {
    pub const fn from_u32(val: u32) -> Self {
        Self(val)
    }

    /// Reads the hash type from the trailing byte of a transaction signature.
    pub fn from_signature(sig: &[u8]) -> Option<Self> {
        sig.last().map(|&b| Self(b as u32))
    }

    pub fn to_u32(self) -> u32 {
        self.0
    }

    pub fn base_type(self) -> u32 {
        self.0 & SIG_HASH_MASK
    }

    pub fn is_sighash_none(self) -> bool {
        self.base_type() == SIG_HASH_NONE.0
    }

    pub fn is_sighash_single(self) -> bool {
        self.base_type() == SIG_HASH_SINGLE.0
    }

    pub fn has_fork_id(self) -> bool {
        self.0 & SIG_HASH_FORKID.0 != 0
    }

    pub fn is_sighash_anyone_can_pay(self) -> bool {
        self.0 & SIG_HASH_ANY_ONE_CAN_PAY.0 != 0
    }

    /// A hash type is defined when, ignoring FORKID and ANYONECANPAY, it is ALL, NONE or SINGLE.
    pub fn is_defined(self) -> bool {
        let base = self.0 & !(SIG_HASH_FORKID.0 | SIG_HASH_ANY_ONE_CAN_PAY.0);
        (SIG_HASH_ALL.0..=SIG_HASH_SINGLE.0).contains(&base)
    }

    pub fn with_fork_id(self, fork_id: bool) -> Self {
        if fork_id { Self(self.0 | SIG_HASH_FORKID.0) } else { Self(self.0 & !SIG_HASH_FORKID.0) }
    }

    pub fn with_anyone_can_pay(self, anyone_can_pay: bool) -> Self {
        if anyone_can_pay { Self(self.0 | SIG_HASH_ANY_ONE_CAN_PAY.0) } else { Self(self.0 & !SIG_HASH_ANY_ONE_CAN_PAY.0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_defined() {
        struct TestCase {
            value: u32,
            defined: bool,
        }

        let tests = [
            TestCase { value: 0x00, defined: false },
            TestCase { value: 0x01, defined: true },
            TestCase { value: 0x03, defined: true },
            TestCase { value: 0x04, defined: false },
            TestCase { value: 0x41, defined: true },
            TestCase { value: 0xc3, defined: true },
            TestCase { value: 0x21, defined: false },
            TestCase { value: 0xc0, defined: false },
            TestCase { value: 0x101, defined: false },
        ];

        for test in tests {
            assert_eq!(SigHashType::from_u32(test.value).is_defined(), test.defined, "hash type {:#x}", test.value);
        }
    }

    #[test]
    fn test_flags() {
        let t = SIG_HASH_SINGLE.with_fork_id(true).with_anyone_can_pay(true);
        assert_eq!(t.to_u32(), 0xc3);
        assert!(t.has_fork_id() && t.is_sighash_anyone_can_pay() && t.is_sighash_single());
        assert_eq!(t.base_type(), 3);
        assert_eq!(t.with_fork_id(false).to_u32(), 0x83);
        assert_eq!(SigHashType::from_signature(&[0x30, 0x41]), Some(SigHashType::from_u32(0x41)));
        assert_eq!(SigHashType::from_signature(&[]), None);
        // 0x20 bit survives the base type mask
        assert_eq!(SigHashType::from_u32(0x22).base_type(), 2);
    }
}
