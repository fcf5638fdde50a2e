/// Expands a length specification into an [`OpcodeLength`](super::OpcodeLength).
///
/// A literal is the static length of the instruction (opcode included), an unsigned
/// integer type is the width of a little endian length prefix.
macro_rules! opcode_length {
    (u8) => {
        OpcodeLength::Prefixed(1)
    };
    (u16) => {
        OpcodeLength::Prefixed(2)
    };
    (u32) => {
        OpcodeLength::Prefixed(4)
    };
    ($length: literal) => {
        OpcodeLength::Fixed($length)
    };
}

macro_rules! opcode_list {
    ( $( opcode $(|$alias:ident|)? $name:ident<$num:literal, $length:tt>($op:ident, $vm:ident) $code:expr )* ) => {
        pub mod codes {
            $(
                #[allow(non_upper_case_globals)]
                #[allow(dead_code)]
                pub const $name: u8 = $num;
                $(
                    #[allow(non_upper_case_globals)]
                    #[allow(dead_code)]
                    pub const $alias: u8 = $num;
                )?
            )*
        }

        /// Name of the opcode with value `value`, `None` for unassigned values.
        pub fn opcode_name(value: u8) -> Option<&'static str> {
            match value {
                $( $num => Some(stringify!($name)), )*
                #[allow(unreachable_patterns)]
                _ => None,
            }
        }

        /// How the operand of `value` is laid out in the script. Unassigned values
        /// carry no operand.
        pub fn opcode_length(value: u8) -> OpcodeLength {
            match value {
                $( $num => opcode_length!($length), )*
                #[allow(unreachable_patterns)]
                _ => OpcodeLength::Fixed(1),
            }
        }

        pub(crate) fn execute(opcode: &ParsedOpcode<'_>, vm: &mut ScriptEngine<'_>) -> OpCodeResult {
            match opcode.value {
                $(
                    $num => {
                        #[allow(unused_variables)]
                        let $op = opcode;
                        #[allow(unused_variables)]
                        let $vm = &mut *vm;
                        $code
                    }
                )*
                #[allow(unreachable_patterns)]
                _ => Err(ScriptError::BadOpcode),
            }
        }
    };
}
