use std::fmt;

/// CALL nn plus the full conditional CALL cc,nn family. All of them carry a
/// two-byte target operand.
pub const CALL_OPCODES: [u8; 9] = [0xc4, 0xcc, 0xcd, 0xd4, 0xdc, 0xe4, 0xec, 0xf4, 0xfc];

/// RST p vectors. The target address is encoded in the opcode itself.
pub const RST_OPCODES: [u8; 8] = [0xc7, 0xcf, 0xd7, 0xdf, 0xe7, 0xef, 0xf7, 0xff];

/// The two opcode classes that transfer control into a subroutine. Stepping
/// over one means planting a breakpoint on the instruction that follows it,
/// so the byte length matters; nothing else about the instruction does.
#[derive(PartialEq, Copy, Clone, Debug)]
pub enum CallClass {
    Call,
    Restart,
}

impl CallClass {
    /// Classifies a raw opcode byte, or `None` when the instruction is not
    /// call-like and a plain step is the right way through it.
    pub fn classify(opcode: u8) -> Option<CallClass> {
        if CALL_OPCODES.contains(&opcode) {
            Some(CallClass::Call)
        } else if RST_OPCODES.contains(&opcode) {
            Some(CallClass::Restart)
        } else {
            None
        }
    }

    pub fn length(&self) -> u16 {
        match self {
            CallClass::Call => 3,
            CallClass::Restart => 1,
        }
    }
}

impl fmt::Display for CallClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CallClass::Call => write!(f, "call"),
            CallClass::Restart => write!(f, "rst"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_call_is_three_bytes() {
        let class = CallClass::classify(0xcd).unwrap();
        assert_eq!(class, CallClass::Call);
        assert_eq!(class.length(), 3);
    }

    #[test]
    fn conditional_calls_are_classified() {
        for opcode in [0xc4, 0xcc, 0xd4, 0xdc, 0xe4, 0xec, 0xf4, 0xfc] {
            assert_eq!(CallClass::classify(opcode), Some(CallClass::Call));
        }
    }

    #[test]
    fn restart_vectors_are_one_byte() {
        for opcode in RST_OPCODES {
            let class = CallClass::classify(opcode).unwrap();
            assert_eq!(class, CallClass::Restart);
            assert_eq!(class.length(), 1);
        }
    }

    #[test]
    fn ordinary_opcodes_are_not_call_like() {
        // NOP, JP nn, RET, LD A,n
        for opcode in [0x00, 0xc3, 0xc9, 0x3e] {
            assert_eq!(CallClass::classify(opcode), None);
        }
    }
}
