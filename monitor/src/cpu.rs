use std::fmt;

use bitflags::bitflags;
use z80::registers::{Reg16, REGISTER_COUNT};

bitflags! {
    /// Low byte of AF as the stub reports it.
    #[derive(PartialEq, Eq, Copy, Clone, Debug)]
    pub struct Flags: u8 {
        const CARRY = 0b0000_0001;
        const SUBTRACT = 0b0000_0010;
        const PARITY_OR_OVERFLOW = 0b0000_0100;
        const HALF_CARRY = 0b0001_0000;
        const ZERO = 0b0100_0000;
        const SIGN = 0b1000_0000;
    }
}

/// Snapshot of the target's register file as last reported. Only a debug
/// step refreshes it; a fast step or a resume invalidates everything, so a
/// slot is `None` until the stub says otherwise.
pub struct RegisterFile {
    values: [Option<u16>; REGISTER_COUNT],
    /// Words the stub appends after the register vector: a peek at the top
    /// of the target stack, next-to-pop first.
    stack: Vec<u16>,
}

impl RegisterFile {
    pub(crate) fn new() -> RegisterFile {
        RegisterFile {
            values: [None; REGISTER_COUNT],
            stack: Vec::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.values = [None; REGISTER_COUNT];
        self.stack.clear();
    }

    /// Replaces the whole snapshot. `words` must carry at least the register
    /// vector; the caller checks the count against the reply contract.
    pub(crate) fn load(&mut self, words: &[u16]) {
        for (slot, value) in self.values.iter_mut().zip(words) {
            *slot = Some(*value);
        }
        self.stack = words[REGISTER_COUNT..].to_vec();
    }

    pub fn get(&self, reg: Reg16) -> Option<u16> {
        self.values[reg.index()]
    }

    pub fn flags(&self) -> Option<Flags> {
        self.get(Reg16::AF)
            .map(|af| Flags::from_bits_truncate((af & 0xff) as u8))
    }

    pub fn stack_peek(&self) -> &[u16] {
        &self.stack
    }

    pub fn is_known(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (flag, letter) in [
            (Flags::CARRY, 'C'),
            (Flags::SUBTRACT, 'N'),
            (Flags::PARITY_OR_OVERFLOW, 'P'),
            (Flags::HALF_CARRY, 'H'),
            (Flags::ZERO, 'Z'),
            (Flags::SIGN, 'S'),
        ] {
            if self.contains(flag) {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = |value: Option<u16>| match value {
            Some(value) => format!("{:04X}", value),
            None => String::from("????"),
        };
        for reg in [Reg16::AF, Reg16::BC, Reg16::DE, Reg16::HL, Reg16::IX, Reg16::IY, Reg16::SP, Reg16::PC] {
            write!(f, "{}:{} ", reg, word(self.get(reg)))?;
        }
        match self.flags() {
            Some(flags) => write!(f, "FL:{}", flags),
            None => write!(f, "FL:???"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bits_match_the_wire_layout() {
        let flags = Flags::from_bits_truncate(0b1101_0111);
        assert!(flags.contains(Flags::CARRY));
        assert!(flags.contains(Flags::SUBTRACT));
        assert!(flags.contains(Flags::PARITY_OR_OVERFLOW));
        assert!(flags.contains(Flags::HALF_CARRY));
        assert!(flags.contains(Flags::ZERO));
        assert!(flags.contains(Flags::SIGN));
        assert_eq!(format!("{}", flags), "CNPHZS");
    }

    #[test]
    fn unknown_registers_render_as_placeholders() {
        let regs = RegisterFile::new();
        assert_eq!(regs.get(Reg16::PC), None);
        assert!(format!("{}", regs).contains("PC:???? FL:???"));
    }

    #[test]
    fn load_keeps_trailing_words_as_stack_peek() {
        let mut regs = RegisterFile::new();
        let words: Vec<u16> = (0..16).collect();
        regs.load(&words);
        assert!(regs.is_known());
        assert_eq!(regs.get(Reg16::PC), Some(11));
        assert_eq!(regs.stack_peek(), &[12, 13, 14, 15]);
    }
}
