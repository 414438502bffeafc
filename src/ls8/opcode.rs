// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use enum_primitive::FromPrimitive;

// Opcode layout: AABCDDDD where AA is the operand count, B marks an ALU
// operation, C marks an instruction that sets the program counter and DDDD
// identifies the instruction.
const OPERAND_COUNT_SHIFT: u8 = 6;
const ALU_BITMASK: u8 = 0b0010_0000;
const SETS_PC_BITMASK: u8 = 0b0001_0000;

enum_from_primitive! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Opcode {
        HLT  = 0b0000_0001,
        RET  = 0b0001_0001,
        IRET = 0b0001_0011,

        PUSH = 0b0100_0101,
        POP  = 0b0100_0110,
        PRN  = 0b0100_0111,
        PRA  = 0b0100_1000,

        CALL = 0b0101_0000,
        JMP  = 0b0101_0100,
        JEQ  = 0b0101_0101,
        JNE  = 0b0101_0110,

        INC  = 0b0110_0101,
        DEC  = 0b0110_0110,

        LDI  = 0b1000_0010,
        LD   = 0b1000_0011,
        ST   = 0b1000_0100,

        ADD  = 0b1010_0000,
        MULT = 0b1010_0010,
        CMP  = 0b1010_0111,
    }
}

/// Decodes an opcode by converting an opcode number to an enum value. Bytes
/// with no matching instruction yield None.
#[inline(always)]
pub fn decode_opcode(opcode: u8) -> Option<Opcode> {
    Opcode::from_u8(opcode)
}

impl Opcode {
    #[inline(always)]
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes that follow the opcode in memory.
    #[inline(always)]
    pub fn operand_count(self) -> u8 {
        self.byte() >> OPERAND_COUNT_SHIFT
    }

    /// Total length of the instruction in bytes, which is also how far the
    /// program counter moves when the instruction does not jump.
    #[inline(always)]
    pub fn width(self) -> u8 {
        1 + self.operand_count()
    }

    #[inline(always)]
    pub fn is_alu(self) -> bool {
        self.byte() & ALU_BITMASK == ALU_BITMASK
    }

    /// True for instructions that may overwrite the program counter
    /// themselves (jumps, calls and returns).
    #[inline(always)]
    pub fn sets_pc(self) -> bool {
        self.byte() & SETS_PC_BITMASK == SETS_PC_BITMASK
    }

    pub fn mnemonic(self) -> &'static str {
        use self::Opcode::*;

        match self {
            HLT  => "HLT",
            RET  => "RET",
            IRET => "IRET",
            PUSH => "PUSH",
            POP  => "POP",
            PRN  => "PRN",
            PRA  => "PRA",
            CALL => "CALL",
            JMP  => "JMP",
            JEQ  => "JEQ",
            JNE  => "JNE",
            INC  => "INC",
            DEC  => "DEC",
            LDI  => "LDI",
            LD   => "LD",
            ST   => "ST",
            ADD  => "ADD",
            MULT => "MULT",
            CMP  => "CMP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Opcode; 19] = [
        Opcode::HLT, Opcode::RET, Opcode::IRET, Opcode::PUSH, Opcode::POP,
        Opcode::PRN, Opcode::PRA, Opcode::CALL, Opcode::JMP, Opcode::JEQ,
        Opcode::JNE, Opcode::INC, Opcode::DEC, Opcode::LDI, Opcode::LD,
        Opcode::ST, Opcode::ADD, Opcode::MULT, Opcode::CMP,
    ];

    #[test]
    fn decodes_every_opcode_by_exact_byte() {
        for &opcode in ALL.iter() {
            assert_eq!(decode_opcode(opcode.byte()), Some(opcode));
        }
    }

    #[test]
    fn unknown_bytes_do_not_decode() {
        assert_eq!(decode_opcode(0b0000_0000), None);
        assert_eq!(decode_opcode(0b1111_1111), None);
        // Same operand count bits as LDI but an unassigned instruction id.
        assert_eq!(decode_opcode(0b1000_1111), None);
    }

    #[test]
    fn operand_counts() {
        use self::Opcode::*;

        for &opcode in [HLT, RET, IRET].iter() {
            assert_eq!(opcode.operand_count(), 0, "{}", opcode.mnemonic());
        }
        for &opcode in [PUSH, POP, PRN, PRA, CALL, JMP, JEQ, JNE, INC, DEC].iter() {
            assert_eq!(opcode.operand_count(), 1, "{}", opcode.mnemonic());
        }
        for &opcode in [LDI, LD, ST, ADD, MULT, CMP].iter() {
            assert_eq!(opcode.operand_count(), 2, "{}", opcode.mnemonic());
        }
    }

    #[test]
    fn alu_and_pc_bits() {
        let alu: Vec<Opcode> = ALL.iter().cloned().filter(|o| o.is_alu()).collect();
        assert_eq!(alu, vec![Opcode::INC, Opcode::DEC, Opcode::ADD, Opcode::MULT, Opcode::CMP]);

        let jumps: Vec<Opcode> = ALL.iter().cloned().filter(|o| o.sets_pc()).collect();
        assert_eq!(jumps, vec![Opcode::RET, Opcode::IRET, Opcode::CALL, Opcode::JMP,
                               Opcode::JEQ, Opcode::JNE]);
    }

    #[test]
    fn instruction_widths() {
        assert_eq!(Opcode::HLT.width(), 1);
        assert_eq!(Opcode::PRN.width(), 2);
        assert_eq!(Opcode::LDI.width(), 3);
    }
}
