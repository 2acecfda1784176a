//! The table mapping opcode bytes to mnemonic/addressing-mode/cycle-count
//! metadata, and its reverse index used by the instruction encoder.
//!
//! Built once per process via `lazy_static`, the way `colinrozzi-runtime_v2`
//! and `emdash-udashboard` construct their own lazily-initialized statics.

use crate::constants::OPCODE_COUNT;
use crate::enums::{AddressingMode, Cpu};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpMeta {
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub cycles: u8,
    /// The CPU generation this opcode first appears on.
    pub cpu: Cpu,
}

pub struct OpcodeTable {
    by_byte: [Option<OpMeta>; OPCODE_COUNT],
    by_mnemonic: HashMap<(&'static str, AddressingMode), u8>,
}

impl OpcodeTable {
    pub fn lookup(&self, byte: u8) -> Option<OpMeta> {
        self.by_byte[byte as usize]
    }

    /// Finds the opcode byte for an exact (mnemonic, mode) pair.
    pub fn encode(&self, mnemonic: &str, mode: AddressingMode) -> Option<(u8, OpMeta)> {
        let upper = mnemonic.to_ascii_uppercase();
        self.by_mnemonic
            .iter()
            .find(|((name, m), _)| *name == upper.as_str() && *m == mode)
            .map(|(_, &byte)| (byte, self.by_byte[byte as usize].unwrap()))
    }

    /// All addressing modes this mnemonic supports, for mode-reconciliation fallback.
    pub fn modes_for(&self, mnemonic: &str) -> Vec<AddressingMode> {
        let upper = mnemonic.to_ascii_uppercase();
        self.by_mnemonic
            .keys()
            .filter(|(name, _)| *name == upper.as_str())
            .map(|(_, mode)| *mode)
            .collect()
    }
}

macro_rules! table {
    ($($byte:literal => ($mnem:literal, $mode:expr, $cycles:literal, $cpu:expr)),* $(,)?) => {{
        let mut by_byte: [Option<OpMeta>; OPCODE_COUNT] = [None; OPCODE_COUNT];
        let mut by_mnemonic = HashMap::new();
        $(
            let meta = OpMeta { mnemonic: $mnem, mode: $mode, cycles: $cycles, cpu: $cpu };
            by_byte[$byte as usize] = Some(meta);
            by_mnemonic.insert(($mnem, $mode), $byte as u8);
        )*
        OpcodeTable { by_byte, by_mnemonic }
    }};
}

use AddressingMode::*;
use Cpu::{Mos6502, W65C02};

fn build_table() -> OpcodeTable {
    table! {
        0x69 => ("ADC", Immediate, 2, Mos6502), 0x65 => ("ADC", ZeroPage, 3, Mos6502),
        0x75 => ("ADC", ZeroPageX, 4, Mos6502), 0x6D => ("ADC", Absolute, 4, Mos6502),
        0x7D => ("ADC", AbsoluteX, 4, Mos6502), 0x79 => ("ADC", AbsoluteY, 4, Mos6502),
        0x61 => ("ADC", IndirectX, 6, Mos6502), 0x71 => ("ADC", IndirectY, 5, Mos6502),

        0x29 => ("AND", Immediate, 2, Mos6502), 0x25 => ("AND", ZeroPage, 3, Mos6502),
        0x35 => ("AND", ZeroPageX, 4, Mos6502), 0x2D => ("AND", Absolute, 4, Mos6502),
        0x3D => ("AND", AbsoluteX, 4, Mos6502), 0x39 => ("AND", AbsoluteY, 4, Mos6502),
        0x21 => ("AND", IndirectX, 6, Mos6502), 0x31 => ("AND", IndirectY, 5, Mos6502),

        0x0A => ("ASL", Accumulator, 2, Mos6502), 0x06 => ("ASL", ZeroPage, 5, Mos6502),
        0x16 => ("ASL", ZeroPageX, 6, Mos6502), 0x0E => ("ASL", Absolute, 6, Mos6502),
        0x1E => ("ASL", AbsoluteX, 7, Mos6502),

        0x90 => ("BCC", Relative, 2, Mos6502), 0xB0 => ("BCS", Relative, 2, Mos6502),
        0xF0 => ("BEQ", Relative, 2, Mos6502), 0x30 => ("BMI", Relative, 2, Mos6502),
        0xD0 => ("BNE", Relative, 2, Mos6502), 0x10 => ("BPL", Relative, 2, Mos6502),
        0x50 => ("BVC", Relative, 2, Mos6502), 0x70 => ("BVS", Relative, 2, Mos6502),

        0x24 => ("BIT", ZeroPage, 3, Mos6502), 0x2C => ("BIT", Absolute, 4, Mos6502),

        0x00 => ("BRK", Implied, 7, Mos6502),

        0x18 => ("CLC", Implied, 2, Mos6502), 0xD8 => ("CLD", Implied, 2, Mos6502),
        0x58 => ("CLI", Implied, 2, Mos6502), 0xB8 => ("CLV", Implied, 2, Mos6502),

        0xC9 => ("CMP", Immediate, 2, Mos6502), 0xC5 => ("CMP", ZeroPage, 3, Mos6502),
        0xD5 => ("CMP", ZeroPageX, 4, Mos6502), 0xCD => ("CMP", Absolute, 4, Mos6502),
        0xDD => ("CMP", AbsoluteX, 4, Mos6502), 0xD9 => ("CMP", AbsoluteY, 4, Mos6502),
        0xC1 => ("CMP", IndirectX, 6, Mos6502), 0xD1 => ("CMP", IndirectY, 5, Mos6502),

        0xE0 => ("CPX", Immediate, 2, Mos6502), 0xE4 => ("CPX", ZeroPage, 3, Mos6502),
        0xEC => ("CPX", Absolute, 4, Mos6502),
        0xC0 => ("CPY", Immediate, 2, Mos6502), 0xC4 => ("CPY", ZeroPage, 3, Mos6502),
        0xCC => ("CPY", Absolute, 4, Mos6502),

        0xC6 => ("DEC", ZeroPage, 5, Mos6502), 0xD6 => ("DEC", ZeroPageX, 6, Mos6502),
        0xCE => ("DEC", Absolute, 6, Mos6502), 0xDE => ("DEC", AbsoluteX, 7, Mos6502),
        0xCA => ("DEX", Implied, 2, Mos6502), 0x88 => ("DEY", Implied, 2, Mos6502),

        0x49 => ("EOR", Immediate, 2, Mos6502), 0x45 => ("EOR", ZeroPage, 3, Mos6502),
        0x55 => ("EOR", ZeroPageX, 4, Mos6502), 0x4D => ("EOR", Absolute, 4, Mos6502),
        0x5D => ("EOR", AbsoluteX, 4, Mos6502), 0x59 => ("EOR", AbsoluteY, 4, Mos6502),
        0x41 => ("EOR", IndirectX, 6, Mos6502), 0x51 => ("EOR", IndirectY, 5, Mos6502),

        0xE6 => ("INC", ZeroPage, 5, Mos6502), 0xF6 => ("INC", ZeroPageX, 6, Mos6502),
        0xEE => ("INC", Absolute, 6, Mos6502), 0xFE => ("INC", AbsoluteX, 7, Mos6502),
        0xE8 => ("INX", Implied, 2, Mos6502), 0xC8 => ("INY", Implied, 2, Mos6502),

        0x4C => ("JMP", Absolute, 3, Mos6502), 0x6C => ("JMP", Indirect, 5, Mos6502),
        0x20 => ("JSR", Absolute, 6, Mos6502),

        0xA9 => ("LDA", Immediate, 2, Mos6502), 0xA5 => ("LDA", ZeroPage, 3, Mos6502),
        0xB5 => ("LDA", ZeroPageX, 4, Mos6502), 0xAD => ("LDA", Absolute, 4, Mos6502),
        0xBD => ("LDA", AbsoluteX, 4, Mos6502), 0xB9 => ("LDA", AbsoluteY, 4, Mos6502),
        0xA1 => ("LDA", IndirectX, 6, Mos6502), 0xB1 => ("LDA", IndirectY, 5, Mos6502),

        0xA2 => ("LDX", Immediate, 2, Mos6502), 0xA6 => ("LDX", ZeroPage, 3, Mos6502),
        0xB6 => ("LDX", ZeroPageY, 4, Mos6502), 0xAE => ("LDX", Absolute, 4, Mos6502),
        0xBE => ("LDX", AbsoluteY, 4, Mos6502),

        0xA0 => ("LDY", Immediate, 2, Mos6502), 0xA4 => ("LDY", ZeroPage, 3, Mos6502),
        0xB4 => ("LDY", ZeroPageX, 4, Mos6502), 0xAC => ("LDY", Absolute, 4, Mos6502),
        0xBC => ("LDY", AbsoluteX, 4, Mos6502),

        0x4A => ("LSR", Accumulator, 2, Mos6502), 0x46 => ("LSR", ZeroPage, 5, Mos6502),
        0x56 => ("LSR", ZeroPageX, 6, Mos6502), 0x4E => ("LSR", Absolute, 6, Mos6502),
        0x5E => ("LSR", AbsoluteX, 7, Mos6502),

        0xEA => ("NOP", Implied, 2, Mos6502),

        0x09 => ("ORA", Immediate, 2, Mos6502), 0x05 => ("ORA", ZeroPage, 3, Mos6502),
        0x15 => ("ORA", ZeroPageX, 4, Mos6502), 0x0D => ("ORA", Absolute, 4, Mos6502),
        0x1D => ("ORA", AbsoluteX, 4, Mos6502), 0x19 => ("ORA", AbsoluteY, 4, Mos6502),
        0x01 => ("ORA", IndirectX, 6, Mos6502), 0x11 => ("ORA", IndirectY, 5, Mos6502),

        0x48 => ("PHA", Implied, 3, Mos6502), 0x08 => ("PHP", Implied, 3, Mos6502),
        0x68 => ("PLA", Implied, 4, Mos6502), 0x28 => ("PLP", Implied, 4, Mos6502),

        0x2A => ("ROL", Accumulator, 2, Mos6502), 0x26 => ("ROL", ZeroPage, 5, Mos6502),
        0x36 => ("ROL", ZeroPageX, 6, Mos6502), 0x2E => ("ROL", Absolute, 6, Mos6502),
        0x3E => ("ROL", AbsoluteX, 7, Mos6502),

        0x6A => ("ROR", Accumulator, 2, Mos6502), 0x66 => ("ROR", ZeroPage, 5, Mos6502),
        0x76 => ("ROR", ZeroPageX, 6, Mos6502), 0x6E => ("ROR", Absolute, 6, Mos6502),
        0x7E => ("ROR", AbsoluteX, 7, Mos6502),

        0x40 => ("RTI", Implied, 6, Mos6502), 0x60 => ("RTS", Implied, 6, Mos6502),

        0xE9 => ("SBC", Immediate, 2, Mos6502), 0xE5 => ("SBC", ZeroPage, 3, Mos6502),
        0xF5 => ("SBC", ZeroPageX, 4, Mos6502), 0xED => ("SBC", Absolute, 4, Mos6502),
        0xFD => ("SBC", AbsoluteX, 4, Mos6502), 0xF9 => ("SBC", AbsoluteY, 4, Mos6502),
        0xE1 => ("SBC", IndirectX, 6, Mos6502), 0xF1 => ("SBC", IndirectY, 5, Mos6502),

        0x38 => ("SEC", Implied, 2, Mos6502), 0xF8 => ("SED", Implied, 2, Mos6502),
        0x78 => ("SEI", Implied, 2, Mos6502),

        0x85 => ("STA", ZeroPage, 3, Mos6502), 0x95 => ("STA", ZeroPageX, 4, Mos6502),
        0x8D => ("STA", Absolute, 4, Mos6502), 0x9D => ("STA", AbsoluteX, 5, Mos6502),
        0x99 => ("STA", AbsoluteY, 5, Mos6502), 0x81 => ("STA", IndirectX, 6, Mos6502),
        0x91 => ("STA", IndirectY, 6, Mos6502),

        0x86 => ("STX", ZeroPage, 3, Mos6502), 0x96 => ("STX", ZeroPageY, 4, Mos6502),
        0x8E => ("STX", Absolute, 4, Mos6502),
        0x84 => ("STY", ZeroPage, 3, Mos6502), 0x94 => ("STY", ZeroPageX, 4, Mos6502),
        0x8C => ("STY", Absolute, 4, Mos6502),

        0xAA => ("TAX", Implied, 2, Mos6502), 0xA8 => ("TAY", Implied, 2, Mos6502),
        0xBA => ("TSX", Implied, 2, Mos6502), 0x8A => ("TXA", Implied, 2, Mos6502),
        0x9A => ("TXS", Implied, 2, Mos6502), 0x98 => ("TYA", Implied, 2, Mos6502),

        // 65C02 additions
        0x64 => ("STZ", ZeroPage, 3, W65C02), 0x74 => ("STZ", ZeroPageX, 4, W65C02),
        0x9C => ("STZ", Absolute, 4, W65C02), 0x9E => ("STZ", AbsoluteX, 5, W65C02),
        0xDA => ("PHX", Implied, 3, W65C02), 0x5A => ("PHY", Implied, 3, W65C02),
        0xFA => ("PLX", Implied, 4, W65C02), 0x7A => ("PLY", Implied, 4, W65C02),
        0x80 => ("BRA", Relative, 3, W65C02),
        0x14 => ("TRB", ZeroPage, 5, W65C02), 0x1C => ("TRB", Absolute, 6, W65C02),
        0x04 => ("TSB", ZeroPage, 5, W65C02), 0x0C => ("TSB", Absolute, 6, W65C02),

        0x0F => ("BBR0", ZeroPageRelative, 5, W65C02), 0x1F => ("BBR1", ZeroPageRelative, 5, W65C02),
        0x2F => ("BBR2", ZeroPageRelative, 5, W65C02), 0x3F => ("BBR3", ZeroPageRelative, 5, W65C02),
        0x4F => ("BBR4", ZeroPageRelative, 5, W65C02), 0x5F => ("BBR5", ZeroPageRelative, 5, W65C02),
        0x6F => ("BBR6", ZeroPageRelative, 5, W65C02), 0x7F => ("BBR7", ZeroPageRelative, 5, W65C02),

        0x8F => ("BBS0", ZeroPageRelative, 5, W65C02), 0x9F => ("BBS1", ZeroPageRelative, 5, W65C02),
        0xAF => ("BBS2", ZeroPageRelative, 5, W65C02), 0xBF => ("BBS3", ZeroPageRelative, 5, W65C02),
        0xCF => ("BBS4", ZeroPageRelative, 5, W65C02), 0xDF => ("BBS5", ZeroPageRelative, 5, W65C02),
        0xEF => ("BBS6", ZeroPageRelative, 5, W65C02), 0xFF => ("BBS7", ZeroPageRelative, 5, W65C02),

        0x07 => ("RMB0", ZeroPage, 5, W65C02), 0x17 => ("RMB1", ZeroPage, 5, W65C02),
        0x27 => ("RMB2", ZeroPage, 5, W65C02), 0x37 => ("RMB3", ZeroPage, 5, W65C02),
        0x47 => ("RMB4", ZeroPage, 5, W65C02), 0x57 => ("RMB5", ZeroPage, 5, W65C02),
        0x67 => ("RMB6", ZeroPage, 5, W65C02), 0x77 => ("RMB7", ZeroPage, 5, W65C02),

        0x87 => ("SMB0", ZeroPage, 5, W65C02), 0x97 => ("SMB1", ZeroPage, 5, W65C02),
        0xA7 => ("SMB2", ZeroPage, 5, W65C02), 0xB7 => ("SMB3", ZeroPage, 5, W65C02),
        0xC7 => ("SMB4", ZeroPage, 5, W65C02), 0xD7 => ("SMB5", ZeroPage, 5, W65C02),
        0xE7 => ("SMB6", ZeroPage, 5, W65C02), 0xF7 => ("SMB7", ZeroPage, 5, W65C02),
    }
}

lazy_static::lazy_static! {
    pub static ref MOS6502_TABLE: OpcodeTable = {
        let mut t = build_table();
        t.by_byte.iter_mut().for_each(|slot| {
            if matches!(slot, Some(meta) if meta.cpu == W65C02) {
                *slot = None;
            }
        });
        t.by_mnemonic.retain(|_, byte| t.by_byte[*byte as usize].is_some());
        t
    };

    pub static ref W65C02_TABLE: OpcodeTable = build_table();
}

pub fn table_for(cpu: Cpu) -> &'static OpcodeTable {
    match cpu {
        Cpu::Mos6502 => &MOS6502_TABLE,
        Cpu::W65C02 => &W65C02_TABLE,
    }
}
