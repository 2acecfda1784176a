//! Small enums shared by the opcode table, the disassembler and the
//! instruction encoder in `badass-asm`.

/// The subset of 65xx CPUs this emulator understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cpu {
    /// Base NMOS 6502 instruction set.
    Mos6502,
    /// 65C02, adding `stz`, `phx/phy/plx/ply`, `bra`, `bbr/bbs`, `rmb/smb`, `trb/tsb`.
    W65C02,
}

/// Addressing modes recognized by the grammar and the opcode table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
    /// bbr/bbs/rmb/smb: bit index folded into the mnemonic, zero-page byte, relative displacement.
    ZeroPageRelative,
}

impl AddressingMode {
    /// Size in bytes of the operand alone (not counting the opcode byte).
    pub fn operand_size(self) -> usize {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY
            | AddressingMode::Relative => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
            AddressingMode::ZeroPageRelative => 2,
        }
    }

    /// Total instruction size including the opcode byte.
    pub fn instruction_size(self) -> usize {
        1 + self.operand_size()
    }

    /// Whether this mode has a single-byte zero-page equivalent that a wider
    /// mode can be promoted to when the operand fits in a byte.
    pub fn zero_page_equivalent(self) -> Option<AddressingMode> {
        match self {
            AddressingMode::Absolute => Some(AddressingMode::ZeroPage),
            AddressingMode::AbsoluteX => Some(AddressingMode::ZeroPageX),
            AddressingMode::AbsoluteY => Some(AddressingMode::ZeroPageY),
            AddressingMode::Indirect => Some(AddressingMode::ZeroPage),
            _ => None,
        }
    }
}

/// Why emulation stopped. Mirrors the teacher's `ExitCode`, extended with
/// the 6502-specific stop conditions from the spec (stack-wrap, intercept,
/// cycle-cap).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// `RTS` executed with `SP == 0xFF`: the emulated "main" returned.
    StackWrap,
    /// An intercept's predicate returned `true`.
    Intercept,
    /// The policy's `each_op` hook requested a stop.
    PolicyStop,
    /// The cycle budget passed to `run_for` was exhausted.
    CycleCapReached,
    /// Fetched a byte with no entry in the opcode table for the active CPU.
    IllegalOpcode(u8),
}
