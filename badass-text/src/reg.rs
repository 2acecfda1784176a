//! Register layout of the text device's memory-mapped page.
//!
//! Mirrors `TextEmu::Regs` one-to-one; `Reg as usize` is the in-page offset
//! a write to `$d7xx` lands on.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    WinX,
    WinY,
    WinW,
    WinH,

    RealW,
    RealH,

    TextPtr,
    ColorPtr,

    CFillOut,
    CFillIn,

    Keys,
    Freq,
    TimerLo,
    TimerHi,
    Control,
    Charset,
    IrqE,
    IrqR,
}

impl Reg {
    pub const COUNT: usize = 18;

    pub fn from_offset(offset: u8) -> Option<Reg> {
        use Reg::*;
        const ALL: [Reg; Reg::COUNT] = [
            WinX, WinY, WinW, WinH, RealW, RealH, TextPtr, ColorPtr, CFillOut, CFillIn, Keys, Freq, TimerLo, TimerHi,
            Control, Charset, IrqE, IrqR,
        ];
        ALL.get(offset as usize).copied()
    }
}

/// Control register bits (`Reg::Control`).
pub mod control {
    /// Host should terminate cleanly once this bit is observed set.
    pub const STOP: u8 = 1 << 0;
    /// Execution should block until the next display flush.
    pub const BLOCK_FOR_FLUSH: u8 = 1 << 1;
}
