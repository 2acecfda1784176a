//! Fixed geometry of the 6502 address space.

/// Total size of the flat address space.
pub const MEM_SIZE: usize = 0x1_0000;

/// Page the hardware stack lives in ($0100-$01FF).
pub const STACK_PAGE: u16 = 0x0100;

/// Vector addresses.
pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Number of distinct opcode bytes.
pub const OPCODE_COUNT: usize = 256;

/// Number of 256-byte pages in the address space (for banked/callback memory).
pub const PAGE_COUNT: usize = 256;
pub const PAGE_SIZE: usize = 256;
