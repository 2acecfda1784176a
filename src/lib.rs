//! Cycle-accurate 6502/65C02 emulation core.
//!
//! This crate only emulates: it knows nothing about assembling source into
//! bytes. `badass-asm` builds instruction streams against the same
//! [`processor::table_for`] this crate exposes, so encoder and emulator can
//! never disagree about what an opcode byte means.

pub mod constants;
pub mod enums;
pub mod error;
pub mod intercept;
pub mod memory;
pub mod processor;
pub mod register;

pub use enums::{AddressingMode, Cpu, StopReason};
pub use error::Error;
pub use processor::Machine;
pub use register::{Flags, Reg, Registers};
