//! Turns a parsed `Stmt::Instruction` plus an already-evaluated operand
//! value into an opcode byte and its trailing operand bytes.
//!
//! Addressing-mode reconciliation: the grammar can't tell `lda $10` (zero
//! page) from `lda $1000` (absolute) apart from the operand's value, so the
//! encoder picks the narrowest mode the opcode table has for the mnemonic,
//! falling back to the wider one once the value no longer fits. A `.b`
//! suffix forces the zero-page form even while the value is still unknown
//! (first passes, forward references).

use crate::ast::InstrArg;
use crate::error::Error;
use sixfive::enums::{AddressingMode, Cpu};
use sixfive::processor::table_for;

pub struct Encoded {
    pub opcode: u8,
    pub operand: Vec<u8>,
}

fn fits_zero_page(value: i64) -> bool {
    (0..=0xFF).contains(&value)
}

/// Resolves `mnemonic`/`arg` against `value` (the already-evaluated operand,
/// or `None` for implied/accumulator) into bytes. `force_zp` is set by the
/// `.b` suffix.
pub fn encode(
    cpu: Cpu,
    mnemonic: &str,
    arg: Option<&InstrArg>,
    value: Option<i64>,
    force_zp: bool,
) -> Result<Encoded, Error> {
    let table = table_for(cpu);

    let mode = match arg {
        None => AddressingMode::Implied,
        Some(InstrArg::Accumulator) => AddressingMode::Accumulator,
        Some(InstrArg::Immediate(_)) => AddressingMode::Immediate,
        Some(InstrArg::IndX(_)) => AddressingMode::IndirectX,
        Some(InstrArg::IndY(_)) => AddressingMode::IndirectY,
        Some(InstrArg::Indirect(_)) => AddressingMode::Indirect,
        Some(InstrArg::AbsoluteX(_)) => pick_indexed(table, mnemonic, value, force_zp, AddressingMode::AbsoluteX, AddressingMode::ZeroPageX),
        Some(InstrArg::AbsoluteY(_)) => pick_indexed(table, mnemonic, value, force_zp, AddressingMode::AbsoluteY, AddressingMode::ZeroPageY),
        Some(InstrArg::LabelRef(_)) => AddressingMode::Relative,
        Some(InstrArg::ZeroPageRelative { .. }) => AddressingMode::ZeroPageRelative,
        Some(InstrArg::Operand(_)) => pick_plain(table, mnemonic, value, force_zp),
    };

    let (opcode, meta) = table
        .encode(mnemonic, mode)
        .ok_or_else(|| Error::Illegal(format!("{mnemonic} does not support this addressing mode on {cpu:?}", cpu = cpu)))?;

    let operand = match meta.mode.operand_size() {
        0 => Vec::new(),
        1 => vec![value.unwrap_or(0) as u8],
        2 => {
            let v = value.unwrap_or(0) as u16;
            vec![v as u8, (v >> 8) as u8]
        }
        n => unreachable!("addressing mode with unexpected operand size {n}"),
    };

    Ok(Encoded { opcode, operand })
}

/// `bbr`/`bbs`/`rmb`/`smb`-style zero-page + relative-displacement operand:
/// two explicitly-given bytes rather than a single value split by mode.
pub fn encode_zero_page_relative(cpu: Cpu, mnemonic: &str, zp: u8, rel: i8) -> Result<Encoded, Error> {
    let table = table_for(cpu);
    let (opcode, _) = table
        .encode(mnemonic, AddressingMode::ZeroPageRelative)
        .ok_or_else(|| Error::Illegal(format!("{mnemonic} has no zero-page-relative form on {cpu:?}")))?;
    Ok(Encoded { opcode, operand: vec![zp, rel as u8] })
}

fn pick_plain(
    table: &sixfive::processor::OpcodeTable,
    mnemonic: &str,
    value: Option<i64>,
    force_zp: bool,
) -> AddressingMode {
    let has_zp = table.encode(mnemonic, AddressingMode::ZeroPage).is_some();
    let has_rel = table.encode(mnemonic, AddressingMode::Relative).is_some();
    if has_rel && !has_zp {
        return AddressingMode::Relative;
    }
    let zp_fits = force_zp || value.map(fits_zero_page).unwrap_or(false);
    if has_zp && zp_fits {
        AddressingMode::ZeroPage
    } else {
        AddressingMode::Absolute
    }
}

fn pick_indexed(
    table: &sixfive::processor::OpcodeTable,
    mnemonic: &str,
    value: Option<i64>,
    force_zp: bool,
    wide: AddressingMode,
    narrow: AddressingMode,
) -> AddressingMode {
    let has_narrow = table.encode(mnemonic, narrow).is_some();
    let fits = force_zp || value.map(fits_zero_page).unwrap_or(false);
    if has_narrow && fits {
        narrow
    } else {
        wide
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lda_promotes_to_zero_page_when_value_fits() {
        let e = encode(Cpu::Mos6502, "LDA", Some(&InstrArg::Operand(crate::ast::Expr::Number(0.0))), Some(0x10), false).unwrap();
        assert_eq!(e.opcode, 0xA5);
        assert_eq!(e.operand, vec![0x10]);
    }

    #[test]
    fn lda_stays_absolute_when_value_does_not_fit() {
        let e = encode(Cpu::Mos6502, "LDA", Some(&InstrArg::Operand(crate::ast::Expr::Number(0.0))), Some(0x1234), false).unwrap();
        assert_eq!(e.opcode, 0xAD);
        assert_eq!(e.operand, vec![0x34, 0x12]);
    }

    #[test]
    fn dot_b_suffix_forces_zero_page_before_value_is_known() {
        let e = encode(Cpu::Mos6502, "LDA", Some(&InstrArg::Operand(crate::ast::Expr::Number(0.0))), None, true).unwrap();
        assert_eq!(e.opcode, 0xA5);
    }

    #[test]
    fn branch_uses_relative_mode() {
        let e = encode(Cpu::Mos6502, "BEQ", Some(&InstrArg::LabelRef(0)), Some(5), false).unwrap();
        assert_eq!(e.opcode, 0xF0);
        assert_eq!(e.operand, vec![5]);
    }

    #[test]
    fn implied_instruction_has_no_operand_bytes() {
        let e = encode(Cpu::Mos6502, "NOP", None, None, false).unwrap();
        assert_eq!(e.opcode, 0xEA);
        assert!(e.operand.is_empty());
    }
}
