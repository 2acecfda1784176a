//! The CPU core: register file, opcode table and the fetch-decode-execute loop.

mod core;
mod decimal;
mod opcodes;

pub use self::core::Machine;
pub use opcodes::{table_for, OpMeta, OpcodeTable};

#[cfg(test)]
mod test {
    use super::*;
    use crate::enums::{Cpu, StopReason};
    use crate::memory::{DirectMemory, Memory};

    fn machine() -> Machine<DirectMemory> {
        Machine::new(DirectMemory::new(), Cpu::Mos6502)
    }

    #[test]
    fn lda_immediate_sets_accumulator_and_flags() {
        let mut m = machine();
        m.mem.load(0x0200, &[0xA9, 0x00]);
        m.regs.pc = 0x0200;
        m.step().unwrap();
        assert_eq!(m.regs.a, 0);
        assert!(m.regs.zero());
    }

    #[test]
    fn adc_sets_carry_on_overflow() {
        let mut m = machine();
        m.mem.load(0x0200, &[0xA9, 0xFF, 0x69, 0x01]);
        m.regs.pc = 0x0200;
        m.step().unwrap();
        m.step().unwrap();
        assert_eq!(m.regs.a, 0);
        assert!(m.regs.flags.carry);
        assert!(m.regs.zero());
    }

    #[test]
    fn branch_taken_adds_a_cycle() {
        let mut m = machine();
        m.mem.load(0x0200, &[0xA9, 0x00, 0xF0, 0x02]);
        m.regs.pc = 0x0200;
        m.step().unwrap();
        let before = m.cycles;
        m.step().unwrap();
        assert_eq!(m.cycles - before, 3);
        assert_eq!(m.regs.pc, 0x0206);
    }

    #[test]
    fn jsr_then_rts_round_trips_pc() {
        let mut m = machine();
        m.mem.load(0x0200, &[0x20, 0x00, 0x03]);
        m.mem.load(0x0300, &[0x60]);
        m.regs.pc = 0x0200;
        m.step().unwrap();
        assert_eq!(m.regs.pc, 0x0300);
        m.step().unwrap();
        assert_eq!(m.regs.pc, 0x0203);
    }

    #[test]
    fn rts_with_empty_stack_reports_stack_wrap() {
        let mut m = machine();
        m.mem.load(0x0200, &[0x60]);
        m.regs.pc = 0x0200;
        let reason = m.step().unwrap();
        assert_eq!(reason, Some(StopReason::StackWrap));
    }

    #[test]
    fn illegal_opcode_on_base_6502_for_65c02_only_instruction() {
        let mut m = machine();
        m.mem.load(0x0200, &[0x80, 0x00]); // BRA, 65C02-only
        m.regs.pc = 0x0200;
        let err = m.step().unwrap_err();
        assert_eq!(err, StopReason::IllegalOpcode(0x80));
    }

    #[test]
    fn bra_available_on_65c02() {
        let mut m = Machine::new(DirectMemory::new(), Cpu::W65C02);
        m.mem.load(0x0200, &[0x80, 0x02]);
        m.regs.pc = 0x0200;
        m.step().unwrap();
        assert_eq!(m.regs.pc, 0x0204);
    }

    #[test]
    fn intercept_fires_on_landed_pc() {
        let mut m = machine();
        m.mem.load(0x0200, &[0xEA, 0xEA]);
        m.regs.pc = 0x0200;
        m.intercepts.set(0x0201, Box::new(|_regs| true));
        let reason = m.step().unwrap();
        assert_eq!(reason, Some(StopReason::Intercept));
    }

    #[test]
    fn encode_round_trips_through_table() {
        let table = table_for(Cpu::Mos6502);
        let (byte, meta) = table.encode("lda", crate::enums::AddressingMode::Immediate).unwrap();
        assert_eq!(byte, 0xA9);
        assert_eq!(meta.cycles, 2);
    }
}
