//! The fetch-decode-execute loop.

use super::decimal;
use super::opcodes::{table_for, OpMeta};
use crate::constants::{IRQ_VECTOR, STACK_PAGE};
use crate::enums::{AddressingMode, Cpu, StopReason};
use crate::intercept::Intercepts;
use crate::memory::Memory;
use crate::register::Registers;

/// Where an instruction's operand lives, already resolved to a concrete
/// address or to the accumulator. Immediate operands resolve to the address
/// of the operand byte itself, so reading through it and reading memory
/// agree.
#[derive(Clone, Copy, Debug)]
enum Operand {
    None,
    Accumulator,
    Address(u16),
}

pub struct Machine<M: Memory> {
    pub regs: Registers,
    pub mem: M,
    pub intercepts: Intercepts,
    pub cpu: Cpu,
    pub cycles: u64,
    /// Runs before every fetch; returning `true` stops emulation. Used by
    /// callers that want to drive the loop under a deadline independent of
    /// the intercept table (e.g. a wall-clock watchdog in `!run`).
    pub each_op: Option<Box<dyn FnMut(&Registers) -> bool>>,
}

impl<M: Memory> Machine<M> {
    pub fn new(mem: M, cpu: Cpu) -> Machine<M> {
        Machine {
            regs: Registers::new(),
            mem,
            intercepts: Intercepts::new(),
            cpu,
            cycles: 0,
            each_op: None,
        }
    }

    fn fetch_u8(&mut self) -> u8 {
        let b = self.mem.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        b
    }

    fn fetch_u16(&mut self) -> u16 {
        let lo = self.fetch_u8() as u16;
        let hi = self.fetch_u8() as u16;
        (hi << 8) | lo
    }

    fn push(&mut self, value: u8) {
        self.mem.write(STACK_PAGE + self.regs.sp as u16, value);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }

    fn pop(&mut self) -> u8 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        self.mem.read(STACK_PAGE + self.regs.sp as u16)
    }

    fn push_u16(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push(value as u8);
    }

    fn pop_u16(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }

    /// Decodes the operand for `mode`, advancing `pc` past it. Returns the
    /// resolved operand location plus, for branches, whether the eventual
    /// target crosses the range that earns an extra cycle.
    fn decode(&mut self, mode: AddressingMode) -> Operand {
        match mode {
            AddressingMode::Implied => Operand::None,
            AddressingMode::Accumulator => Operand::Accumulator,
            AddressingMode::Immediate | AddressingMode::Relative => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                Operand::Address(addr)
            }
            AddressingMode::ZeroPage => {
                let zp = self.fetch_u8();
                Operand::Address(zp as u16)
            }
            AddressingMode::ZeroPageX => {
                let zp = self.fetch_u8().wrapping_add(self.regs.x);
                Operand::Address(zp as u16)
            }
            AddressingMode::ZeroPageY => {
                let zp = self.fetch_u8().wrapping_add(self.regs.y);
                Operand::Address(zp as u16)
            }
            AddressingMode::Absolute => {
                let addr = self.fetch_u16();
                Operand::Address(addr)
            }
            AddressingMode::AbsoluteX => {
                let addr = self.fetch_u16().wrapping_add(self.regs.x as u16);
                Operand::Address(addr)
            }
            AddressingMode::AbsoluteY => {
                let addr = self.fetch_u16().wrapping_add(self.regs.y as u16);
                Operand::Address(addr)
            }
            AddressingMode::Indirect => {
                let ptr = self.fetch_u16();
                let lo = self.mem.read(ptr) as u16;
                let hi = self.mem.read(ptr.wrapping_add(1)) as u16;
                Operand::Address((hi << 8) | lo)
            }
            AddressingMode::IndirectX => {
                let zp = self.fetch_u8().wrapping_add(self.regs.x);
                let lo = self.mem.read(zp as u16) as u16;
                let hi = self.mem.read(zp.wrapping_add(1) as u16) as u16;
                Operand::Address((hi << 8) | lo)
            }
            AddressingMode::IndirectY => {
                let zp = self.fetch_u8();
                let lo = self.mem.read(zp as u16) as u16;
                let hi = self.mem.read(zp.wrapping_add(1) as u16) as u16;
                let base = (hi << 8) | lo;
                Operand::Address(base.wrapping_add(self.regs.y as u16))
            }
            AddressingMode::ZeroPageRelative => {
                let zp = self.fetch_u8();
                // The relative byte is consumed by the branch arm itself;
                // park the zero-page address here and leave pc on the offset.
                Operand::Address(zp as u16)
            }
        }
    }

    fn read(&mut self, op: Operand) -> u8 {
        match op {
            Operand::Accumulator => self.regs.a,
            Operand::Address(addr) => self.mem.read(addr),
            Operand::None => 0,
        }
    }

    fn write_back(&mut self, op: Operand, value: u8) {
        match op {
            Operand::Accumulator => {
                self.regs.a = value;
                self.regs.set_result(value);
            }
            Operand::Address(addr) => self.mem.write(addr, value),
            Operand::None => {}
        }
    }

    fn branch(&mut self, addr: u16, taken: bool) -> bool {
        let offset = self.mem.read(addr) as i8;
        if taken {
            self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
        }
        taken
    }

    fn compare(&mut self, reg: u8, value: u8) {
        let result = reg as i16 - value as i16;
        self.regs.flags.carry = reg >= value;
        self.regs.set_result(result as u16 & 0xFF);
    }

    fn shift_left(&mut self, value: u8, fill_carry: bool) -> u8 {
        let carry_in = if fill_carry { self.regs.flags.carry as u8 } else { 0 };
        self.regs.flags.carry = value & 0x80 != 0;
        let result = (value << 1) | carry_in;
        self.regs.set_result(result);
        result
    }

    fn shift_right(&mut self, value: u8, fill_carry: bool) -> u8 {
        let carry_in = if fill_carry { (self.regs.flags.carry as u8) << 7 } else { 0 };
        self.regs.flags.carry = value & 0x01 != 0;
        let result = (value >> 1) | carry_in;
        self.regs.set_result(result);
        result
    }

    /// Executes one instruction. Returns `Ok(None)` to keep running,
    /// `Ok(Some(reason))` when execution should stop, or an error if the
    /// opcode byte has no entry in the active CPU's table.
    pub fn step(&mut self) -> Result<Option<StopReason>, StopReason> {
        if let Some(hook) = self.each_op.as_mut() {
            if hook(&self.regs) {
                return Ok(Some(StopReason::PolicyStop));
            }
        }

        let op_byte = self.fetch_u8();
        let meta: OpMeta = table_for(self.cpu)
            .lookup(op_byte)
            .ok_or(StopReason::IllegalOpcode(op_byte))?;

        let operand = self.decode(meta.mode);
        let mut extra_cycles = 0u64;

        if let Some(reason) = self.execute(meta, operand, &mut extra_cycles)? {
            self.cycles += meta.cycles as u64 + extra_cycles;
            return Ok(Some(reason));
        }

        self.cycles += meta.cycles as u64 + extra_cycles;

        if self.intercepts.fire(self.regs.pc, &self.regs) {
            return Ok(Some(StopReason::Intercept));
        }

        Ok(None)
    }

    /// Runs until a stop condition or `max_cycles` is reached.
    pub fn run_for(&mut self, max_cycles: u64) -> Result<StopReason, StopReason> {
        let start = self.cycles;
        loop {
            if self.cycles.wrapping_sub(start) >= max_cycles {
                return Ok(StopReason::CycleCapReached);
            }
            if let Some(reason) = self.step()? {
                return Ok(reason);
            }
        }
    }

    fn execute(
        &mut self,
        meta: OpMeta,
        operand: Operand,
        extra_cycles: &mut u64,
    ) -> Result<Option<StopReason>, StopReason> {
        macro_rules! bit_op {
            ($mnem:literal, $bit:expr, $set:expr) => {
                if meta.mnemonic.starts_with($mnem) {
                    let addr = match operand {
                        Operand::Address(a) => a,
                        _ => unreachable!(),
                    };
                    let mut v = self.mem.read(addr);
                    if $set {
                        v |= 1 << $bit;
                    } else {
                        v &= !(1 << $bit);
                    }
                    self.mem.write(addr, v);
                    return Ok(None);
                }
            };
        }

        match meta.mnemonic {
            "ADC" => {
                let v = self.read(operand);
                decimal::adc(&mut self.regs, v);
            }
            "SBC" => {
                let v = self.read(operand);
                decimal::sbc(&mut self.regs, v);
            }
            "AND" => {
                let v = self.read(operand);
                self.regs.a &= v;
                self.regs.set_result(self.regs.a);
            }
            "ORA" => {
                let v = self.read(operand);
                self.regs.a |= v;
                self.regs.set_result(self.regs.a);
            }
            "EOR" => {
                let v = self.read(operand);
                self.regs.a ^= v;
                self.regs.set_result(self.regs.a);
            }
            "ASL" => {
                let v = self.read(operand);
                let r = self.shift_left(v, false);
                self.write_back(operand, r);
            }
            "ROL" => {
                let v = self.read(operand);
                let r = self.shift_left(v, true);
                self.write_back(operand, r);
            }
            "LSR" => {
                let v = self.read(operand);
                let r = self.shift_right(v, false);
                self.write_back(operand, r);
            }
            "ROR" => {
                let v = self.read(operand);
                let r = self.shift_right(v, true);
                self.write_back(operand, r);
            }
            "BIT" => {
                let v = self.read(operand);
                self.regs.flags.overflow = v & 0x40 != 0;
                let z = (self.regs.a & v) == 0;
                let low: u16 = if z { 0 } else { 1 };
                self.regs.set_result(low | (v as u16 & 0x80));
            }
            "TRB" => {
                let addr = match operand {
                    Operand::Address(a) => a,
                    _ => unreachable!(),
                };
                let v = self.mem.read(addr);
                let z = (self.regs.a & v) == 0;
                self.mem.write(addr, v & !self.regs.a);
                self.regs.set_result(if z { 0u16 } else { 1 });
            }
            "TSB" => {
                let addr = match operand {
                    Operand::Address(a) => a,
                    _ => unreachable!(),
                };
                let v = self.mem.read(addr);
                let z = (self.regs.a & v) == 0;
                self.mem.write(addr, v | self.regs.a);
                self.regs.set_result(if z { 0u16 } else { 1 });
            }
            "CMP" => {
                let v = self.read(operand);
                self.compare(self.regs.a, v);
            }
            "CPX" => {
                let v = self.read(operand);
                self.compare(self.regs.x, v);
            }
            "CPY" => {
                let v = self.read(operand);
                self.compare(self.regs.y, v);
            }
            "DEC" => {
                let v = self.read(operand).wrapping_sub(1);
                self.regs.set_result(v);
                self.write_back(operand, v);
            }
            "INC" => {
                let v = self.read(operand).wrapping_add(1);
                self.regs.set_result(v);
                self.write_back(operand, v);
            }
            "DEX" => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.set_result(self.regs.x);
            }
            "DEY" => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.set_result(self.regs.y);
            }
            "INX" => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.set_result(self.regs.x);
            }
            "INY" => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.set_result(self.regs.y);
            }
            "LDA" => {
                self.regs.a = self.read(operand);
                self.regs.set_result(self.regs.a);
            }
            "LDX" => {
                self.regs.x = self.read(operand);
                self.regs.set_result(self.regs.x);
            }
            "LDY" => {
                self.regs.y = self.read(operand);
                self.regs.set_result(self.regs.y);
            }
            "STA" => self.write_back(operand, self.regs.a),
            "STX" => self.write_back(operand, self.regs.x),
            "STY" => self.write_back(operand, self.regs.y),
            "STZ" => self.write_back(operand, 0),
            "TAX" => {
                self.regs.x = self.regs.a;
                self.regs.set_result(self.regs.x);
            }
            "TAY" => {
                self.regs.y = self.regs.a;
                self.regs.set_result(self.regs.y);
            }
            "TXA" => {
                self.regs.a = self.regs.x;
                self.regs.set_result(self.regs.a);
            }
            "TYA" => {
                self.regs.a = self.regs.y;
                self.regs.set_result(self.regs.a);
            }
            "TSX" => {
                self.regs.x = self.regs.sp;
                self.regs.set_result(self.regs.x);
            }
            "TXS" => self.regs.sp = self.regs.x,
            "PHA" => self.push(self.regs.a),
            "PHX" => self.push(self.regs.x),
            "PHY" => self.push(self.regs.y),
            "PHP" => {
                let mut sr = self.regs.status_byte();
                sr |= 0x10;
                self.push(sr);
            }
            "PLA" => {
                self.regs.a = self.pop();
                self.regs.set_result(self.regs.a);
            }
            "PLX" => {
                self.regs.x = self.pop();
                self.regs.set_result(self.regs.x);
            }
            "PLY" => {
                self.regs.y = self.pop();
                self.regs.set_result(self.regs.y);
            }
            "PLP" => {
                let sr = self.pop();
                self.regs.set_status_byte(sr);
            }
            "CLC" => self.regs.flags.carry = false,
            "SEC" => self.regs.flags.carry = true,
            "CLD" => self.regs.flags.decimal = false,
            "SED" => self.regs.flags.decimal = true,
            "CLI" => self.regs.flags.irq_disable = false,
            "SEI" => self.regs.flags.irq_disable = true,
            "CLV" => self.regs.flags.overflow = false,
            "NOP" => {}
            "JMP" => {
                let addr = match operand {
                    Operand::Address(a) => a,
                    _ => unreachable!(),
                };
                self.regs.pc = addr;
            }
            "JSR" => {
                let addr = match operand {
                    Operand::Address(a) => a,
                    _ => unreachable!(),
                };
                let return_addr = self.regs.pc.wrapping_sub(1);
                self.push_u16(return_addr);
                self.regs.pc = addr;
            }
            "RTS" => {
                if self.regs.sp == 0xFF {
                    return Ok(Some(StopReason::StackWrap));
                }
                let addr = self.pop_u16();
                self.regs.pc = addr.wrapping_add(1);
            }
            "RTI" => {
                let sr = self.pop();
                self.regs.set_status_byte(sr);
                self.regs.pc = self.pop_u16();
            }
            "BRK" => {
                let ret = self.regs.pc.wrapping_add(1);
                self.push_u16(ret);
                let mut sr = self.regs.status_byte();
                sr |= 0x10;
                self.push(sr);
                self.regs.flags.irq_disable = true;
                let lo = self.mem.read(IRQ_VECTOR) as u16;
                let hi = self.mem.read(IRQ_VECTOR.wrapping_add(1)) as u16;
                self.regs.pc = (hi << 8) | lo;
            }
            "BRA" => {
                let addr = match operand {
                    Operand::Address(a) => a,
                    _ => unreachable!(),
                };
                self.branch(addr, true);
            }
            "BCC" => {
                if let Operand::Address(a) = operand {
                    if self.branch(a, !self.regs.flags.carry) {
                        *extra_cycles += 1;
                    }
                }
            }
            "BCS" => {
                if let Operand::Address(a) = operand {
                    if self.branch(a, self.regs.flags.carry) {
                        *extra_cycles += 1;
                    }
                }
            }
            "BEQ" => {
                if let Operand::Address(a) = operand {
                    if self.branch(a, self.regs.zero()) {
                        *extra_cycles += 1;
                    }
                }
            }
            "BNE" => {
                if let Operand::Address(a) = operand {
                    if self.branch(a, !self.regs.zero()) {
                        *extra_cycles += 1;
                    }
                }
            }
            "BMI" => {
                if let Operand::Address(a) = operand {
                    if self.branch(a, self.regs.sign()) {
                        *extra_cycles += 1;
                    }
                }
            }
            "BPL" => {
                if let Operand::Address(a) = operand {
                    if self.branch(a, !self.regs.sign()) {
                        *extra_cycles += 1;
                    }
                }
            }
            "BVC" => {
                if let Operand::Address(a) = operand {
                    if self.branch(a, !self.regs.flags.overflow) {
                        *extra_cycles += 1;
                    }
                }
            }
            "BVS" => {
                if let Operand::Address(a) = operand {
                    if self.branch(a, self.regs.flags.overflow) {
                        *extra_cycles += 1;
                    }
                }
            }
            mnem if mnem.starts_with("BBR") || mnem.starts_with("BBS") => {
                let zp = match operand {
                    Operand::Address(a) => a,
                    _ => unreachable!(),
                };
                let bit: u32 = mnem[3..].parse().unwrap();
                let rel_addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let v = self.mem.read(zp);
                let set = v & (1 << bit) != 0;
                let take = if mnem.starts_with("BBR") { !set } else { set };
                self.branch(rel_addr, take);
            }
            mnem if mnem.starts_with("RMB") => {
                bit_op!("RMB", mnem[3..].parse::<u32>().unwrap(), false);
            }
            mnem if mnem.starts_with("SMB") => {
                bit_op!("SMB", mnem[3..].parse::<u32>().unwrap(), true);
            }
            other => unreachable!("unhandled mnemonic {other}"),
        }

        Ok(None)
    }
}
