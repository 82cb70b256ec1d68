//! 2A03 CPU core (6502 without decimal mode).
//!
//! [CPU](https://www.nesdev.org/wiki/CPU): one call to [`Cpu::step`] runs one instruction, or
//! services one pending interrupt, and returns the cycles it took. Decoding goes through the
//! [`OPCODES`](crate::cpu::opcodes::OPCODES) table; execution is a single `match` on the
//! operation tag.

use crate::{
    bus::Bus,
    cpu::{
        flags::{
            FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_INTERRUPT_DISABLE, FLAG_NEGATIVE,
            FLAG_OVERFLOW, FLAG_UNUSED, FLAG_ZERO,
        },
        opcodes::{AddressingMode, Operation, decode},
        registers::CpuRegisters,
    },
};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles taken by RESET and by NMI/IRQ entry.
const INTERRUPT_CYCLES: u32 = 7;

pub struct Cpu<B: Bus> {
    pub(crate) regs: CpuRegisters,
    pub(crate) bus: B,
    total_cycles: u64,
    nmi_pending: bool,
    irq_pending: bool,
}

impl<B: Bus> Cpu<B> {
    pub fn new(bus: B) -> Self {
        Self {
            regs: CpuRegisters::default(),
            bus,
            total_cycles: 0,
            nmi_pending: false,
            irq_pending: false,
        }
    }

    /// Power-on/RESET: SP = $FD, P = $24, PC from $FFFC/$FFFD. Pending interrupts are dropped.
    pub fn reset(&mut self) {
        self.regs = CpuRegisters::default();
        self.regs.pc = self.read_word(RESET_VECTOR);
        self.nmi_pending = false;
        self.irq_pending = false;
        self.total_cycles = INTERRUPT_CYCLES as u64;
    }

    /// Latch an NMI; serviced before the next instruction.
    pub fn trigger_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Latch an IRQ; serviced before the next instruction once I is clear.
    pub fn trigger_irq(&mut self) {
        self.irq_pending = true;
    }

    pub fn registers(&self) -> CpuRegisters {
        self.regs
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Execute one instruction or interrupt entry. Returns CPU cycles consumed.
    pub fn step(&mut self) -> u32 {
        let cycles = if self.nmi_pending {
            self.nmi_pending = false;
            self.interrupt(NMI_VECTOR)
        } else if self.irq_pending && !self.regs.flag(FLAG_INTERRUPT_DISABLE) {
            self.irq_pending = false;
            self.interrupt(IRQ_VECTOR)
        } else {
            let opcode = self.fetch_byte();
            self.execute(opcode)
        };

        self.total_cycles += cycles as u64;
        cycles
    }

    /// Hardware interrupt entry: push PC and P (B clear), set I, jump through `vector`.
    fn interrupt(&mut self, vector: u16) -> u32 {
        self.push_word(self.regs.pc);
        self.push((self.regs.status & !FLAG_BREAK) | FLAG_UNUSED);
        self.regs.set_flag(FLAG_INTERRUPT_DISABLE, true);
        self.regs.pc = self.read_word(vector);
        INTERRUPT_CYCLES
    }

    fn read(&mut self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.bus.write(addr, data);
    }

    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// 16-bit read from the zero page; the pointer's high byte wraps within page 0.
    fn read_word_zp(&mut self, ptr: u8) -> u16 {
        let lo = self.read(ptr as u16) as u16;
        let hi = self.read(ptr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    fn fetch_byte(&mut self) -> u8 {
        let byte = self.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        byte
    }

    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        (hi << 8) | lo
    }

    fn push(&mut self, value: u8) {
        let addr = 0x0100 | self.regs.sp as u16;
        self.write(addr, value);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }

    fn pop(&mut self) -> u8 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        self.read(0x0100 | self.regs.sp as u16)
    }

    fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push(value as u8);
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }

    /// Effective address for `mode` plus whether indexing crossed a page.
    /// Implied/accumulator modes yield 0; relative yields the branch target.
    fn operand_address(&mut self, mode: AddressingMode) -> (u16, bool) {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => (0, false),
            AddressingMode::Immediate => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                (addr, false)
            }
            AddressingMode::ZeroPage => (self.fetch_byte() as u16, false),
            AddressingMode::ZeroPageX => (self.fetch_byte().wrapping_add(self.regs.x) as u16, false),
            AddressingMode::ZeroPageY => (self.fetch_byte().wrapping_add(self.regs.y) as u16, false),
            AddressingMode::Relative => {
                let offset = self.fetch_byte() as i8;
                (self.regs.pc.wrapping_add(offset as u16), false)
            }
            AddressingMode::Absolute => (self.fetch_word(), false),
            AddressingMode::AbsoluteX => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(self.regs.x as u16);
                (addr, page_crossed(base, addr))
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(self.regs.y as u16);
                (addr, page_crossed(base, addr))
            }
            AddressingMode::Indirect => {
                let ptr = self.fetch_word();
                // Hardware bug: the high byte never carries into the next page.
                let lo = self.read(ptr) as u16;
                let hi = self.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                ((hi << 8) | lo, false)
            }
            AddressingMode::IndirectX => {
                let ptr = self.fetch_byte().wrapping_add(self.regs.x);
                (self.read_word_zp(ptr), false)
            }
            AddressingMode::IndirectY => {
                let ptr = self.fetch_byte();
                let base = self.read_word_zp(ptr);
                let addr = base.wrapping_add(self.regs.y as u16);
                (addr, page_crossed(base, addr))
            }
        }
    }

    fn execute(&mut self, opcode: u8) -> u32 {
        let entry = decode(opcode);
        let mode = entry.mode;
        let (addr, crossed) = self.operand_address(mode);

        let mut cycles = entry.cycles as u32;
        if crossed && entry.operation.page_cross_penalty() {
            cycles += 1;
        }

        match entry.operation {
            Operation::Lda => {
                let value = self.read(addr);
                self.regs.a = value;
                self.regs.set_zn(value);
            }
            Operation::Ldx => {
                let value = self.read(addr);
                self.regs.x = value;
                self.regs.set_zn(value);
            }
            Operation::Ldy => {
                let value = self.read(addr);
                self.regs.y = value;
                self.regs.set_zn(value);
            }
            Operation::Sta => self.write(addr, self.regs.a),
            Operation::Stx => self.write(addr, self.regs.x),
            Operation::Sty => self.write(addr, self.regs.y),

            Operation::Tax => {
                self.regs.x = self.regs.a;
                self.regs.set_zn(self.regs.x);
            }
            Operation::Tay => {
                self.regs.y = self.regs.a;
                self.regs.set_zn(self.regs.y);
            }
            Operation::Tsx => {
                self.regs.x = self.regs.sp;
                self.regs.set_zn(self.regs.x);
            }
            Operation::Txa => {
                self.regs.a = self.regs.x;
                self.regs.set_zn(self.regs.a);
            }
            // TXS leaves the flags alone.
            Operation::Txs => self.regs.sp = self.regs.x,
            Operation::Tya => {
                self.regs.a = self.regs.y;
                self.regs.set_zn(self.regs.a);
            }

            Operation::Adc => {
                let value = self.read(addr);
                self.add_with_carry(value);
            }
            Operation::Sbc => {
                let value = self.read(addr);
                self.add_with_carry(!value);
            }
            Operation::And => {
                self.regs.a &= self.read(addr);
                self.regs.set_zn(self.regs.a);
            }
            Operation::Ora => {
                self.regs.a |= self.read(addr);
                self.regs.set_zn(self.regs.a);
            }
            Operation::Eor => {
                self.regs.a ^= self.read(addr);
                self.regs.set_zn(self.regs.a);
            }
            Operation::Cmp => {
                let value = self.read(addr);
                self.compare(self.regs.a, value);
            }
            Operation::Cpx => {
                let value = self.read(addr);
                self.compare(self.regs.x, value);
            }
            Operation::Cpy => {
                let value = self.read(addr);
                self.compare(self.regs.y, value);
            }
            Operation::Bit => {
                let value = self.read(addr);
                self.regs.set_flag(FLAG_ZERO, self.regs.a & value == 0);
                self.regs.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
                self.regs.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
            }

            Operation::Asl => self.modify(mode, addr, |cpu, v| {
                cpu.regs.set_flag(FLAG_CARRY, v & 0x80 != 0);
                v << 1
            }),
            Operation::Lsr => self.modify(mode, addr, |cpu, v| {
                cpu.regs.set_flag(FLAG_CARRY, v & 0x01 != 0);
                v >> 1
            }),
            Operation::Rol => self.modify(mode, addr, |cpu, v| {
                let carry_in = cpu.regs.flag(FLAG_CARRY) as u8;
                cpu.regs.set_flag(FLAG_CARRY, v & 0x80 != 0);
                (v << 1) | carry_in
            }),
            Operation::Ror => self.modify(mode, addr, |cpu, v| {
                let carry_in = (cpu.regs.flag(FLAG_CARRY) as u8) << 7;
                cpu.regs.set_flag(FLAG_CARRY, v & 0x01 != 0);
                (v >> 1) | carry_in
            }),
            Operation::Inc => self.modify(mode, addr, |_, v| v.wrapping_add(1)),
            Operation::Dec => self.modify(mode, addr, |_, v| v.wrapping_sub(1)),

            Operation::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.set_zn(self.regs.x);
            }
            Operation::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.set_zn(self.regs.y);
            }
            Operation::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.set_zn(self.regs.x);
            }
            Operation::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.set_zn(self.regs.y);
            }

            Operation::Bcc => cycles += self.branch(!self.regs.flag(FLAG_CARRY), addr),
            Operation::Bcs => cycles += self.branch(self.regs.flag(FLAG_CARRY), addr),
            Operation::Bne => cycles += self.branch(!self.regs.flag(FLAG_ZERO), addr),
            Operation::Beq => cycles += self.branch(self.regs.flag(FLAG_ZERO), addr),
            Operation::Bpl => cycles += self.branch(!self.regs.flag(FLAG_NEGATIVE), addr),
            Operation::Bmi => cycles += self.branch(self.regs.flag(FLAG_NEGATIVE), addr),
            Operation::Bvc => cycles += self.branch(!self.regs.flag(FLAG_OVERFLOW), addr),
            Operation::Bvs => cycles += self.branch(self.regs.flag(FLAG_OVERFLOW), addr),

            Operation::Jmp => self.regs.pc = addr,
            Operation::Jsr => {
                // Return address minus one; RTS adds it back.
                self.push_word(self.regs.pc.wrapping_sub(1));
                self.regs.pc = addr;
            }
            Operation::Rts => self.regs.pc = self.pop_word().wrapping_add(1),
            Operation::Brk => {
                // BRK skips a padding byte.
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.push_word(self.regs.pc);
                self.push(self.regs.status | FLAG_BREAK | FLAG_UNUSED);
                self.regs.set_flag(FLAG_INTERRUPT_DISABLE, true);
                self.regs.pc = self.read_word(IRQ_VECTOR);
            }
            Operation::Rti => {
                let status = self.pop();
                self.regs.set_status(status);
                self.regs.pc = self.pop_word();
            }

            Operation::Pha => self.push(self.regs.a),
            Operation::Php => self.push(self.regs.status | FLAG_BREAK | FLAG_UNUSED),
            Operation::Pla => {
                self.regs.a = self.pop();
                self.regs.set_zn(self.regs.a);
            }
            Operation::Plp => {
                let status = self.pop();
                self.regs.set_status(status);
            }

            Operation::Clc => self.regs.set_flag(FLAG_CARRY, false),
            Operation::Sec => self.regs.set_flag(FLAG_CARRY, true),
            Operation::Cli => self.regs.set_flag(FLAG_INTERRUPT_DISABLE, false),
            Operation::Sei => self.regs.set_flag(FLAG_INTERRUPT_DISABLE, true),
            Operation::Cld => self.regs.set_flag(FLAG_DECIMAL, false),
            Operation::Sed => self.regs.set_flag(FLAG_DECIMAL, true),
            Operation::Clv => self.regs.set_flag(FLAG_OVERFLOW, false),

            Operation::Nop => {}
        }

        cycles
    }

    /// A + M + C. SBC feeds the one's complement of M through here.
    fn add_with_carry(&mut self, value: u8) {
        let a = self.regs.a as u16;
        let m = value as u16;
        let sum = a + m + self.regs.flag(FLAG_CARRY) as u16;
        let result = sum as u8;

        self.regs.set_flag(FLAG_CARRY, sum > 0xFF);
        // Overflow: both inputs share a sign that the result does not.
        self.regs.set_flag(FLAG_OVERFLOW, (!(a ^ m) & (a ^ sum) & 0x80) != 0);
        self.regs.a = result;
        self.regs.set_zn(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.regs.set_flag(FLAG_CARRY, register >= value);
        self.regs.set_zn(register.wrapping_sub(value));
    }

    /// Read-modify-write on A or memory; Z/N follow the result.
    fn modify(&mut self, mode: AddressingMode, addr: u16, f: impl FnOnce(&mut Self, u8) -> u8) {
        if mode == AddressingMode::Accumulator {
            let a = self.regs.a;
            let result = f(self, a);
            self.regs.a = result;
            self.regs.set_zn(result);
        } else {
            let value = self.read(addr);
            let result = f(self, value);
            self.write(addr, result);
            self.regs.set_zn(result);
        }
    }

    /// Extra cycles for a branch: +1 if taken, +1 more if the target is on another page.
    fn branch(&mut self, condition: bool, target: u16) -> u32 {
        if !condition {
            return 0;
        }
        let next = self.regs.pc;
        self.regs.pc = target;
        if page_crossed(next, target) { 2 } else { 1 }
    }
}

fn page_crossed(a: u16, b: u16) -> bool {
    (a & 0xFF00) != (b & 0xFF00)
}
