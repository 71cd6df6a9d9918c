//! Instruction execution.
//!
//! One exhaustive match over [`Mnemonic`], grouped the way the reference
//! documentation groups the instruction set. Flag semantics follow 6502
//! rules throughout: ADC/SBC compute a 9-bit sum with
//! `overflow = (a ^ r) & (v ^ r) & 0x80`, shifts and rotates move through
//! carry, comparisons set carry when the register is >= the operand.

use crate::cpu::{Bus, Cpu, IRQ_VECTOR};
use crate::opcodes::Mnemonic;
use crate::status::Status;

impl Cpu {
    /// Execute one decoded instruction. The operand address was already
    /// resolved; `fetch_operand`/`write_back` route between memory and the
    /// accumulator based on the addressing mode.
    #[allow(clippy::too_many_lines)] // one arm per mnemonic
    pub(crate) fn execute(&mut self, mnemonic: Mnemonic, bus: &mut impl Bus) {
        match mnemonic {
            // ---- loads / stores ----
            Mnemonic::Lda => {
                self.a = self.fetch_operand(bus);
                self.p.set_zn(self.a);
            }
            Mnemonic::Ldx => {
                self.x = self.fetch_operand(bus);
                self.p.set_zn(self.x);
            }
            Mnemonic::Ldy => {
                self.y = self.fetch_operand(bus);
                self.p.set_zn(self.y);
            }
            Mnemonic::Sta => bus.write(self.operand_addr, self.a),
            Mnemonic::Stx => bus.write(self.operand_addr, self.x),
            Mnemonic::Sty => bus.write(self.operand_addr, self.y),

            // ---- register transfers ----
            Mnemonic::Tax => {
                self.x = self.a;
                self.p.set_zn(self.x);
            }
            Mnemonic::Tay => {
                self.y = self.a;
                self.p.set_zn(self.y);
            }
            Mnemonic::Tsx => {
                self.x = self.s;
                self.p.set_zn(self.x);
            }
            Mnemonic::Txa => {
                self.a = self.x;
                self.p.set_zn(self.a);
            }
            Mnemonic::Txs => self.s = self.x,
            Mnemonic::Tya => {
                self.a = self.y;
                self.p.set_zn(self.a);
            }

            // ---- arithmetic ----
            Mnemonic::Adc => {
                let m = self.fetch_operand(bus);
                self.add_with_carry(m);
            }
            Mnemonic::Sbc => {
                let m = self.fetch_operand(bus);
                self.add_with_carry(!m);
            }
            Mnemonic::Cmp => {
                let m = self.fetch_operand(bus);
                self.compare(self.a, m);
            }
            Mnemonic::Cpx => {
                let m = self.fetch_operand(bus);
                self.compare(self.x, m);
            }
            Mnemonic::Cpy => {
                let m = self.fetch_operand(bus);
                self.compare(self.y, m);
            }

            // ---- increments / decrements ----
            Mnemonic::Inc => {
                let v = self.fetch_operand(bus).wrapping_add(1);
                bus.write(self.operand_addr, v);
                self.p.set_zn(v);
            }
            Mnemonic::Dec => {
                let v = self.fetch_operand(bus).wrapping_sub(1);
                bus.write(self.operand_addr, v);
                self.p.set_zn(v);
            }
            Mnemonic::Inx => {
                self.x = self.x.wrapping_add(1);
                self.p.set_zn(self.x);
            }
            Mnemonic::Iny => {
                self.y = self.y.wrapping_add(1);
                self.p.set_zn(self.y);
            }
            Mnemonic::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.p.set_zn(self.x);
            }
            Mnemonic::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.p.set_zn(self.y);
            }

            // ---- logic ----
            Mnemonic::And => {
                self.a &= self.fetch_operand(bus);
                self.p.set_zn(self.a);
            }
            Mnemonic::Ora => {
                self.a |= self.fetch_operand(bus);
                self.p.set_zn(self.a);
            }
            Mnemonic::Eor => {
                self.a ^= self.fetch_operand(bus);
                self.p.set_zn(self.a);
            }
            Mnemonic::Bit => {
                let m = self.fetch_operand(bus);
                self.p.set(Status::Z, self.a & m == 0);
                self.p.set(Status::V, m & 0x40 != 0);
                self.p.set(Status::N, m & 0x80 != 0);
            }

            // ---- shifts / rotates ----
            Mnemonic::Asl => {
                let m = self.fetch_operand(bus);
                let r = m << 1;
                self.p.set(Status::C, m & 0x80 != 0);
                self.p.set_zn(r);
                self.write_back(bus, r);
            }
            Mnemonic::Lsr => {
                let m = self.fetch_operand(bus);
                let r = m >> 1;
                self.p.set(Status::C, m & 0x01 != 0);
                self.p.set_zn(r);
                self.write_back(bus, r);
            }
            Mnemonic::Rol => {
                let m = self.fetch_operand(bus);
                let r = (m << 1) | u8::from(self.p.contains(Status::C));
                self.p.set(Status::C, m & 0x80 != 0);
                self.p.set_zn(r);
                self.write_back(bus, r);
            }
            Mnemonic::Ror => {
                let m = self.fetch_operand(bus);
                let r = (m >> 1) | (u8::from(self.p.contains(Status::C)) << 7);
                self.p.set(Status::C, m & 0x01 != 0);
                self.p.set_zn(r);
                self.write_back(bus, r);
            }

            // ---- branches ----
            Mnemonic::Bcc => {
                if !self.p.contains(Status::C) {
                    self.branch();
                }
            }
            Mnemonic::Bcs => {
                if self.p.contains(Status::C) {
                    self.branch();
                }
            }
            Mnemonic::Beq => {
                if self.p.contains(Status::Z) {
                    self.branch();
                }
            }
            Mnemonic::Bne => {
                if !self.p.contains(Status::Z) {
                    self.branch();
                }
            }
            Mnemonic::Bmi => {
                if self.p.contains(Status::N) {
                    self.branch();
                }
            }
            Mnemonic::Bpl => {
                if !self.p.contains(Status::N) {
                    self.branch();
                }
            }
            Mnemonic::Bvc => {
                if !self.p.contains(Status::V) {
                    self.branch();
                }
            }
            Mnemonic::Bvs => {
                if self.p.contains(Status::V) {
                    self.branch();
                }
            }

            // ---- jumps / subroutines ----
            Mnemonic::Jmp => self.pc = self.operand_addr,
            Mnemonic::Jsr => {
                let ret = self.pc.wrapping_sub(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, (ret & 0xFF) as u8);
                self.pc = self.operand_addr;
            }
            Mnemonic::Rts => {
                let lo = self.pull(bus);
                let hi = self.pull(bus);
                self.pc = u16::from_le_bytes([lo, hi]).wrapping_add(1);
            }
            Mnemonic::Rti => {
                let p = self.pull(bus);
                self.p = Status::from_stack(p);
                let lo = self.pull(bus);
                let hi = self.pull(bus);
                self.pc = u16::from_le_bytes([lo, hi]);
            }

            // ---- stack ----
            Mnemonic::Pha => self.push(bus, self.a),
            Mnemonic::Php => {
                let image = self.p.to_stack(true);
                self.push(bus, image);
            }
            Mnemonic::Pla => {
                self.a = self.pull(bus);
                self.p.set_zn(self.a);
            }
            Mnemonic::Plp => {
                let p = self.pull(bus);
                self.p = Status::from_stack(p);
            }

            // ---- flag operations ----
            Mnemonic::Clc => self.p.remove(Status::C),
            Mnemonic::Cld => self.p.remove(Status::D),
            Mnemonic::Cli => {
                // An IRQ already waiting when CLI unmasks it runs one
                // instruction late.
                let was_masked = self.p.contains(Status::I);
                self.p.remove(Status::I);
                self.irq_delay = was_masked && self.irq_line;
            }
            Mnemonic::Clv => self.p.remove(Status::V),
            Mnemonic::Sec => self.p.insert(Status::C),
            Mnemonic::Sed => self.p.insert(Status::D),
            Mnemonic::Sei => self.p.insert(Status::I),

            // ---- interrupts / misc ----
            Mnemonic::Brk => {
                // BRK skips a padding byte and pushes with B set.
                self.pc = self.pc.wrapping_add(1);
                self.push(bus, (self.pc >> 8) as u8);
                self.push(bus, (self.pc & 0xFF) as u8);
                let image = self.p.to_stack(true);
                self.push(bus, image);
                self.p.insert(Status::I);
                let lo = bus.read(IRQ_VECTOR);
                let hi = bus.read(IRQ_VECTOR.wrapping_add(1));
                self.pc = u16::from_le_bytes([lo, hi]);
            }
            Mnemonic::Nop => {}
            Mnemonic::Hlt => self.halt(),

            // ---- unofficial opcodes ----
            Mnemonic::Lax => {
                let m = self.fetch_operand(bus);
                self.a = m;
                self.x = m;
                self.p.set_zn(m);
            }
            Mnemonic::Sax => bus.write(self.operand_addr, self.a & self.x),
            Mnemonic::Dcp => {
                let v = self.fetch_operand(bus).wrapping_sub(1);
                bus.write(self.operand_addr, v);
                self.compare(self.a, v);
            }
            Mnemonic::Isc => {
                let v = self.fetch_operand(bus).wrapping_add(1);
                bus.write(self.operand_addr, v);
                self.add_with_carry(!v);
            }
            Mnemonic::Slo => {
                let m = self.fetch_operand(bus);
                let v = m << 1;
                self.p.set(Status::C, m & 0x80 != 0);
                bus.write(self.operand_addr, v);
                self.a |= v;
                self.p.set_zn(self.a);
            }
            Mnemonic::Rla => {
                let m = self.fetch_operand(bus);
                let v = (m << 1) | u8::from(self.p.contains(Status::C));
                self.p.set(Status::C, m & 0x80 != 0);
                bus.write(self.operand_addr, v);
                self.a &= v;
                self.p.set_zn(self.a);
            }
            Mnemonic::Sre => {
                let m = self.fetch_operand(bus);
                let v = m >> 1;
                self.p.set(Status::C, m & 0x01 != 0);
                bus.write(self.operand_addr, v);
                self.a ^= v;
                self.p.set_zn(self.a);
            }
            Mnemonic::Rra => {
                let m = self.fetch_operand(bus);
                let v = (m >> 1) | (u8::from(self.p.contains(Status::C)) << 7);
                self.p.set(Status::C, m & 0x01 != 0);
                bus.write(self.operand_addr, v);
                self.add_with_carry(v);
            }
            Mnemonic::Alr => {
                let m = self.fetch_operand(bus);
                self.a &= m;
                self.p.set(Status::C, self.a & 0x01 != 0);
                self.a >>= 1;
                self.p.set_zn(self.a);
            }
            Mnemonic::Anc => {
                self.a &= self.fetch_operand(bus);
                self.p.set_zn(self.a);
                self.p.set(Status::C, self.a & 0x80 != 0);
            }
            Mnemonic::Arr => {
                let m = self.fetch_operand(bus);
                self.a &= m;
                let carry_in = u8::from(self.p.contains(Status::C));
                self.a = (self.a >> 1) | (carry_in << 7);
                self.p.set_zn(self.a);
                let bit6 = (self.a >> 6) & 1;
                let bit5 = (self.a >> 5) & 1;
                self.p.set(Status::C, bit6 != 0);
                self.p.set(Status::V, bit6 ^ bit5 != 0);
            }
            Mnemonic::Axs => {
                let m = self.fetch_operand(bus);
                let ax = self.a & self.x;
                let r = ax.wrapping_sub(m);
                self.p.set(Status::C, ax >= m);
                self.p.set_zn(r);
                self.x = r;
            }
            Mnemonic::Xaa => {
                // Unstable on real silicon; the A = X & operand form is the
                // conventional deterministic rendering.
                let m = self.fetch_operand(bus);
                self.a = self.x & m;
                self.p.set_zn(self.a);
            }
            Mnemonic::Lxa => {
                let m = self.fetch_operand(bus);
                self.a &= m;
                self.x = self.a;
                self.p.set_zn(self.a);
            }
            Mnemonic::Las => {
                let m = self.fetch_operand(bus);
                let r = m & self.s;
                self.a = r;
                self.x = r;
                self.s = r;
                self.p.set_zn(r);
            }
            Mnemonic::Ahx => {
                let hi = ((self.operand_addr >> 8) as u8).wrapping_add(1);
                bus.write(self.operand_addr, self.a & self.x & hi);
            }
            Mnemonic::Shx => {
                let hi = ((self.operand_addr >> 8) as u8).wrapping_add(1);
                bus.write(self.operand_addr, self.x & hi);
            }
            Mnemonic::Shy => {
                let hi = ((self.operand_addr >> 8) as u8).wrapping_add(1);
                bus.write(self.operand_addr, self.y & hi);
            }
            Mnemonic::Tas => {
                self.s = self.a & self.x;
                let hi = ((self.operand_addr >> 8) as u8).wrapping_add(1);
                bus.write(self.operand_addr, self.s & hi);
            }
        }
    }

    /// A = A + m + C with 6502 carry/overflow semantics. SBC passes `!m`.
    fn add_with_carry(&mut self, m: u8) {
        let sum = u16::from(self.a) + u16::from(m) + u16::from(self.p.contains(Status::C));
        let r = (sum & 0xFF) as u8;
        self.p.set(Status::C, sum > 0xFF);
        self.p.set(Status::V, (self.a ^ r) & (m ^ r) & 0x80 != 0);
        self.p.set_zn(r);
        self.a = r;
    }

    /// Shared CMP/CPX/CPY flag logic.
    fn compare(&mut self, reg: u8, m: u8) {
        let r = reg.wrapping_sub(m);
        self.p.set(Status::C, reg >= m);
        self.p.set(Status::Z, reg == m);
        self.p.set(Status::N, r & 0x80 != 0);
    }
}
