//! Opcode metadata table.
//!
//! All 256 opcodes, official and unofficial, with their mnemonic, addressing
//! mode, base cycle count and page-cross sensitivity. Cycle counts follow the
//! 6502 reference table; the `page_cross` flag marks the read instructions
//! whose indexed forms pay one extra cycle when the effective address lands
//! on a different page than the base address.

use crate::addressing::AddressingMode;

/// Instruction mnemonic. Unofficial opcodes are included and dispatched the
/// same way as the documented set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)] // the 6502 reference names these, not this crate
pub enum Mnemonic {
    Adc, Ahx, Alr, Anc, And, Arr, Asl, Axs,
    Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk,
    Bvc, Bvs, Clc, Cld, Cli, Clv, Cmp, Cpx,
    Cpy, Dcp, Dec, Dex, Dey, Eor, Hlt, Inc,
    Inx, Iny, Isc, Jmp, Jsr, Las, Lax, Lda,
    Ldx, Ldy, Lsr, Lxa, Nop, Ora, Pha, Php,
    Pla, Plp, Rla, Rol, Ror, Rra, Rti, Rts,
    Sax, Sbc, Sec, Sed, Sei, Shx, Shy, Slo,
    Sre, Sta, Stx, Sty, Tas, Tax, Tay, Tsx,
    Txa, Txs, Tya, Xaa,
}

/// One opcode table entry.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    /// Instruction mnemonic, for dispatch and tracing.
    pub mnemonic: Mnemonic,
    /// Addressing mode.
    pub mode: AddressingMode,
    /// Base cycle count.
    pub cycles: u8,
    /// Pays +1 cycle when the indexed address crosses a page.
    pub page_cross: bool,
}

const fn op(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> OpcodeInfo {
    OpcodeInfo { mnemonic, mode, cycles, page_cross: false }
}

const fn opx(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> OpcodeInfo {
    OpcodeInfo { mnemonic, mode, cycles, page_cross: true }
}

use AddressingMode::{
    Absolute as Abs, AbsoluteX as Abx, AbsoluteY as Aby, Accumulator as Acc, Immediate as Imm,
    Implied as Imp, Indirect as Ind, IndirectX as Izx, IndirectY as Izy, Relative as Rel,
    ZeroPage as Zpg, ZeroPageX as Zpx, ZeroPageY as Zpy,
};
use Mnemonic::*;

/// The 256-entry decode table, indexed by opcode byte.
#[rustfmt::skip]
pub const OPCODE_TABLE: [OpcodeInfo; 256] = [
    // 0x00-0x07
    op(Brk, Imp, 7), op(Ora, Izx, 6), op(Hlt, Imp, 2), op(Slo, Izx, 8),
    op(Nop, Zpg, 3), op(Ora, Zpg, 3), op(Asl, Zpg, 5), op(Slo, Zpg, 5),
    // 0x08-0x0F
    op(Php, Imp, 3), op(Ora, Imm, 2), op(Asl, Acc, 2), op(Anc, Imm, 2),
    op(Nop, Abs, 4), op(Ora, Abs, 4), op(Asl, Abs, 6), op(Slo, Abs, 6),
    // 0x10-0x17
    op(Bpl, Rel, 2), opx(Ora, Izy, 5), op(Hlt, Imp, 2), op(Slo, Izy, 8),
    op(Nop, Zpx, 4), op(Ora, Zpx, 4), op(Asl, Zpx, 6), op(Slo, Zpx, 6),
    // 0x18-0x1F
    op(Clc, Imp, 2), opx(Ora, Aby, 4), op(Nop, Imp, 2), op(Slo, Aby, 7),
    opx(Nop, Abx, 4), opx(Ora, Abx, 4), op(Asl, Abx, 7), op(Slo, Abx, 7),
    // 0x20-0x27
    op(Jsr, Abs, 6), op(And, Izx, 6), op(Hlt, Imp, 2), op(Rla, Izx, 8),
    op(Bit, Zpg, 3), op(And, Zpg, 3), op(Rol, Zpg, 5), op(Rla, Zpg, 5),
    // 0x28-0x2F
    op(Plp, Imp, 4), op(And, Imm, 2), op(Rol, Acc, 2), op(Anc, Imm, 2),
    op(Bit, Abs, 4), op(And, Abs, 4), op(Rol, Abs, 6), op(Rla, Abs, 6),
    // 0x30-0x37
    op(Bmi, Rel, 2), opx(And, Izy, 5), op(Hlt, Imp, 2), op(Rla, Izy, 8),
    op(Nop, Zpx, 4), op(And, Zpx, 4), op(Rol, Zpx, 6), op(Rla, Zpx, 6),
    // 0x38-0x3F
    op(Sec, Imp, 2), opx(And, Aby, 4), op(Nop, Imp, 2), op(Rla, Aby, 7),
    opx(Nop, Abx, 4), opx(And, Abx, 4), op(Rol, Abx, 7), op(Rla, Abx, 7),
    // 0x40-0x47
    op(Rti, Imp, 6), op(Eor, Izx, 6), op(Hlt, Imp, 2), op(Sre, Izx, 8),
    op(Nop, Zpg, 3), op(Eor, Zpg, 3), op(Lsr, Zpg, 5), op(Sre, Zpg, 5),
    // 0x48-0x4F
    op(Pha, Imp, 3), op(Eor, Imm, 2), op(Lsr, Acc, 2), op(Alr, Imm, 2),
    op(Jmp, Abs, 3), op(Eor, Abs, 4), op(Lsr, Abs, 6), op(Sre, Abs, 6),
    // 0x50-0x57
    op(Bvc, Rel, 2), opx(Eor, Izy, 5), op(Hlt, Imp, 2), op(Sre, Izy, 8),
    op(Nop, Zpx, 4), op(Eor, Zpx, 4), op(Lsr, Zpx, 6), op(Sre, Zpx, 6),
    // 0x58-0x5F
    op(Cli, Imp, 2), opx(Eor, Aby, 4), op(Nop, Imp, 2), op(Sre, Aby, 7),
    opx(Nop, Abx, 4), opx(Eor, Abx, 4), op(Lsr, Abx, 7), op(Sre, Abx, 7),
    // 0x60-0x67
    op(Rts, Imp, 6), op(Adc, Izx, 6), op(Hlt, Imp, 2), op(Rra, Izx, 8),
    op(Nop, Zpg, 3), op(Adc, Zpg, 3), op(Ror, Zpg, 5), op(Rra, Zpg, 5),
    // 0x68-0x6F
    op(Pla, Imp, 4), op(Adc, Imm, 2), op(Ror, Acc, 2), op(Arr, Imm, 2),
    op(Jmp, Ind, 5), op(Adc, Abs, 4), op(Ror, Abs, 6), op(Rra, Abs, 6),
    // 0x70-0x77
    op(Bvs, Rel, 2), opx(Adc, Izy, 5), op(Hlt, Imp, 2), op(Rra, Izy, 8),
    op(Nop, Zpx, 4), op(Adc, Zpx, 4), op(Ror, Zpx, 6), op(Rra, Zpx, 6),
    // 0x78-0x7F
    op(Sei, Imp, 2), opx(Adc, Aby, 4), op(Nop, Imp, 2), op(Rra, Aby, 7),
    opx(Nop, Abx, 4), opx(Adc, Abx, 4), op(Ror, Abx, 7), op(Rra, Abx, 7),
    // 0x80-0x87
    op(Nop, Imm, 2), op(Sta, Izx, 6), op(Nop, Imm, 2), op(Sax, Izx, 6),
    op(Sty, Zpg, 3), op(Sta, Zpg, 3), op(Stx, Zpg, 3), op(Sax, Zpg, 3),
    // 0x88-0x8F
    op(Dey, Imp, 2), op(Nop, Imm, 2), op(Txa, Imp, 2), op(Xaa, Imm, 2),
    op(Sty, Abs, 4), op(Sta, Abs, 4), op(Stx, Abs, 4), op(Sax, Abs, 4),
    // 0x90-0x97
    op(Bcc, Rel, 2), op(Sta, Izy, 6), op(Hlt, Imp, 2), op(Ahx, Izy, 6),
    op(Sty, Zpx, 4), op(Sta, Zpx, 4), op(Stx, Zpy, 4), op(Sax, Zpy, 4),
    // 0x98-0x9F
    op(Tya, Imp, 2), op(Sta, Aby, 5), op(Txs, Imp, 2), op(Tas, Aby, 5),
    op(Shy, Abx, 5), op(Sta, Abx, 5), op(Shx, Aby, 5), op(Ahx, Aby, 5),
    // 0xA0-0xA7
    op(Ldy, Imm, 2), op(Lda, Izx, 6), op(Ldx, Imm, 2), op(Lax, Izx, 6),
    op(Ldy, Zpg, 3), op(Lda, Zpg, 3), op(Ldx, Zpg, 3), op(Lax, Zpg, 3),
    // 0xA8-0xAF
    op(Tay, Imp, 2), op(Lda, Imm, 2), op(Tax, Imp, 2), op(Lxa, Imm, 2),
    op(Ldy, Abs, 4), op(Lda, Abs, 4), op(Ldx, Abs, 4), op(Lax, Abs, 4),
    // 0xB0-0xB7
    op(Bcs, Rel, 2), opx(Lda, Izy, 5), op(Hlt, Imp, 2), opx(Lax, Izy, 5),
    op(Ldy, Zpx, 4), op(Lda, Zpx, 4), op(Ldx, Zpy, 4), op(Lax, Zpy, 4),
    // 0xB8-0xBF
    op(Clv, Imp, 2), opx(Lda, Aby, 4), op(Tsx, Imp, 2), opx(Las, Aby, 4),
    opx(Ldy, Abx, 4), opx(Lda, Abx, 4), opx(Ldx, Aby, 4), opx(Lax, Aby, 4),
    // 0xC0-0xC7
    op(Cpy, Imm, 2), op(Cmp, Izx, 6), op(Nop, Imm, 2), op(Dcp, Izx, 8),
    op(Cpy, Zpg, 3), op(Cmp, Zpg, 3), op(Dec, Zpg, 5), op(Dcp, Zpg, 5),
    // 0xC8-0xCF
    op(Iny, Imp, 2), op(Cmp, Imm, 2), op(Dex, Imp, 2), op(Axs, Imm, 2),
    op(Cpy, Abs, 4), op(Cmp, Abs, 4), op(Dec, Abs, 6), op(Dcp, Abs, 6),
    // 0xD0-0xD7
    op(Bne, Rel, 2), opx(Cmp, Izy, 5), op(Hlt, Imp, 2), op(Dcp, Izy, 8),
    op(Nop, Zpx, 4), op(Cmp, Zpx, 4), op(Dec, Zpx, 6), op(Dcp, Zpx, 6),
    // 0xD8-0xDF
    op(Cld, Imp, 2), opx(Cmp, Aby, 4), op(Nop, Imp, 2), op(Dcp, Aby, 7),
    opx(Nop, Abx, 4), opx(Cmp, Abx, 4), op(Dec, Abx, 7), op(Dcp, Abx, 7),
    // 0xE0-0xE7
    op(Cpx, Imm, 2), op(Sbc, Izx, 6), op(Nop, Imm, 2), op(Isc, Izx, 8),
    op(Cpx, Zpg, 3), op(Sbc, Zpg, 3), op(Inc, Zpg, 5), op(Isc, Zpg, 5),
    // 0xE8-0xEF
    op(Inx, Imp, 2), op(Sbc, Imm, 2), op(Nop, Imp, 2), op(Sbc, Imm, 2),
    op(Cpx, Abs, 4), op(Sbc, Abs, 4), op(Inc, Abs, 6), op(Isc, Abs, 6),
    // 0xF0-0xF7
    op(Beq, Rel, 2), opx(Sbc, Izy, 5), op(Hlt, Imp, 2), op(Isc, Izy, 8),
    op(Nop, Zpx, 4), op(Sbc, Zpx, 4), op(Inc, Zpx, 6), op(Isc, Zpx, 6),
    // 0xF8-0xFF
    op(Sed, Imp, 2), opx(Sbc, Aby, 4), op(Nop, Imp, 2), op(Isc, Aby, 7),
    opx(Nop, Abx, 4), opx(Sbc, Abx, 4), op(Inc, Abx, 7), op(Isc, Abx, 7),
];
