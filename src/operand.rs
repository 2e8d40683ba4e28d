//! Operand packing.
//!
//! Register byte layout: `[dst:3][src:3][reserved:2]`. All encoders mask
//! their inputs to field width; there is no error path.

pub const REG_MASK: u8 = 0b111;

/// Number of addressable registers (R0..R7).
pub const NUM_REGS: usize = 8;

pub fn reg_byte(dst: u8, src: u8) -> u8 {
    ((dst & REG_MASK) << 5) | ((src & REG_MASK) << 2)
}

/// Splits a register byte into `(dst, src)`. The reserved bits are ignored.
pub fn reg_fields(b: u8) -> (u8, u8) {
    ((b >> 5) & REG_MASK, (b >> 2) & REG_MASK)
}

/// 16-bit immediate, low byte first. Bits above 16 are dropped.
pub fn imm16_le(value: u32) -> [u8; 2] {
    [(value & 0xFF) as u8, ((value >> 8) & 0xFF) as u8]
}

pub fn imm8(value: u32) -> u8 {
    (value & 0xFF) as u8
}

pub fn read_imm16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}
