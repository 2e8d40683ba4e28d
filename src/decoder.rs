use serde::{Deserialize, Serialize};

use crate::opcode::{Format, Opcode};
use crate::operand::{read_imm16_le, reg_fields};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub op: Opcode,
    pub width: u8, // 1..=4
    pub rd: u8,
    pub rs: u8,
    pub imm: u16, // imm8, imm16 or absolute branch target
}

impl Decoded {
    /// Absolute target of a direct branch or call.
    pub fn branch_target(&self) -> Option<u16> {
        (self.op.format() == Format::Absolute).then_some(self.imm)
    }
}

/// Decodes the instruction at `pc`. Returns `None` for an unknown opcode or a
/// truncated operand.
pub fn decode(bytes: &[u8], pc: usize) -> Option<Decoded> {
    let op = Opcode::from_byte(*bytes.get(pc)?)?;
    let width = op.len();
    let raw = bytes.get(pc..pc + width)?;
    let (rd, rs) = match op.format() {
        Format::RegPair | Format::Unary | Format::RegImm8 | Format::RegImm16 => reg_fields(raw[1]),
        Format::None | Format::Absolute => (0, 0),
    };
    let imm = match op.format() {
        Format::RegImm8 => raw[2] as u16,
        Format::RegImm16 => read_imm16_le([raw[2], raw[3]]),
        Format::Absolute => read_imm16_le([raw[1], raw[2]]),
        _ => 0,
    };
    Some(Decoded { op, width: width as u8, rd, rs, imm })
}

/// Linear sweep over a whole image. Stops at the first undecodable byte and
/// returns its offset alongside what was decoded before it.
pub fn decode_all(bytes: &[u8]) -> (Vec<(usize, Decoded)>, Option<usize>) {
    let mut out = Vec::new();
    let mut pc = 0;
    while pc < bytes.len() {
        let Some(d) = decode(bytes, pc) else { return (out, Some(pc)) };
        out.push((pc, d));
        pc += d.width as usize;
    }
    (out, None)
}
