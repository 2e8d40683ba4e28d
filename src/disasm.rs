use std::fmt::Write as _;

use crate::decoder::{decode, Decoded};
use crate::opcode::Format;

pub fn fmt_decoded(d: &Decoded) -> String {
    let mn = d.op.mnemonic();
    match d.op.format() {
        Format::None => mn.to_string(),
        Format::Unary => format!("{mn} r{}", d.rd),
        Format::RegPair => pair(mn, d),
        Format::RegImm8 | Format::RegImm16 => format!("{mn} r{}, #{:#x}", d.rd, d.imm),
        Format::Absolute => format!("{mn} {:#06x}", d.imm),
    }
}

fn pair(mn: &str, d: &Decoded) -> String {
    use crate::opcode::Opcode::*;
    match d.op {
        Load | LoadB => format!("{mn} r{}, [r{}]", d.rd, d.rs),
        Store | StoreB => format!("{mn} [r{}], r{}", d.rd, d.rs),
        _ => format!("{mn} r{}, r{}", d.rd, d.rs),
    }
}

/// One line per instruction, `0x0000: text`, optionally with raw bytes.
/// Undecodable bytes are listed as `.byte` one at a time.
pub fn listing(bytes: &[u8], show_bytes: bool) -> String {
    let mut buf = String::new();
    let mut pc = 0usize;
    while pc < bytes.len() {
        let (w, text) = match decode(bytes, pc) {
            Some(d) => (d.width as usize, fmt_decoded(&d)),
            None => (1, format!(".byte {:#04x}", bytes[pc])),
        };
        let _ = write!(buf, "{pc:#06x}: ");
        if show_bytes {
            for b in &bytes[pc..pc + w] {
                let _ = write!(buf, "{b:02x} ");
            }
            for _ in w..4 {
                buf.push_str("   ");
            }
            buf.push(' ');
        }
        let _ = writeln!(buf, "{text}");
        pc += w;
    }
    buf
}
