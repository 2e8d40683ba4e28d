//! Instruction emitter.
//!
//! [`Emitter`] appends encoded instructions to a byte buffer. Branch targets
//! are absolute offsets into the same buffer: backward branches take the
//! offset directly, forward branches go through a [`Label`] that is placed
//! once the target point is reached. Targets must fit the 16-bit operand;
//! [`Emitter::finish`] reports the first one that does not.

use crate::opcode::Opcode;
use crate::operand::{imm16_le, imm8, reg_byte};
use crate::patch::{branch_operand, AsmError, Label, PatchSite, Patcher};

#[derive(Debug, Clone, Default)]
pub struct Emitter {
    bytes: Vec<u8>,
    patches: Patcher,
    fault: Option<AsmError>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current program length, i.e. the offset of the next instruction.
    pub fn offset(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes emitted so far. Forward-branch placeholders are still zero.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn patch_sites(&self) -> &[PatchSite] {
        self.patches.sites()
    }

    pub fn emit_no_operand(&mut self, op: Opcode) -> &mut Self {
        self.bytes.push(op.byte());
        self
    }

    pub fn emit_reg_pair(&mut self, op: Opcode, dst: u8, src: u8) -> &mut Self {
        self.bytes.extend_from_slice(&[op.byte(), reg_byte(dst, src)]);
        self
    }

    /// Single-register form; the source field is always zero.
    pub fn emit_unary(&mut self, op: Opcode, dst: u8) -> &mut Self {
        self.emit_reg_pair(op, dst, 0)
    }

    pub fn emit_reg_imm16(&mut self, op: Opcode, dst: u8, value: u32) -> &mut Self {
        let [lo, hi] = imm16_le(value);
        self.bytes.extend_from_slice(&[op.byte(), reg_byte(dst, 0), lo, hi]);
        self
    }

    pub fn emit_reg_imm8(&mut self, op: Opcode, dst: u8, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&[op.byte(), reg_byte(dst, 0), imm8(value)]);
        self
    }

    /// Branch to an offset that is already known.
    pub fn emit_backward_branch(&mut self, op: Opcode, target: usize) -> &mut Self {
        let at = self.bytes.len() + 1;
        let [lo, hi] = branch_operand(at, target).unwrap_or_else(|err| {
            self.fault.get_or_insert(err);
            [0, 0]
        });
        self.bytes.extend_from_slice(&[op.byte(), lo, hi]);
        self
    }

    pub fn new_label(&mut self) -> Label {
        self.patches.new_label()
    }

    /// Emits `op` with a zero placeholder target and records the placeholder
    /// for `label`. Returns the offset of the placeholder bytes.
    pub fn reserve_forward_branch(&mut self, op: Opcode, label: Label) -> Result<usize, AsmError> {
        let at = self.bytes.len() + 1;
        self.patches.record(at, label)?;
        self.bytes.extend_from_slice(&[op.byte(), 0, 0]);
        Ok(at)
    }

    pub fn resolve_label(&mut self, label: Label, offset: usize) -> Result<(), AsmError> {
        self.patches.resolve_label(label, offset)
    }

    /// Resolves `label` to the current offset and returns that offset.
    pub fn place(&mut self, label: Label) -> Result<usize, AsmError> {
        let here = self.offset();
        self.patches.resolve_label(label, here)?;
        Ok(here)
    }

    /// Applies every patch site and returns the finished program bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, AsmError> {
        if let Some(err) = self.fault.take() {
            return Err(err);
        }
        self.patches.apply(&mut self.bytes)?;
        Ok(self.bytes)
    }
}

// Mnemonic helpers. Register arguments follow the VM operand order.
impl Emitter {
    pub fn halt(&mut self) -> &mut Self {
        self.emit_no_operand(Opcode::Halt)
    }

    pub fn display(&mut self) -> &mut Self {
        self.emit_no_operand(Opcode::Display)
    }

    pub fn ret(&mut self) -> &mut Self {
        self.emit_no_operand(Opcode::Ret)
    }

    /// Fill R2 bytes at R0 with the low byte of R1.
    pub fn memset(&mut self) -> &mut Self {
        self.emit_no_operand(Opcode::MemSet)
    }

    /// Copy R2 bytes from R1 to R0.
    pub fn memcpy(&mut self) -> &mut Self {
        self.emit_no_operand(Opcode::MemCpy)
    }

    pub fn mov(&mut self, dst: u8, src: u8) -> &mut Self {
        self.emit_reg_pair(Opcode::Mov, dst, src)
    }

    pub fn movi(&mut self, dst: u8, value: u32) -> &mut Self {
        self.emit_reg_imm16(Opcode::MovI, dst, value)
    }

    /// `dst = mem8[addr]`
    pub fn loadb(&mut self, dst: u8, addr: u8) -> &mut Self {
        self.emit_reg_pair(Opcode::LoadB, dst, addr)
    }

    /// `mem8[addr] = src`
    pub fn storeb(&mut self, addr: u8, src: u8) -> &mut Self {
        self.emit_reg_pair(Opcode::StoreB, addr, src)
    }

    pub fn add(&mut self, dst: u8, src: u8) -> &mut Self {
        self.emit_reg_pair(Opcode::Add, dst, src)
    }

    pub fn sub(&mut self, dst: u8, src: u8) -> &mut Self {
        self.emit_reg_pair(Opcode::Sub, dst, src)
    }

    pub fn mul(&mut self, dst: u8, src: u8) -> &mut Self {
        self.emit_reg_pair(Opcode::Mul, dst, src)
    }

    pub fn inc(&mut self, dst: u8) -> &mut Self {
        self.emit_unary(Opcode::Inc, dst)
    }

    pub fn dec(&mut self, dst: u8) -> &mut Self {
        self.emit_unary(Opcode::Dec, dst)
    }

    pub fn andi(&mut self, dst: u8, value: u32) -> &mut Self {
        self.emit_reg_imm8(Opcode::AndI, dst, value)
    }

    pub fn cmpi(&mut self, dst: u8, value: u32) -> &mut Self {
        self.emit_reg_imm8(Opcode::CmpI, dst, value)
    }

    pub fn jmp(&mut self, target: usize) -> &mut Self {
        self.emit_backward_branch(Opcode::Jmp, target)
    }

    pub fn jnz(&mut self, target: usize) -> &mut Self {
        self.emit_backward_branch(Opcode::Jnz, target)
    }

    pub fn jmp_fwd(&mut self, label: Label) -> Result<usize, AsmError> {
        self.reserve_forward_branch(Opcode::Jmp, label)
    }

    pub fn jz_fwd(&mut self, label: Label) -> Result<usize, AsmError> {
        self.reserve_forward_branch(Opcode::Jz, label)
    }

    pub fn jnz_fwd(&mut self, label: Label) -> Result<usize, AsmError> {
        self.reserve_forward_branch(Opcode::Jnz, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_encode_in_operand_order() {
        let mut e = Emitter::new();
        e.display();
        assert_eq!(e.bytes(), &[0x02]);

        let mut e = Emitter::new();
        e.mov(0, 4);
        assert_eq!(e.bytes(), &[0x10, reg_byte(0, 4)]);

        let mut e = Emitter::new();
        e.movi(0, 0x4000);
        assert_eq!(e.bytes(), &[0x11, reg_byte(0, 0), 0x00, 0x40]);

        let mut e = Emitter::new();
        e.cmpi(1, 0);
        assert_eq!(e.bytes(), &[0x41, reg_byte(1, 0), 0x00]);

        let mut e = Emitter::new();
        e.inc(5);
        assert_eq!(e.bytes(), &[0x26, reg_byte(5, 0)]);

        let mut e = Emitter::new();
        e.jnz(0x000C);
        assert_eq!(e.bytes(), &[0x53, 0x0C, 0x00]);
    }

    #[test]
    fn offset_tracks_length() {
        let mut e = Emitter::new();
        e.movi(1, 2).mov(0, 1).cmpi(0, 3).jmp(0).halt();
        assert_eq!(e.offset(), 4 + 2 + 3 + 3 + 1);
        assert_eq!(e.offset(), e.bytes().len());
    }

    #[test]
    fn forward_branch_is_patched_on_finish() {
        let mut e = Emitter::new();
        let skip = e.new_label();
        let at = e.jz_fwd(skip).unwrap();
        assert_eq!(at, 1);
        assert_eq!(&e.bytes()[1..3], &[0, 0]);
        e.inc(0);
        assert_eq!(e.place(skip).unwrap(), 5);
        e.halt();
        let bytes = e.finish().unwrap();
        assert_eq!(bytes, vec![0x52, 0x05, 0x00, 0x26, 0x00, 0x01]);
    }

    #[test]
    fn explicit_resolve_matches_place() {
        let mut e = Emitter::new();
        let l = e.new_label();
        e.jmp_fwd(l).unwrap();
        e.halt();
        e.resolve_label(l, 3).unwrap();
        e.halt();
        assert_eq!(e.finish().unwrap(), vec![0x50, 0x03, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn finish_rejects_unplaced_label() {
        let mut e = Emitter::new();
        let l = e.new_label();
        e.jnz_fwd(l).unwrap();
        e.halt();
        assert_eq!(e.finish(), Err(AsmError::UnresolvedLabel { label: 0, at: 1 }));
    }

    #[test]
    fn label_placed_at_end_is_rejected() {
        let mut e = Emitter::new();
        let l = e.new_label();
        e.jmp_fwd(l).unwrap();
        e.place(l).unwrap();
        assert!(matches!(e.finish(), Err(AsmError::TargetPastEnd { target: 3, len: 3, .. })));
    }

    #[test]
    fn forward_target_beyond_16_bits_fails_finish() {
        let mut e = Emitter::new();
        let l = e.new_label();
        e.jmp_fwd(l).unwrap();
        for _ in 0..0x1_0000 {
            e.halt();
        }
        assert_eq!(e.place(l).unwrap(), 0x1_0003);
        e.halt();
        assert_eq!(e.finish(), Err(AsmError::BranchOutOfRange { at: 1, target: 0x1_0003 }));
    }

    #[test]
    fn backward_target_beyond_16_bits_fails_finish() {
        let mut e = Emitter::new();
        e.jmp(0x1_0000).halt();
        assert_eq!(&e.bytes()[..3], &[0x50, 0x00, 0x00]);
        assert_eq!(e.finish(), Err(AsmError::BranchOutOfRange { at: 1, target: 0x1_0000 }));
    }
}
