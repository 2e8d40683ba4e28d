use crate::cpu::{Cpu, Flags, Trap};
use crate::decoder::Decoded;
use crate::memory::Bus;
use crate::opcode::Opcode;

pub trait Executor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, d: Decoded) -> Result<(), Trap>;
}

fn bus_err<T>(addr: u16, r: anyhow::Result<T>) -> Result<T, Trap> {
    r.map_err(|source| Trap::Bus { addr, source })
}

fn set_zn(cpu: &mut Cpu, res: u16) {
    cpu.flags.set(Flags::Z, res == 0);
    cpu.flags.set(Flags::N, (res as i16) < 0);
}

fn add_flags(cpu: &mut Cpu, a: u16, b: u16) -> u16 {
    let (res, carry) = a.overflowing_add(b);
    set_zn(cpu, res);
    cpu.flags.set(Flags::C, carry);
    cpu.flags.set(Flags::V, (a ^ res) & (b ^ res) & 0x8000 != 0);
    res
}

fn sub_flags(cpu: &mut Cpu, a: u16, b: u16) -> u16 {
    let (res, borrow) = a.overflowing_sub(b);
    set_zn(cpu, res);
    cpu.flags.set(Flags::C, borrow);
    cpu.flags.set(Flags::V, (a ^ b) & (a ^ res) & 0x8000 != 0);
    res
}

fn push<B: Bus>(cpu: &mut Cpu, bus: &mut B, val: u16) -> Result<(), Trap> {
    cpu.sp = cpu.sp.wrapping_sub(2);
    let sp = cpu.sp;
    bus_err(sp, bus.write_u16(sp, val))
}

fn pop<B: Bus>(cpu: &mut Cpu, bus: &mut B) -> Result<u16, Trap> {
    let sp = cpu.sp;
    let v = bus_err(sp, bus.read_u16(sp))?;
    cpu.sp = sp.wrapping_add(2);
    Ok(v)
}

fn taken(flags: Flags, op: Opcode) -> bool {
    let z = flags.contains(Flags::Z);
    let c = flags.contains(Flags::C);
    let n = flags.contains(Flags::N);
    let v = flags.contains(Flags::V);
    match op {
        Opcode::Jmp => true,
        Opcode::Jz => z,
        Opcode::Jnz => !z,
        Opcode::Jc => c,
        Opcode::Jnc => !c,
        Opcode::Jn => n,
        Opcode::Jnn => !n,
        Opcode::Jo => v,
        Opcode::Jno => !v,
        Opcode::Ja => !c && !z,
        Opcode::Jbe => c || z,
        Opcode::Jg => !z && n == v,
        Opcode::Jge => n == v,
        Opcode::Jl => n != v,
        Opcode::Jle => z || n != v,
        _ => false,
    }
}

/// Executes decoded instructions with conventional two-operand semantics:
/// `rd = rd <op> rs` (or `imm`). Compares and tests only update flags.
pub struct ModelExecutor;

impl Executor for ModelExecutor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, d: Decoded) -> Result<(), Trap> {
        let rd = d.rd as usize;
        let a = cpu.regs[rd];
        let b = cpu.regs[d.rs as usize];
        let imm = d.imm;
        match d.op {
            Opcode::Nop => {}
            Opcode::Halt => cpu.halted = true,
            Opcode::Display => cpu.frames += 1,
            Opcode::Ret => cpu.pc = pop(cpu, bus)?,
            Opcode::PushF => {
                let bits = cpu.flags.bits();
                push(cpu, bus, bits)?;
            }
            Opcode::PopF => cpu.flags = Flags::from_bits_truncate(pop(cpu, bus)?),

            Opcode::Mov => cpu.regs[rd] = b,
            Opcode::MovI => cpu.regs[rd] = imm,
            Opcode::Load => cpu.regs[rd] = bus_err(b, bus.read_u16(b))?,
            Opcode::LoadB => cpu.regs[rd] = bus_err(b, bus.read_u8(b))? as u16,
            Opcode::Store => bus_err(a, bus.write_u16(a, b))?,
            Opcode::StoreB => bus_err(a, bus.write_u8(a, b as u8))?,
            Opcode::Push => push(cpu, bus, a)?,
            Opcode::Pop => cpu.regs[rd] = pop(cpu, bus)?,

            Opcode::Add => cpu.regs[rd] = add_flags(cpu, a, b),
            Opcode::AddI => cpu.regs[rd] = add_flags(cpu, a, imm),
            Opcode::Sub => cpu.regs[rd] = sub_flags(cpu, a, b),
            Opcode::SubI => cpu.regs[rd] = sub_flags(cpu, a, imm),
            Opcode::Mul => {
                let res = a.wrapping_mul(b);
                set_zn(cpu, res);
                cpu.regs[rd] = res;
            }
            Opcode::Div => {
                if b == 0 {
                    let pc = cpu.pc.wrapping_sub(d.width as u16);
                    return Err(Trap::DivideByZero { pc });
                }
                let res = a / b;
                set_zn(cpu, res);
                cpu.regs[rd] = res;
            }
            Opcode::Inc | Opcode::Dec => {
                let res = if d.op == Opcode::Inc { a.wrapping_add(1) } else { a.wrapping_sub(1) };
                set_zn(cpu, res);
                cpu.regs[rd] = res;
            }
            Opcode::Neg => cpu.regs[rd] = sub_flags(cpu, 0, a),

            Opcode::And | Opcode::AndI | Opcode::Or | Opcode::OrI | Opcode::Xor | Opcode::XorI
            | Opcode::Shl | Opcode::ShlI | Opcode::Shr | Opcode::ShrI | Opcode::Sar
            | Opcode::SarI => {
                let rhs = match d.op {
                    Opcode::AndI | Opcode::OrI | Opcode::XorI | Opcode::ShlI | Opcode::ShrI
                    | Opcode::SarI => imm,
                    _ => b,
                };
                let res = match d.op {
                    Opcode::And | Opcode::AndI => a & rhs,
                    Opcode::Or | Opcode::OrI => a | rhs,
                    Opcode::Xor | Opcode::XorI => a ^ rhs,
                    Opcode::Shl | Opcode::ShlI => a << (rhs & 0xF),
                    Opcode::Shr | Opcode::ShrI => a >> (rhs & 0xF),
                    _ => ((a as i16) >> (rhs & 0xF)) as u16,
                };
                set_zn(cpu, res);
                cpu.regs[rd] = res;
            }
            Opcode::Not => {
                let res = !a;
                set_zn(cpu, res);
                cpu.regs[rd] = res;
            }

            Opcode::Cmp => {
                sub_flags(cpu, a, b);
            }
            Opcode::CmpI => {
                sub_flags(cpu, a, imm);
            }
            Opcode::Test => set_zn(cpu, a & b),
            Opcode::TestI => set_zn(cpu, a & imm),

            Opcode::JmpR => cpu.pc = a,
            Opcode::CallR | Opcode::Call => {
                let ret = cpu.pc;
                push(cpu, bus, ret)?;
                cpu.pc = if d.op == Opcode::Call { imm } else { a };
            }
            Opcode::Jmp | Opcode::Jz | Opcode::Jnz | Opcode::Jc | Opcode::Jnc | Opcode::Jn
            | Opcode::Jnn | Opcode::Jo | Opcode::Jno | Opcode::Ja | Opcode::Jbe | Opcode::Jg
            | Opcode::Jge | Opcode::Jl | Opcode::Jle => {
                if taken(cpu.flags, d.op) {
                    cpu.pc = imm;
                }
            }

            // R0 = destination, R1 = fill value / source, R2 = count
            Opcode::MemSet => {
                let [dst, val, n] = [cpu.regs[0], cpu.regs[1], cpu.regs[2]];
                for i in 0..n {
                    let addr = dst.wrapping_add(i);
                    bus_err(addr, bus.write_u8(addr, val as u8))?;
                }
            }
            Opcode::MemCpy => {
                let [dst, src, n] = [cpu.regs[0], cpu.regs[1], cpu.regs[2]];
                for i in 0..n {
                    let from = src.wrapping_add(i);
                    let v = bus_err(from, bus.read_u8(from))?;
                    let to = dst.wrapping_add(i);
                    bus_err(to, bus.write_u8(to, v))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::SimConfig;
    use crate::emitter::Emitter;
    use crate::memory::LinearMemory;

    fn run(build: impl FnOnce(&mut Emitter)) -> (Cpu, LinearMemory) {
        let mut e = Emitter::new();
        build(&mut e);
        e.halt();
        let mut mem = LinearMemory::new();
        mem.load(&e.finish().unwrap()).unwrap();
        let mut cpu = Cpu::new(SimConfig::default());
        cpu.run(&mut mem, &ModelExecutor).unwrap();
        (cpu, mem)
    }

    #[test]
    fn arithmetic_and_flags() {
        let (cpu, _) = run(|e| {
            e.movi(0, 5).movi(1, 7).sub(0, 1);
        });
        assert_eq!(cpu.regs[0], 0xFFFE);
        assert!(cpu.flags.contains(Flags::C | Flags::N));

        let (cpu, _) = run(|e| {
            e.movi(3, 0x7F).andi(3, 0x0F).cmpi(3, 0x0F);
        });
        assert_eq!(cpu.regs[3], 0x0F);
        assert!(cpu.flags.contains(Flags::Z));
    }

    #[test]
    fn call_and_ret_use_stack() {
        let (cpu, _) = run(|e| {
            let sub = e.new_label();
            let done = e.new_label();
            e.reserve_forward_branch(Opcode::Call, sub).unwrap();
            e.jmp_fwd(done).unwrap();
            e.place(sub).unwrap();
            e.movi(2, 0x55).ret();
            e.place(done).unwrap();
        });
        assert_eq!(cpu.regs[2], 0x55);
        assert_eq!(cpu.sp, SimConfig::default().stack_top);
    }

    #[test]
    fn memcpy_copies_r2_bytes() {
        let (_, mem) = run(|e| {
            e.movi(0, 0x2000).movi(1, 0xAB).movi(2, 3).memset();
            e.movi(0, 0x3000).movi(1, 0x2000).movi(2, 2).memcpy();
        });
        assert_eq!(&mem.mem[0x3000..0x3003], &[0xAB, 0xAB, 0x00]);
    }

    #[test]
    fn divide_by_zero_traps() {
        let mut e = Emitter::new();
        e.movi(0, 1).emit_reg_pair(Opcode::Div, 0, 1);
        let mut mem = LinearMemory::new();
        mem.load(&e.finish().unwrap()).unwrap();
        let mut cpu = Cpu::new(SimConfig::default());
        let err = cpu.run(&mut mem, &ModelExecutor).unwrap_err();
        assert!(matches!(err, Trap::DivideByZero { pc: 4 }));
    }
}
