//! Reference execution model.
//!
//! A small interpreter used to check generated programs by running them. It
//! is not the target VM: the flag and stack conventions here are assumptions
//! that the demo programs are consistent with.

use anyhow::Error;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::decoder::decode;
use crate::exec::Executor;
use crate::memory::Bus;
use crate::operand::NUM_REGS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimConfig {
    pub max_steps: u64,
    pub stack_top: u16, // below the keyboard registers
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000_000,
            stack_top: 0xFFF0,
        }
    }
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags: u16 {
const Z = 1 << 0; // Zero
const C = 1 << 1; // Carry / borrow
const N = 1 << 2; // Negative
const V = 1 << 3; // Signed overflow
}
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("Invalid instruction at {pc:#06x}")]
    InvalidInstruction { pc: u16 },
    #[error("Division by zero at {pc:#06x}")]
    DivideByZero { pc: u16 },
    #[error("Bus error at {addr:#06x}: {source}")]
    Bus { addr: u16, #[source] source: Error },
    #[error("Step limit of {steps} reached")]
    StepLimit { steps: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub pc: u16,
    pub sp: u16,
    pub regs: [u16; NUM_REGS],
    pub flags: Flags,
    pub halted: bool,
    pub frames: u64, // DISPLAY count
    pub steps: u64,
    pub cfg: SimConfig,
}

impl Cpu {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            pc: 0,
            sp: cfg.stack_top,
            regs: [0; NUM_REGS],
            flags: Flags::empty(),
            halted: false,
            frames: 0,
            steps: 0,
            cfg,
        }
    }

    pub fn reset(&mut self, reset_pc: u16) {
        *self = Self::new(self.cfg);
        self.pc = reset_pc;
    }

    pub fn step<B: Bus, X: Executor>(&mut self, bus: &mut B, exec: &X) -> Result<(), Trap> {
        if self.halted {
            return Ok(());
        }
        let pc = self.pc;
        // Longest instruction is four bytes; decode from a fetched window.
        let mut window = [0u8; 4];
        for (i, b) in window.iter_mut().enumerate() {
            let addr = pc.wrapping_add(i as u16);
            *b = bus
                .read_u8(addr)
                .map_err(|source| Trap::Bus { addr, source })?;
        }
        let d = decode(&window, 0).ok_or(Trap::InvalidInstruction { pc })?;
        self.pc = pc.wrapping_add(d.width as u16);
        self.steps += 1;
        exec.exec(self, bus, d)
    }

    fn run_while<B: Bus, X: Executor>(
        &mut self,
        bus: &mut B,
        exec: &X,
        mut keep_going: impl FnMut(&Cpu) -> bool,
    ) -> Result<u64, Trap> {
        let start = self.steps;
        while !self.halted && keep_going(self) {
            if self.steps - start >= self.cfg.max_steps {
                return Err(Trap::StepLimit { steps: self.cfg.max_steps });
            }
            self.step(bus, exec)?;
        }
        Ok(self.steps - start)
    }

    /// Runs until HALT. Returns the number of instructions executed.
    pub fn run<B: Bus, X: Executor>(&mut self, bus: &mut B, exec: &X) -> Result<u64, Trap> {
        self.run_while(bus, exec, |_| true)
    }

    /// Runs until `frames` more DISPLAYs have executed, or HALT.
    pub fn run_frames<B: Bus, X: Executor>(
        &mut self,
        bus: &mut B,
        exec: &X,
        frames: u64,
    ) -> Result<u64, Trap> {
        let target = self.frames + frames;
        self.run_while(bus, exec, |cpu| cpu.frames < target)
    }
}
