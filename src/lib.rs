pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod emitter;
pub mod exec;
pub mod memory;
pub mod mmio;
pub mod opcode;
pub mod operand;
pub mod patch;
pub mod programs;
pub mod writer;

pub use cpu::{Cpu, SimConfig, Trap};
pub use emitter::Emitter;
pub use memory::{Bus, LinearMemory};
pub use opcode::{lookup, Opcode};
pub use patch::{AsmError, Label};
pub use programs::Program;
