use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::mmio::{FB_SIZE, FRAMEBUFFER};

/// Full 16-bit address space of the VM.
pub const ADDR_SPACE: usize = 0x1_0000;

pub trait Bus {
    fn read_u8(&mut self, addr: u16) -> Result<u8>;
    fn read_u16(&mut self, addr: u16) -> Result<u16>;
    fn write_u8(&mut self, addr: u16, val: u8) -> Result<()>;
    fn write_u16(&mut self, addr: u16, val: u16) -> Result<()>;
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LinearMemory {
    pub mem: Vec<u8>,
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearMemory {
    pub fn new() -> Self {
        Self {
            mem: vec![0; ADDR_SPACE],
        }
    }

    /// Copies a program image to address 0.
    pub fn load(&mut self, image: &[u8]) -> Result<()> {
        ensure!(image.len() <= self.mem.len(), "image of {} bytes exceeds address space", image.len());
        self.mem[..image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn framebuffer(&self) -> &[u8] {
        let base = FRAMEBUFFER as usize;
        &self.mem[base..base + FB_SIZE as usize]
    }
}

// Little-endian, wrapping at the top of the address space.
impl Bus for LinearMemory {
    fn read_u8(&mut self, addr: u16) -> Result<u8> {
        Ok(self.mem[addr as usize])
    }
    fn read_u16(&mut self, addr: u16) -> Result<u16> {
        let hi = addr.wrapping_add(1);
        Ok(u16::from_le_bytes([self.mem[addr as usize], self.mem[hi as usize]]))
    }
    fn write_u8(&mut self, addr: u16, val: u8) -> Result<()> {
        self.mem[addr as usize] = val;
        Ok(())
    }
    fn write_u16(&mut self, addr: u16, val: u16) -> Result<()> {
        let [lo, hi] = val.to_le_bytes();
        self.mem[addr as usize] = lo;
        self.mem[addr.wrapping_add(1) as usize] = hi;
        Ok(())
    }
}
