//! Demo programs for the HackVM display and keyboard.
//!
//! Each builder is a fixed sequence of emitter calls; building one never
//! depends on another.

use serde::Serialize;

use crate::emitter::Emitter;
use crate::mmio::{
    BLACK, FB_SIZE, FB_WIDTH, FRAMEBUFFER, KEY_CODE, KEY_DOWN, KEY_LEFT, KEY_RIGHT, KEY_STATE,
    KEY_UP, RED, WHITE,
};
use crate::patch::AsmError;

/// A finished, fully patched program image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pub name: &'static str,
    pub bytes: Vec<u8>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn file_name(&self) -> String {
        format!("{}.bin", self.name)
    }
}

pub type Builder = fn() -> Result<Program, AsmError>;

/// Every demo, in generation order.
pub const CATALOG: &[(&str, Builder)] = &[
    ("fill_red", fill_red),
    ("gradient", gradient),
    ("color_cycle", color_cycle),
    ("keyboard_test", keyboard_test),
    ("moving_pixel", moving_pixel),
];

/// Builds every demo, in catalog order, before returning.
pub fn catalog() -> Result<Vec<Program>, AsmError> {
    CATALOG.iter().map(|(_, build)| build()).collect()
}

pub fn builder(name: &str) -> Option<Builder> {
    CATALOG.iter().find(|(n, _)| *n == name).map(|&(_, build)| build)
}

pub fn by_name(name: &str) -> Option<Result<Program, AsmError>> {
    builder(name).map(|build| build())
}

fn finish(name: &'static str, e: Emitter) -> Result<Program, AsmError> {
    Ok(Program { name, bytes: e.finish()? })
}

/// R0 = framebuffer, R1 = colour, R2 = whole screen; MEMSET.
fn clear_screen(e: &mut Emitter, color: impl FnOnce(&mut Emitter)) {
    e.movi(0, FRAMEBUFFER as u32);
    color(e);
    e.movi(2, FB_SIZE as u32).memset();
}

/// Paints the whole framebuffer red once.
pub fn fill_red() -> Result<Program, AsmError> {
    let mut e = Emitter::new();
    clear_screen(&mut e, |e| {
        e.movi(1, RED as u32);
    });
    e.display().halt();
    finish("fill_red", e)
}

/// One MEMSET per row; row `y` gets palette index `y`.
pub fn gradient() -> Result<Program, AsmError> {
    let mut e = Emitter::new();
    // R4 = row address, R5 = colour, R6 = rows left
    e.movi(4, FRAMEBUFFER as u32).movi(5, 0).movi(6, 128);

    let row_loop = e.offset();
    e.mov(0, 4)
        .mov(1, 5)
        .movi(2, FB_WIDTH as u32)
        .memset()
        .movi(3, FB_WIDTH as u32)
        .add(4, 3)
        .inc(5)
        .dec(6)
        .jnz(row_loop);

    e.display().halt();
    finish("gradient", e)
}

/// Fills the screen with R7 every frame, incrementing R7 forever.
pub fn color_cycle() -> Result<Program, AsmError> {
    let mut e = Emitter::new();
    e.movi(7, 0);

    let frame_loop = e.offset();
    clear_screen(&mut e, |e| {
        e.mov(1, 7);
    });
    e.display().inc(7).jmp(frame_loop);
    finish("color_cycle", e)
}

/// Latches the last key code into R7 and fills the screen with it.
pub fn keyboard_test() -> Result<Program, AsmError> {
    let mut e = Emitter::new();
    let no_key = e.new_label();

    let frame_loop = e.offset();
    e.movi(0, KEY_STATE as u32).loadb(1, 0).cmpi(1, 0);
    e.jz_fwd(no_key)?;
    e.movi(0, KEY_CODE as u32).loadb(7, 0);

    e.place(no_key)?;
    clear_screen(&mut e, |e| {
        e.mov(1, 7);
    });
    e.display().jmp(frame_loop);
    finish("keyboard_test", e)
}

/// A white pixel at (R4, R5) moved by the arrow keys, wrapping at the edges.
pub fn moving_pixel() -> Result<Program, AsmError> {
    let mut e = Emitter::new();
    let draw = e.new_label();

    e.movi(4, 64).movi(5, 64);

    let frame_loop = e.offset();
    clear_screen(&mut e, |e| {
        e.movi(1, BLACK as u32);
    });

    e.movi(0, KEY_STATE as u32).loadb(1, 0).cmpi(1, 0);
    e.jz_fwd(draw)?;
    e.movi(0, KEY_CODE as u32).loadb(1, 0);

    // (key, coordinate register, step); the last case falls through into draw
    let moves: [(u8, u8, fn(&mut Emitter, u8) -> &mut Emitter); 4] = [
        (KEY_UP, 5, Emitter::dec),
        (KEY_DOWN, 5, Emitter::inc),
        (KEY_LEFT, 4, Emitter::dec),
        (KEY_RIGHT, 4, Emitter::inc),
    ];
    let last = moves.len() - 1;
    for (i, (key, reg, step)) in moves.into_iter().enumerate() {
        e.cmpi(1, key as u32);
        if i == last {
            e.jnz_fwd(draw)?;
            step(&mut e, reg);
        } else {
            let next = e.new_label();
            e.jnz_fwd(next)?;
            step(&mut e, reg);
            e.jmp_fwd(draw)?;
            e.place(next)?;
        }
    }

    e.place(draw)?;
    e.andi(4, 0x7F).andi(5, 0x7F);
    // R0 = FRAMEBUFFER + y * 128 + x
    e.movi(3, FB_WIDTH as u32)
        .mov(0, 5)
        .mul(0, 3)
        .add(0, 4)
        .movi(3, FRAMEBUFFER as u32)
        .add(0, 3);
    e.movi(1, WHITE as u32).storeb(0, 1);
    e.display().jmp(frame_loop);
    finish("moving_pixel", e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::reg_byte;

    #[test]
    fn fill_red_literal() {
        let p = fill_red().unwrap();
        assert_eq!(
            p.bytes,
            vec![
                0x11, reg_byte(0, 0), 0x00, 0x40,
                0x11, reg_byte(1, 0), 0xE0, 0x00,
                0x11, reg_byte(2, 0), 0x00, 0x40,
                0x71, 0x02, 0x01,
            ]
        );
    }

    #[test]
    fn catalog_order_and_names() {
        let names: Vec<_> = catalog().unwrap().iter().map(|p| p.name).collect();
        assert_eq!(names, ["fill_red", "gradient", "color_cycle", "keyboard_test", "moving_pixel"]);
        assert!(by_name("gradient").is_some());
        assert!(by_name("nope").is_none());
        assert!(builder("moving_pixel").is_some());
    }

    #[test]
    fn builds_are_deterministic() {
        assert_eq!(catalog().unwrap(), catalog().unwrap());
    }
}
