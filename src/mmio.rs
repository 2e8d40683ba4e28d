//! Memory-mapped peripherals of the target VM, as addressed by the demo programs.

/// Framebuffer base; one palette byte per pixel, row-major.
pub const FRAMEBUFFER: u16 = 0x4000;
pub const FB_WIDTH: u16 = 128;
pub const FB_HEIGHT: u16 = 128;
pub const FB_SIZE: u16 = FB_WIDTH * FB_HEIGHT;

/// Nonzero while a key is held.
pub const KEY_STATE: u16 = 0xFFF5;
pub const KEY_CODE: u16 = 0xFFF4;

pub const KEY_UP: u8 = 0x80;
pub const KEY_DOWN: u8 = 0x81;
pub const KEY_LEFT: u8 = 0x82;
pub const KEY_RIGHT: u8 = 0x83;

// palette
pub const BLACK: u8 = 0x00;
pub const RED: u8 = 0xE0;
pub const WHITE: u8 = 0xFF;
