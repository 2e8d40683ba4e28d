//! HackVM opcode table.
//!
//! Every opcode is listed once in the `opcodes!` invocation below together with
//! its mnemonic, operand format and category. The byte-indexed lookup table is
//! built in a `const` block, so a duplicated byte or a byte outside its
//! category range fails the build instead of surfacing at runtime.
//!
//! Operand formats are the decoder contract of the target VM. They are not
//! derived from the demo programs; see [`Format`].

use core::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Instruction family, used to partition the opcode byte space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Control,
    Data,
    Arith,
    Bitwise,
    Compare,
    Branch,
    Bulk,
}

impl Category {
    /// Inclusive bounds of the byte range reserved for this category.
    pub const fn bounds(self) -> (u8, u8) {
        match self {
            Category::Control => (0x00, 0x0F),
            Category::Data => (0x10, 0x1F),
            Category::Arith => (0x20, 0x2F),
            Category::Bitwise => (0x30, 0x3F),
            Category::Compare => (0x40, 0x4F),
            Category::Branch => (0x50, 0x6F),
            Category::Bulk => (0x70, 0x7F),
        }
    }

    pub fn range(self) -> RangeInclusive<u8> {
        let (lo, hi) = self.bounds();
        lo..=hi
    }
}

/// Operand layout following the opcode byte.
///
/// | format     | bytes after opcode                 |
/// |------------|------------------------------------|
/// | `None`     | -                                  |
/// | `RegPair`  | reg(dst, src)                      |
/// | `Unary`    | reg(dst, 0)                        |
/// | `RegImm8`  | reg(dst, 0), imm8                  |
/// | `RegImm16` | reg(dst, 0), imm16 (little-endian) |
/// | `Absolute` | imm16 target (little-endian)       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    None,
    RegPair,
    Unary,
    RegImm8,
    RegImm16,
    Absolute,
}

impl Format {
    /// Total encoded length including the opcode byte.
    pub const fn len(self) -> usize {
        match self {
            Format::None => 1,
            Format::RegPair | Format::Unary => 2,
            Format::RegImm8 | Format::Absolute => 3,
            Format::RegImm16 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpDesc {
    pub op: Opcode,
    pub mnemonic: &'static str,
    pub format: Format,
    pub category: Category,
}

macro_rules! opcodes {
    ( $( $(#[$doc:meta])* $name:ident = $byte:expr, $mn:literal, $fmt:ident, $cat:ident; )* ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum Opcode {
            $( $(#[$doc])* $name = $byte, )*
        }

        /// Canonical opcode table, in byte order.
        pub const TABLE: &[OpDesc] = &[
            $( OpDesc { op: Opcode::$name, mnemonic: $mn, format: Format::$fmt, category: Category::$cat }, )*
        ];
    };
}

opcodes! {
    // control
    Nop = 0x00, "nop", None, Control;
    /// Stop execution.
    Halt = 0x01, "halt", None, Control;
    /// Present the framebuffer.
    Display = 0x02, "display", None, Control;
    Ret = 0x03, "ret", None, Control;
    PushF = 0x04, "pushf", None, Control;
    PopF = 0x05, "popf", None, Control;

    // data movement
    Mov = 0x10, "mov", RegPair, Data;
    MovI = 0x11, "movi", RegImm16, Data;
    /// LOAD rd, [rs]
    Load = 0x12, "load", RegPair, Data;
    /// LOADB rd, [rs]
    LoadB = 0x13, "loadb", RegPair, Data;
    /// STORE [rd], rs
    Store = 0x14, "store", RegPair, Data;
    /// STOREB [rd], rs
    StoreB = 0x15, "storeb", RegPair, Data;
    Push = 0x16, "push", Unary, Data;
    Pop = 0x17, "pop", Unary, Data;

    // arithmetic
    Add = 0x20, "add", RegPair, Arith;
    AddI = 0x21, "addi", RegImm16, Arith;
    Sub = 0x22, "sub", RegPair, Arith;
    SubI = 0x23, "subi", RegImm16, Arith;
    Mul = 0x24, "mul", RegPair, Arith;
    Div = 0x25, "div", RegPair, Arith;
    Inc = 0x26, "inc", Unary, Arith;
    Dec = 0x27, "dec", Unary, Arith;
    Neg = 0x28, "neg", Unary, Arith;

    // bitwise
    And = 0x30, "and", RegPair, Bitwise;
    AndI = 0x31, "andi", RegImm8, Bitwise;
    Or = 0x32, "or", RegPair, Bitwise;
    OrI = 0x33, "ori", RegImm8, Bitwise;
    Xor = 0x34, "xor", RegPair, Bitwise;
    XorI = 0x35, "xori", RegImm8, Bitwise;
    Not = 0x36, "not", Unary, Bitwise;
    Shl = 0x37, "shl", RegPair, Bitwise;
    ShlI = 0x38, "shli", RegImm8, Bitwise;
    Shr = 0x39, "shr", RegPair, Bitwise;
    ShrI = 0x3A, "shri", RegImm8, Bitwise;
    Sar = 0x3B, "sar", RegPair, Bitwise;
    SarI = 0x3C, "sari", RegImm8, Bitwise;

    // compare
    Cmp = 0x40, "cmp", RegPair, Compare;
    CmpI = 0x41, "cmpi", RegImm8, Compare;
    Test = 0x42, "test", RegPair, Compare;
    TestI = 0x43, "testi", RegImm8, Compare;

    // branch / call
    Jmp = 0x50, "jmp", Absolute, Branch;
    /// Jump to the address held in rd.
    JmpR = 0x51, "jmpr", Unary, Branch;
    Jz = 0x52, "jz", Absolute, Branch;
    Jnz = 0x53, "jnz", Absolute, Branch;
    Jc = 0x54, "jc", Absolute, Branch;
    Jnc = 0x55, "jnc", Absolute, Branch;
    Jn = 0x56, "jn", Absolute, Branch;
    Jnn = 0x57, "jnn", Absolute, Branch;
    Jo = 0x58, "jo", Absolute, Branch;
    Jno = 0x59, "jno", Absolute, Branch;
    Ja = 0x5A, "ja", Absolute, Branch;
    Jbe = 0x5B, "jbe", Absolute, Branch;
    Jg = 0x5C, "jg", Absolute, Branch;
    Jge = 0x5D, "jge", Absolute, Branch;
    Jl = 0x5E, "jl", Absolute, Branch;
    Jle = 0x5F, "jle", Absolute, Branch;
    Call = 0x60, "call", Absolute, Branch;
    CallR = 0x61, "callr", Unary, Branch;

    // bulk memory; R0 = destination, R1 = fill value / source, R2 = count
    MemCpy = 0x70, "memcpy", None, Bulk;
    MemSet = 0x71, "memset", None, Bulk;
}

/// `BY_BYTE[b]` is the index into [`TABLE`] for opcode byte `b`.
const BY_BYTE: [Option<usize>; 256] = {
    let mut t = [None; 256];
    let mut i = 0;
    while i < TABLE.len() {
        let d = &TABLE[i];
        let b = d.op as u8;
        assert!(t[b as usize].is_none(), "duplicate opcode byte");
        let (lo, hi) = d.category.bounds();
        assert!(b >= lo && b <= hi, "opcode byte outside its category range");
        t[b as usize] = Some(i);
        i += 1;
    }
    t
};

/// Finds an opcode by mnemonic, ignoring ASCII case.
pub fn lookup(name: &str) -> Option<Opcode> {
    TABLE
        .iter()
        .find(|d| d.mnemonic.eq_ignore_ascii_case(name))
        .map(|d| d.op)
}

impl Opcode {
    pub const fn from_byte(b: u8) -> Option<Opcode> {
        match BY_BYTE[b as usize] {
            Some(i) => Some(TABLE[i].op),
            None => None,
        }
    }

    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub fn desc(self) -> &'static OpDesc {
        // Every variant is in TABLE by construction of the macro.
        match BY_BYTE[self as usize] {
            Some(i) => &TABLE[i],
            None => unreachable!("opcode missing from table"),
        }
    }

    pub fn mnemonic(self) -> &'static str {
        self.desc().mnemonic
    }

    pub fn format(self) -> Format {
        self.desc().format
    }

    pub fn category(self) -> Category {
        self.desc().category
    }

    /// Encoded length of this instruction in bytes.
    pub fn len(self) -> usize {
        self.format().len()
    }
}
