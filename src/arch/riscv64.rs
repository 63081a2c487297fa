use elf::abi::*;

pub const REL_RELATIVE: u32 = R_RISCV_RELATIVE;
pub const REL_SYMBOLIC: u32 = R_RISCV_64;
pub const REL_JUMP_SLOT: u32 = R_RISCV_JUMP_SLOT;
