//! x86-64 relocation kinds.
use elf::abi::*;

/// `B + A`, the only kind applied during bootstrap.
pub const REL_RELATIVE: u32 = R_X86_64_RELATIVE;
/// `S + A`, needs symbol resolution.
pub const REL_SYMBOLIC: u32 = R_X86_64_64;
/// PLT slot, needs symbol resolution.
pub const REL_JUMP_SLOT: u32 = R_X86_64_JUMP_SLOT;
