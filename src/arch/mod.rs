//! Relocation kind numbers of the architectures the loader runs on.
//!
//! Only the relative kind is ever applied; the other kinds are named so that
//! skipping them reads as a decision rather than an accident.
cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")]{
        mod x86_64;
        pub use x86_64::*;
    }else if #[cfg(target_arch = "riscv64")]{
        mod riscv64;
        pub use riscv64::*;
    }else if #[cfg(target_arch="aarch64")]{
        mod aarch64;
        pub use aarch64::*;
    }
}

pub const REL_NONE: u32 = 0;
