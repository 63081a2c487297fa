//! # rtld
//! A bootstrap runtime loader for position-independent modules.
//!
//! It runs before any runtime exists: no heap, no filesystem, no environment.
//! Every sibling module is found by walking the address space with the kernel's
//! memory-query call, then for each module (the loader's own image first):
//!
//! 1. the `MOD0` descriptor is located and validated,
//! 2. the bss range is zero filled,
//! 3. the dynamic section is parsed into a [`ModuleObject`],
//! 4. relative relocations are applied,
//! 5. the object is linked into the [`ModuleRegistry`].
//!
//! Any fault along the way is fatal. [`Loader::initialize`] never hands an error
//! back; it halts the process through the [`Kernel`].
//!
//! ## Example
//! ```no_run
//! use rtld::{Loader, ModuleRegistry, Kernel, MemoryQuery, BreakReason, BssRange};
//!
//! struct MyKernel;
//!
//! impl Kernel for MyKernel {
//!     fn query_memory(&self, address: usize) -> MemoryQuery {
//!         unimplemented!()
//!     }
//!
//!     fn break_process(&self, reason: BreakReason) -> ! {
//!         unimplemented!()
//!     }
//! }
//!
//! let layout = |base: usize| BssRange::new(base + 0x8000, base + 0x9000);
//! let mut registry = ModuleRegistry::<16>::new();
//! # let self_base = 0;
//! unsafe { Loader::new(&MyKernel, &layout, &mut registry).initialize(self_base) };
//! ```
#![no_std]

#[cfg(not(target_pointer_width = "64"))]
compile_error!("the module object layout requires a 64-bit target");

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "riscv64",
)))]
compile_error!("unsupport arch");

pub mod arch;
pub mod dynamic;
mod error;
pub mod hash;
mod loader;
pub mod memory;
pub mod mod0;
pub mod object;
pub mod os;
pub mod registry;
pub mod relocation;
pub mod scan;
pub mod segment;

pub use elf::abi;
pub use error::Fatal;
pub use loader::Loader;
pub use memory::{MemoryInfo, MemoryPermission, MemoryProbe, MemoryQuery, MemoryState};
pub use object::{ModuleField, ModuleObject};
pub use os::{BreakReason, Kernel};
pub use registry::{DEFAULT_MODULE_CAPACITY, ModuleHandle, ModuleRegistry, ModuleState};
pub use scan::{ADDRESS_SPACE_BEGIN, AddressSpaceScanner};
pub use segment::{BssRange, ImageLayout};

/// The result type used by every loader component.
pub type Result<T> = core::result::Result<T, Fatal>;
