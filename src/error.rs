use crate::os::{BreakReason, Kernel};
use core::fmt::Display;

/// Fatal conditions detected while bootstrapping modules.
///
/// Nothing at this boot stage can recover from any of them: there is no
/// supervisor to restart initialization and no channel to report through.
/// Components hand a `Fatal` back to the [`Loader`](crate::Loader), which turns
/// it into a permanent halt with [`Fatal::halt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fatal {
    /// The memory-query call returned a nonzero result code.
    ///
    /// The kernel contract is assumed inviolable, so this means the process
    /// state itself can no longer be trusted.
    QueryMemory {
        /// The address that was probed.
        address: usize,
        /// The raw result code.
        result: u32,
    },

    /// A code segment does not carry a valid `MOD0` descriptor.
    BadMod0Magic {
        /// Base address of the offending module.
        base: usize,
        /// The word found where the magic was expected.
        magic: u32,
    },

    /// `DT_PLTREL` names neither `DT_REL` nor `DT_RELA`.
    InvalidPltRel {
        /// The raw `DT_PLTREL` value.
        value: u64,
    },

    /// An entry-size tag disagrees with the fixed entry size of its table.
    ///
    /// This covers `DT_RELENT`, `DT_RELAENT` and `DT_SYMENT`.
    EntrySize {
        /// The dynamic tag.
        tag: i64,
        /// The size the loader is built for.
        expected: u64,
        /// The size the module declares.
        found: u64,
    },

    /// More modules were discovered than the registry can hold.
    RegistryFull {
        /// Capacity of the registry arena.
        capacity: usize,
    },
}

impl Fatal {
    /// Whether the fault is a kernel-contract violation rather than corrupt
    /// module metadata.
    #[inline]
    pub fn is_kernel_contract(&self) -> bool {
        matches!(self, Fatal::QueryMemory { .. })
    }

    /// Stops the process for good.
    ///
    /// Kernel-contract violations park the loader in a wait state, everything
    /// else goes through the break call.
    #[cold]
    #[inline(never)]
    pub fn halt<K: Kernel + ?Sized>(self, kernel: &K) -> ! {
        #[cfg(feature = "log")]
        log::error!("[Fatal] {}", self);
        if self.is_kernel_contract() {
            kernel.hang()
        } else {
            kernel.break_process(BreakReason::Panic)
        }
    }
}

impl Display for Fatal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Fatal::QueryMemory { address, result } => {
                write!(f, "memory query at 0x{address:x} failed: result 0x{result:x}")
            }
            Fatal::BadMod0Magic { base, magic } => {
                write!(f, "module at 0x{base:x} has bad MOD0 magic 0x{magic:08x}")
            }
            Fatal::InvalidPltRel { value } => write!(f, "invalid DT_PLTREL value 0x{value:x}"),
            Fatal::EntrySize {
                tag,
                expected,
                found,
            } => write!(
                f,
                "dynamic tag {tag} declares entry size {found}, expected {expected}"
            ),
            Fatal::RegistryFull { capacity } => {
                write!(f, "module registry is full ({capacity} modules)")
            }
        }
    }
}

impl core::error::Error for Fatal {}

#[cold]
#[inline(never)]
pub(crate) fn query_memory_error(address: usize, result: u32) -> Fatal {
    Fatal::QueryMemory { address, result }
}

#[cold]
#[inline(never)]
pub(crate) fn bad_magic_error(base: usize, magic: u32) -> Fatal {
    Fatal::BadMod0Magic { base, magic }
}

#[cold]
#[inline(never)]
pub(crate) fn pltrel_error(value: u64) -> Fatal {
    Fatal::InvalidPltRel { value }
}

#[cold]
#[inline(never)]
pub(crate) fn entry_size_error(tag: i64, expected: u64, found: u64) -> Fatal {
    Fatal::EntrySize {
        tag,
        expected,
        found,
    }
}

#[cold]
#[inline(never)]
pub(crate) fn registry_full_error(capacity: usize) -> Fatal {
    Fatal::RegistryFull { capacity }
}
