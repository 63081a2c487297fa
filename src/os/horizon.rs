//! Supervisor calls on the Horizon microkernel.
use crate::{
    Loader,
    memory::{MemoryInfo, MemoryQuery},
    os::{BreakReason, Kernel},
    registry::{DEFAULT_MODULE_CAPACITY, ModuleRegistry},
    segment::ImageLayout,
};
use core::arch::asm;

const SVC_QUERY_MEMORY: u32 = 0x06;
const SVC_BREAK: u32 = 0x26;

/// The live kernel.
pub struct Horizon;

impl Kernel for Horizon {
    fn query_memory(&self, address: usize) -> MemoryQuery {
        let mut info = MemoryInfo::default();
        let ret: usize;
        // x1 carries the page info word back; the loader has no use for it.
        unsafe {
            asm!(
                "svc {svc}",
                svc = const SVC_QUERY_MEMORY,
                inlateout("x0") (&raw mut info) as usize => ret,
                lateout("x1") _,
                in("x2") address,
                options(nostack),
            );
        }
        MemoryQuery {
            info,
            result: ret as u32,
        }
    }

    fn break_process(&self, reason: BreakReason) -> ! {
        unsafe {
            asm!(
                "svc {svc}",
                svc = const SVC_BREAK,
                inlateout("x0") reason as u32 as usize => _,
                in("x1") 0usize,
                in("x2") 0usize,
                options(nostack),
            );
        }
        self.hang()
    }
}

/// Registry sized for a Horizon process.
pub type HorizonRegistry = ModuleRegistry<DEFAULT_MODULE_CAPACITY>;

/// Bootstraps every module of the running process.
///
/// # Safety
/// Same contract as [`Loader::initialize`], with the live kernel.
pub unsafe fn bootstrap<L: ImageLayout + ?Sized>(
    self_base: usize,
    layout: &L,
    registry: &mut HorizonRegistry,
) {
    unsafe { Loader::new(&Horizon, layout, registry).initialize(self_base) }
}
