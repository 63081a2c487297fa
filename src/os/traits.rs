use crate::memory::MemoryQuery;

/// Reason code passed to the break call.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakReason {
    /// Unrecoverable fault in the loader or in a module it loads.
    Panic = 0,
    /// A checked invariant did not hold.
    Assert = 1,
    /// Requested by user code.
    User = 2,
}

/// The fixed set of kernel calls available to the loader.
///
/// This is the loader's only I/O. Everything else it learns about the process
/// comes from reading memory the kernel reported as mapped.
///
/// # Example
/// ```rust,ignore
/// struct MyKernel;
///
/// impl Kernel for MyKernel {
///     fn query_memory(&self, address: usize) -> MemoryQuery {
///         // svcQueryMemory, or a simulated address space on hosts
///         todo!()
///     }
///
///     fn break_process(&self, reason: BreakReason) -> ! {
///         todo!()
///     }
/// }
/// ```
pub trait Kernel {
    /// Reports the mapping that contains `address`.
    ///
    /// The returned record always describes a whole region, mapped or free, so
    /// `info.addr + info.size` is the next address worth asking about. A
    /// `result` other than 0 means the kernel broke its contract.
    fn query_memory(&self, address: usize) -> MemoryQuery;

    /// Terminates the process. Used for every corrupt-module condition.
    ///
    /// Implementations must not return even if the kernel does.
    fn break_process(&self, reason: BreakReason) -> !;

    /// Parks the loader in an unrecoverable wait state.
    ///
    /// Used when the kernel itself misbehaved and no other call can be trusted.
    fn hang(&self) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }
}
