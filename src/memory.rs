//! The memory-query primitive
use crate::{Result, error::query_memory_error, os::Kernel};
use bitflags::bitflags;
use static_assertions::const_assert_eq;

bitflags! {
    /// Access permissions of a mapped region.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryPermission: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

/// Memory state word reported by the kernel. The low byte is the memory type.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryState(pub u32);

impl MemoryState {
    pub const FREE: MemoryState = MemoryState(0x00);
    pub const IO: MemoryState = MemoryState(0x01);
    pub const NORMAL: MemoryState = MemoryState(0x02);
    /// Static code: the text of a module placed by the image loader.
    pub const CODE: MemoryState = MemoryState(0x03);
    pub const CODE_MUTABLE: MemoryState = MemoryState(0x04);
    pub const HEAP: MemoryState = MemoryState(0x05);

    #[inline]
    pub const fn memory_type(self) -> u32 {
        self.0 & 0xff
    }

    #[inline]
    pub const fn is_code(self) -> bool {
        self.memory_type() == Self::CODE.0
    }
}

/// One region of the address space, as the kernel describes it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub addr: u64,
    pub size: u64,
    pub state: MemoryState,
    pub attribute: u32,
    pub permission: MemoryPermission,
    pub ipc_refcount: u32,
    pub device_refcount: u32,
    pub padding: u32,
}

const_assert_eq!(size_of::<MemoryInfo>(), 0x28);

impl Default for MemoryInfo {
    fn default() -> Self {
        Self {
            addr: 0,
            size: 0,
            state: MemoryState::FREE,
            attribute: 0,
            permission: MemoryPermission::empty(),
            ipc_refcount: 0,
            device_refcount: 0,
            padding: 0,
        }
    }
}

impl MemoryInfo {
    /// Describes a region with the given state and permission.
    pub const fn new(
        addr: usize,
        size: usize,
        state: MemoryState,
        permission: MemoryPermission,
    ) -> Self {
        Self {
            addr: addr as u64,
            size: size as u64,
            state,
            attribute: 0,
            permission,
            ipc_refcount: 0,
            device_refcount: 0,
            padding: 0,
        }
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.addr as usize
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// The first address past this region. Wraps at the top of the address space.
    #[inline]
    pub fn end(&self) -> usize {
        self.base().wrapping_add(self.size())
    }

    /// Whether the region looks like the text segment of a module.
    ///
    /// The image loader maps every module's text as static code with read and
    /// execute permission and nothing else.
    #[inline]
    pub fn is_module_text(&self) -> bool {
        self.state.is_code()
            && self.permission == MemoryPermission::READ | MemoryPermission::EXECUTE
    }
}

/// Raw answer of the memory-query call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryQuery {
    pub info: MemoryInfo,
    /// 0 on success.
    pub result: u32,
}

/// Wraps the memory-query call and rejects failed answers.
///
/// There is no caching: every call reaches the kernel.
pub struct MemoryProbe<'k, K: ?Sized> {
    kernel: &'k K,
}

impl<'k, K: Kernel + ?Sized> MemoryProbe<'k, K> {
    #[inline]
    pub fn new(kernel: &'k K) -> Self {
        Self { kernel }
    }

    /// Queries the region containing `address`.
    pub fn query(&self, address: usize) -> Result<MemoryInfo> {
        let MemoryQuery { info, result } = self.kernel.query_memory(address);
        if result != 0 {
            return Err(query_memory_error(address, result));
        }
        Ok(info)
    }
}
