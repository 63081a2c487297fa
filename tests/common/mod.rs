#![allow(dead_code)]

use rtld::{
    BreakReason, BssRange, Kernel, MemoryInfo, MemoryPermission, MemoryQuery, MemoryState,
    ModuleField, ModuleHandle, ModuleObject,
    abi::*,
    dynamic::{DT_RELACOUNT, DT_RELCOUNT, REL_ENTRY_SIZE, RELA_ENTRY_SIZE},
    mod0::{self, MOD0_MAGIC},
};
use std::cell::RefCell;

pub const IMAGE_SIZE: usize = 0x1000;
pub const MOD0_OFFSET: usize = 0x10;
pub const DYNAMIC_OFFSET: usize = 0x100;
pub const RELOC_OFFSET: usize = 0x400;
pub const HASH_OFFSET: usize = 0x600;
pub const BSS_OFFSET: usize = 0x800;
pub const BSS_SIZE: usize = 0x100;
pub const DATA_OFFSET: usize = 0x900;
pub const BSS_GARBAGE: u8 = 0xaa;

/// Scan start for tests that map real heap images, which may sit anywhere.
pub const SCAN_BEGIN: usize = 0x1000;

/// Address nothing is mapped at on any supported host. Regions placed here
/// must never be read.
pub const UNMAPPED: usize = 0x1000_0000_0000;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn text(base: usize, size: usize) -> MemoryInfo {
    MemoryInfo::new(
        base,
        size,
        MemoryState::CODE,
        MemoryPermission::READ | MemoryPermission::EXECUTE,
    )
}

pub fn data(base: usize, size: usize) -> MemoryInfo {
    MemoryInfo::new(
        base,
        size,
        MemoryState::CODE_MUTABLE,
        MemoryPermission::READ | MemoryPermission::WRITE,
    )
}

/// Bss bounds every [`TestImage`] uses.
pub fn layout(base: usize) -> BssRange {
    BssRange::new(base + BSS_OFFSET, base + BSS_OFFSET + BSS_SIZE)
}

/// A kernel answering queries from a fixed memory map.
///
/// Holes between mapped regions are reported as free regions, and the last
/// hole runs to the top of the address space.
#[derive(Default)]
pub struct MockKernel {
    regions: Vec<MemoryInfo>,
    failure: Option<(usize, u32)>,
    queries: RefCell<Vec<usize>>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, info: MemoryInfo) -> Self {
        let pos = self.regions.partition_point(|r| r.base() < info.base());
        self.regions.insert(pos, info);
        self
    }

    pub fn map_image(self, image: &TestImage) -> Self {
        self.map(image.region())
    }

    /// Answers the query at `address` with `result`.
    pub fn fail_at(mut self, address: usize, result: u32) -> Self {
        self.failure = Some((address, result));
        self
    }

    pub fn queries(&self) -> Vec<usize> {
        self.queries.borrow().clone()
    }
}

impl Kernel for MockKernel {
    fn query_memory(&self, address: usize) -> MemoryQuery {
        self.queries.borrow_mut().push(address);
        if let Some((at, result)) = self.failure {
            if at == address {
                return MemoryQuery {
                    info: MemoryInfo::default(),
                    result,
                };
            }
        }
        let containing = self
            .regions
            .iter()
            .find(|r| r.base() <= address && address - r.base() < r.size());
        let info = match containing {
            Some(info) => *info,
            None => {
                let start = self
                    .regions
                    .iter()
                    .map(MemoryInfo::end)
                    .filter(|&end| end != 0 && end <= address)
                    .max()
                    .unwrap_or(0);
                let end = self
                    .regions
                    .iter()
                    .map(MemoryInfo::base)
                    .filter(|&base| base > address)
                    .min()
                    .unwrap_or(0);
                MemoryInfo::new(
                    start,
                    end.wrapping_sub(start),
                    MemoryState::FREE,
                    MemoryPermission::empty(),
                )
            }
        };
        MemoryQuery { info, result: 0 }
    }

    fn break_process(&self, reason: BreakReason) -> ! {
        panic!("break: {reason:?}")
    }

    fn hang(&self) -> ! {
        panic!("hang")
    }
}

/// A module image in host memory.
///
/// ```text
/// 0x004  MOD0 header offset
/// 0x010  MOD0 header
/// 0x100  dynamic section
/// 0x400  relocation table
/// 0x600  hash table
/// 0x800  bss
/// 0x900  relocation targets
/// ```
pub struct TestImage {
    words: Box<[u64]>,
}

impl TestImage {
    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub fn end(&self) -> usize {
        self.base() + IMAGE_SIZE
    }

    pub fn region(&self) -> MemoryInfo {
        text(self.base(), IMAGE_SIZE)
    }

    pub fn read(&self, offset: usize) -> u64 {
        unsafe { ((self.base() + offset) as *const u64).read_unaligned() }
    }

    fn write<T: Copy>(&mut self, offset: usize, value: T) {
        assert!(offset + size_of::<T>() <= IMAGE_SIZE);
        unsafe { ((self.base() + offset) as *mut T).write_unaligned(value) }
    }

    pub fn bss(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts((self.base() + BSS_OFFSET) as *const u8, BSS_SIZE) }
    }

    /// An unlinked object with the base and dynamic pointer filled in, the way
    /// descriptor location leaves it.
    pub fn object(&self) -> ModuleObject {
        let mut object = ModuleObject::unlinked(ModuleHandle::new(1));
        let header = unsafe { mod0::locate(self.base()) }.unwrap();
        object.set(ModuleField::Base, self.base());
        object.set(ModuleField::Dynamic, mod0::dynamic_ptr(self.base(), header));
        object
    }
}

#[derive(Clone)]
pub struct ImageBuilder {
    magic: u32,
    dynamic: Vec<(i64, u64)>,
    relas: Vec<(u64, u32, i64)>,
    rels: Vec<(u64, u32, u64)>,
    hash: Option<[u32; 3]>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self {
            magic: MOD0_MAGIC,
            dynamic: Vec::new(),
            relas: Vec::new(),
            rels: Vec::new(),
            hash: None,
        }
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn magic(mut self, magic: u32) -> Self {
        self.magic = magic;
        self
    }

    pub fn tag(mut self, tag: i64, value: u64) -> Self {
        self.dynamic.push((tag, value));
        self
    }

    /// Adds an RELA entry; the table tags are emitted by [`build`](Self::build).
    pub fn rela(mut self, offset: u64, kind: u32, addend: i64) -> Self {
        self.relas.push((offset, kind, addend));
        self
    }

    /// Adds a REL entry and stores `implicit` at its target.
    pub fn rel(mut self, offset: u64, kind: u32, implicit: u64) -> Self {
        self.rels.push((offset, kind, implicit));
        self
    }

    /// Emits a `DT_HASH` table with the header words `[nbucket, nchain, _]`.
    pub fn hash(mut self, words: [u32; 3]) -> Self {
        self.hash = Some(words);
        self
    }

    pub fn build(self) -> TestImage {
        assert!(self.relas.is_empty() || self.rels.is_empty());
        let mut image = TestImage {
            words: vec![0u64; IMAGE_SIZE / 8].into_boxed_slice(),
        };
        image.write(mod0::HEADER_OFFSET_POSITION, MOD0_OFFSET as u32);
        image.write(MOD0_OFFSET, self.magic);
        image.write(
            MOD0_OFFSET + mod0::DYNAMIC_OFFSET_FIELD * 4,
            DYNAMIC_OFFSET as i32,
        );

        let mut dynamic = self.dynamic;
        if !self.relas.is_empty() {
            let count = self.relas.len() as u64;
            dynamic.extend([
                (DT_RELA, RELOC_OFFSET as u64),
                (DT_RELASZ, count * RELA_ENTRY_SIZE),
                (DT_RELAENT, RELA_ENTRY_SIZE),
                (DT_RELACOUNT, count),
            ]);
            for (i, (offset, kind, addend)) in self.relas.into_iter().enumerate() {
                let entry = RELOC_OFFSET + i * RELA_ENTRY_SIZE as usize;
                image.write(entry, offset);
                image.write(entry + 8, kind as u64);
                image.write(entry + 16, addend);
            }
        }
        if !self.rels.is_empty() {
            let count = self.rels.len() as u64;
            dynamic.extend([
                (DT_REL, RELOC_OFFSET as u64),
                (DT_RELSZ, count * REL_ENTRY_SIZE),
                (DT_RELENT, REL_ENTRY_SIZE),
                (DT_RELCOUNT, count),
            ]);
            for (i, (offset, kind, implicit)) in self.rels.into_iter().enumerate() {
                let entry = RELOC_OFFSET + i * REL_ENTRY_SIZE as usize;
                image.write(entry, offset);
                image.write(entry + 8, kind as u64);
                image.write(offset as usize, implicit);
            }
        }
        if let Some(words) = self.hash {
            dynamic.push((DT_HASH, HASH_OFFSET as u64));
            for (i, word) in words.into_iter().enumerate() {
                image.write(HASH_OFFSET + i * 4, word);
            }
        }
        dynamic.push((DT_NULL, 0));
        assert!(DYNAMIC_OFFSET + dynamic.len() * 16 <= RELOC_OFFSET);
        for (i, (tag, value)) in dynamic.into_iter().enumerate() {
            image.write(DYNAMIC_OFFSET + i * 16, tag);
            image.write(DYNAMIC_OFFSET + i * 16 + 8, value);
        }

        for offset in BSS_OFFSET..BSS_OFFSET + BSS_SIZE {
            image.write(offset, BSS_GARBAGE);
        }
        image
    }
}
