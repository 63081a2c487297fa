//! The per-module record built during bootstrap.
use crate::registry::ModuleHandle;
use core::mem::offset_of;
use static_assertions::const_assert_eq;

/// Data fields of a [`ModuleObject`].
///
/// The discriminant of each variant is the byte offset of the field inside the
/// object. Sibling modules and external tooling read the object by offset, so
/// this table must not change.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleField {
    /// base + DT_JMPREL
    JmpRel = 0x10,
    /// base + DT_REL or base + DT_RELA
    Rel = 0x18,
    /// load base
    Base = 0x20,
    /// start of the dynamic section
    Dynamic = 0x28,
    /// 1 when PLT relocations carry addends
    IsRelaPlt = 0x30,
    /// DT_PLTRELSZ
    PltRelSz = 0x38,
    /// base + DT_INIT
    Init = 0x40,
    /// base + DT_FINI
    Fini = 0x48,
    /// first hash bucket
    HashBucket = 0x50,
    /// first hash chain slot
    HashChain = 0x58,
    /// base + DT_STRTAB
    StrTab = 0x60,
    /// base + DT_SYMTAB
    SymTab = 0x68,
    /// DT_STRSZ
    StrSz = 0x70,
    /// base + DT_PLTGOT
    PltGot = 0x78,
    /// DT_RELASZ
    RelaSz = 0x80,
    /// DT_RELSZ
    RelSz = 0x88,
    /// DT_RELCOUNT
    RelCount = 0x90,
    /// DT_RELACOUNT
    RelaCount = 0x98,
    /// chain count from the hash header
    HashNChain = 0xa0,
    /// bucket count from the hash header
    HashNBucket = 0xa8,
}

impl ModuleField {
    pub const ALL: [ModuleField; 20] = [
        ModuleField::JmpRel,
        ModuleField::Rel,
        ModuleField::Base,
        ModuleField::Dynamic,
        ModuleField::IsRelaPlt,
        ModuleField::PltRelSz,
        ModuleField::Init,
        ModuleField::Fini,
        ModuleField::HashBucket,
        ModuleField::HashChain,
        ModuleField::StrTab,
        ModuleField::SymTab,
        ModuleField::StrSz,
        ModuleField::PltGot,
        ModuleField::RelaSz,
        ModuleField::RelSz,
        ModuleField::RelCount,
        ModuleField::RelaCount,
        ModuleField::HashNChain,
        ModuleField::HashNBucket,
    ];

    /// Byte offset of the field inside a [`ModuleObject`].
    #[inline]
    pub const fn offset(self) -> usize {
        self as usize
    }
}

/// Linking state of one loaded module.
///
/// Created zeroed and self-linked by the registry, filled in by the module's
/// own initialization pass, never destroyed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleObject {
    pub(crate) prev: ModuleHandle,
    pub(crate) next: ModuleHandle,
    jmprel: usize,
    rel: usize,
    base: usize,
    dynamic: usize,
    is_rela_plt: usize,
    pltrelsz: usize,
    init: usize,
    fini: usize,
    hash_bucket: usize,
    hash_chain: usize,
    strtab: usize,
    symtab: usize,
    strsz: usize,
    pltgot: usize,
    relasz: usize,
    relsz: usize,
    rel_count: usize,
    rela_count: usize,
    hash_nchain: usize,
    hash_nbucket: usize,
}

const_assert_eq!(size_of::<ModuleObject>(), 0xb0);
const_assert_eq!(size_of::<ModuleHandle>(), 8);
const_assert_eq!(offset_of!(ModuleObject, prev), 0x00);
const_assert_eq!(offset_of!(ModuleObject, next), 0x08);
const_assert_eq!(offset_of!(ModuleObject, jmprel), ModuleField::JmpRel.offset());
const_assert_eq!(offset_of!(ModuleObject, rel), ModuleField::Rel.offset());
const_assert_eq!(offset_of!(ModuleObject, base), ModuleField::Base.offset());
const_assert_eq!(offset_of!(ModuleObject, dynamic), ModuleField::Dynamic.offset());
const_assert_eq!(offset_of!(ModuleObject, is_rela_plt), ModuleField::IsRelaPlt.offset());
const_assert_eq!(offset_of!(ModuleObject, pltrelsz), ModuleField::PltRelSz.offset());
const_assert_eq!(offset_of!(ModuleObject, init), ModuleField::Init.offset());
const_assert_eq!(offset_of!(ModuleObject, fini), ModuleField::Fini.offset());
const_assert_eq!(offset_of!(ModuleObject, hash_bucket), ModuleField::HashBucket.offset());
const_assert_eq!(offset_of!(ModuleObject, hash_chain), ModuleField::HashChain.offset());
const_assert_eq!(offset_of!(ModuleObject, strtab), ModuleField::StrTab.offset());
const_assert_eq!(offset_of!(ModuleObject, symtab), ModuleField::SymTab.offset());
const_assert_eq!(offset_of!(ModuleObject, strsz), ModuleField::StrSz.offset());
const_assert_eq!(offset_of!(ModuleObject, pltgot), ModuleField::PltGot.offset());
const_assert_eq!(offset_of!(ModuleObject, relasz), ModuleField::RelaSz.offset());
const_assert_eq!(offset_of!(ModuleObject, relsz), ModuleField::RelSz.offset());
const_assert_eq!(offset_of!(ModuleObject, rel_count), ModuleField::RelCount.offset());
const_assert_eq!(offset_of!(ModuleObject, rela_count), ModuleField::RelaCount.offset());
const_assert_eq!(offset_of!(ModuleObject, hash_nchain), ModuleField::HashNChain.offset());
const_assert_eq!(offset_of!(ModuleObject, hash_nbucket), ModuleField::HashNBucket.offset());

impl ModuleObject {
    /// A zeroed object whose links point at `handle`.
    pub const fn unlinked(handle: ModuleHandle) -> Self {
        Self {
            prev: handle,
            next: handle,
            jmprel: 0,
            rel: 0,
            base: 0,
            dynamic: 0,
            is_rela_plt: 0,
            pltrelsz: 0,
            init: 0,
            fini: 0,
            hash_bucket: 0,
            hash_chain: 0,
            strtab: 0,
            symtab: 0,
            strsz: 0,
            pltgot: 0,
            relasz: 0,
            relsz: 0,
            rel_count: 0,
            rela_count: 0,
            hash_nchain: 0,
            hash_nbucket: 0,
        }
    }

    fn slot(&self, field: ModuleField) -> &usize {
        match field {
            ModuleField::JmpRel => &self.jmprel,
            ModuleField::Rel => &self.rel,
            ModuleField::Base => &self.base,
            ModuleField::Dynamic => &self.dynamic,
            ModuleField::IsRelaPlt => &self.is_rela_plt,
            ModuleField::PltRelSz => &self.pltrelsz,
            ModuleField::Init => &self.init,
            ModuleField::Fini => &self.fini,
            ModuleField::HashBucket => &self.hash_bucket,
            ModuleField::HashChain => &self.hash_chain,
            ModuleField::StrTab => &self.strtab,
            ModuleField::SymTab => &self.symtab,
            ModuleField::StrSz => &self.strsz,
            ModuleField::PltGot => &self.pltgot,
            ModuleField::RelaSz => &self.relasz,
            ModuleField::RelSz => &self.relsz,
            ModuleField::RelCount => &self.rel_count,
            ModuleField::RelaCount => &self.rela_count,
            ModuleField::HashNChain => &self.hash_nchain,
            ModuleField::HashNBucket => &self.hash_nbucket,
        }
    }

    fn slot_mut(&mut self, field: ModuleField) -> &mut usize {
        match field {
            ModuleField::JmpRel => &mut self.jmprel,
            ModuleField::Rel => &mut self.rel,
            ModuleField::Base => &mut self.base,
            ModuleField::Dynamic => &mut self.dynamic,
            ModuleField::IsRelaPlt => &mut self.is_rela_plt,
            ModuleField::PltRelSz => &mut self.pltrelsz,
            ModuleField::Init => &mut self.init,
            ModuleField::Fini => &mut self.fini,
            ModuleField::HashBucket => &mut self.hash_bucket,
            ModuleField::HashChain => &mut self.hash_chain,
            ModuleField::StrTab => &mut self.strtab,
            ModuleField::SymTab => &mut self.symtab,
            ModuleField::StrSz => &mut self.strsz,
            ModuleField::PltGot => &mut self.pltgot,
            ModuleField::RelaSz => &mut self.relasz,
            ModuleField::RelSz => &mut self.relsz,
            ModuleField::RelCount => &mut self.rel_count,
            ModuleField::RelaCount => &mut self.rela_count,
            ModuleField::HashNChain => &mut self.hash_nchain,
            ModuleField::HashNBucket => &mut self.hash_nbucket,
        }
    }

    #[inline]
    pub fn get(&self, field: ModuleField) -> usize {
        *self.slot(field)
    }

    #[inline]
    pub fn set(&mut self, field: ModuleField, value: usize) {
        *self.slot_mut(field) = value;
    }

    /// Registry back-link.
    #[inline]
    pub fn prev(&self) -> ModuleHandle {
        self.prev
    }

    /// Registry forward-link.
    #[inline]
    pub fn next(&self) -> ModuleHandle {
        self.next
    }

    /// Load base of the module.
    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Start of the dynamic section.
    #[inline]
    pub fn dynamic_ptr(&self) -> usize {
        self.dynamic
    }

    /// Start of the REL or RELA table.
    #[inline]
    pub fn rel_addr(&self) -> usize {
        self.rel
    }

    #[inline]
    pub fn rel_count(&self) -> usize {
        self.rel_count
    }

    #[inline]
    pub fn rela_count(&self) -> usize {
        self.rela_count
    }

    /// Whether PLT relocations carry addends.
    #[inline]
    pub fn is_rela_plt(&self) -> bool {
        self.is_rela_plt != 0
    }

    /// Raw bytes of the object, in layout order.
    pub fn as_bytes(&self) -> &[u8; size_of::<ModuleObject>()] {
        // repr(C), every field is a plain 8-byte integer.
        unsafe { &*(self as *const Self).cast() }
    }
}
