//! Parsing `.dynamic` section
use crate::{
    Result,
    error::{entry_size_error, pltrel_error},
    hash::ElfHash,
    object::{ModuleField, ModuleObject},
};
use elf::abi::*;
use elf::relocation::{Elf64_Rel, Elf64_Rela};
use elf::symbol::Elf64_Sym;

pub type Dyn = elf::dynamic::Elf64_Dyn;

/// Number of relative relocations at the start of the RELA table.
pub const DT_RELACOUNT: i64 = 0x6ffffff9;
/// Number of relative relocations at the start of the REL table.
pub const DT_RELCOUNT: i64 = 0x6ffffffa;

/// Size of a REL entry: offset, info.
pub const REL_ENTRY_SIZE: u64 = size_of::<Elf64_Rel>() as u64;
/// Size of a RELA entry: offset, info, addend.
pub const RELA_ENTRY_SIZE: u64 = size_of::<Elf64_Rela>() as u64;
/// Size of a symbol table entry.
pub const SYM_ENTRY_SIZE: u64 = size_of::<Elf64_Sym>() as u64;

/// How the value of a dynamic tag is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicTag {
    /// End of the section.
    Null,
    /// `base + value` goes into the field.
    Address(ModuleField),
    /// `value` goes into the field unchanged.
    Scalar(ModuleField),
    /// Relocation kind of the PLT table; only `DT_REL` and `DT_RELA` are valid.
    PltRel,
    /// Entry size the loader is built for; never derived, only checked.
    EntrySize(u64),
    /// Offset of the SYSV hash table.
    Hash,
    /// Anything the loader has no use for.
    Ignored,
}

impl DynamicTag {
    pub const fn classify(tag: i64) -> DynamicTag {
        match tag {
            DT_NULL => DynamicTag::Null,
            DT_JMPREL => DynamicTag::Address(ModuleField::JmpRel),
            DT_RELA | DT_REL => DynamicTag::Address(ModuleField::Rel),
            DT_INIT => DynamicTag::Address(ModuleField::Init),
            DT_FINI => DynamicTag::Address(ModuleField::Fini),
            DT_STRTAB => DynamicTag::Address(ModuleField::StrTab),
            DT_SYMTAB => DynamicTag::Address(ModuleField::SymTab),
            DT_PLTGOT => DynamicTag::Address(ModuleField::PltGot),
            DT_PLTRELSZ => DynamicTag::Scalar(ModuleField::PltRelSz),
            DT_RELASZ => DynamicTag::Scalar(ModuleField::RelaSz),
            DT_STRSZ => DynamicTag::Scalar(ModuleField::StrSz),
            DT_RELSZ => DynamicTag::Scalar(ModuleField::RelSz),
            DT_RELCOUNT => DynamicTag::Scalar(ModuleField::RelCount),
            DT_RELACOUNT => DynamicTag::Scalar(ModuleField::RelaCount),
            DT_PLTREL => DynamicTag::PltRel,
            DT_RELENT => DynamicTag::EntrySize(REL_ENTRY_SIZE),
            DT_RELAENT => DynamicTag::EntrySize(RELA_ENTRY_SIZE),
            DT_SYMENT => DynamicTag::EntrySize(SYM_ENTRY_SIZE),
            DT_HASH => DynamicTag::Hash,
            _ => DynamicTag::Ignored,
        }
    }
}

/// Walks the dynamic section of `object` and fills in its fields.
///
/// `object` must already carry its base address and dynamic pointer. Address
/// tags are rebased, scalar tags are copied, entry sizes and `DT_PLTREL` are
/// validated. Tags the loader does not know are skipped.
///
/// # Safety
/// The dynamic section, and the hash table it names, must be mapped and end
/// with a `DT_NULL` entry.
pub unsafe fn parse(object: &mut ModuleObject) -> Result<()> {
    let base = object.base();
    let mut cur_dyn_ptr = object.dynamic_ptr() as *const Dyn;
    let mut dynamic = unsafe { &*cur_dyn_ptr };

    loop {
        let value = dynamic.d_un;
        match DynamicTag::classify(dynamic.d_tag) {
            DynamicTag::Null => break,
            DynamicTag::Address(field) => object.set(field, base.wrapping_add(value as usize)),
            DynamicTag::Scalar(field) => object.set(field, value as usize),
            DynamicTag::PltRel => {
                let is_rela = match value as i64 {
                    DT_RELA => 1,
                    DT_REL => 0,
                    _ => return Err(pltrel_error(value)),
                };
                object.set(ModuleField::IsRelaPlt, is_rela);
            }
            DynamicTag::EntrySize(expected) => {
                if value != expected {
                    return Err(entry_size_error(dynamic.d_tag, expected, value));
                }
            }
            DynamicTag::Hash => {
                let hash = unsafe { ElfHash::parse(base.wrapping_add(value as usize)) };
                object.set(ModuleField::HashNChain, hash.nchain());
                object.set(ModuleField::HashNBucket, hash.nbucket());
                object.set(ModuleField::HashBucket, hash.buckets());
                object.set(ModuleField::HashChain, hash.chains());
            }
            DynamicTag::Ignored => {}
        }
        cur_dyn_ptr = unsafe { cur_dyn_ptr.add(1) };
        dynamic = unsafe { &*cur_dyn_ptr };
    }

    #[cfg(feature = "log")]
    log::trace!(
        "[Dynamic] module: 0x{:x}, dynamic: 0x{:x}, rel: 0x{:x}, rel_count: {}, rela_count: {}",
        base,
        object.dynamic_ptr(),
        object.rel_addr(),
        object.rel_count(),
        object.rela_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_sizes() {
        assert_eq!(REL_ENTRY_SIZE, 16);
        assert_eq!(RELA_ENTRY_SIZE, 24);
        assert_eq!(SYM_ENTRY_SIZE, 24);
    }

    #[test]
    fn rel_and_rela_share_a_field() {
        assert_eq!(
            DynamicTag::classify(DT_REL),
            DynamicTag::classify(DT_RELA)
        );
    }

    #[test]
    fn unknown_tags_are_ignored() {
        for tag in [DT_NEEDED, DT_SONAME, DT_FLAGS, DT_GNU_HASH, 0x1234_5678] {
            assert_eq!(DynamicTag::classify(tag), DynamicTag::Ignored);
        }
    }
}
