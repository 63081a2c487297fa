//! Applying load-bias relocations
//!
//! Only relative relocations are processed: they need nothing but the module's
//! own base. Every other kind is left for a later symbol-resolution pass, which
//! means no memory is written for it here.
use crate::{arch::REL_RELATIVE, object::ModuleObject};
use core::slice::from_raw_parts;
use elf::relocation::{Elf64_Rel, Elf64_Rela};

/// Relocation kind: the low half of `r_info`. The high half is the symbol index.
#[inline]
const fn kind(r_info: u64) -> u32 {
    r_info as u32
}

/// The relocation table a module uses.
pub enum RelocationTable {
    Rela(&'static [Elf64_Rela]),
    Rel(&'static [Elf64_Rel]),
}

impl RelocationTable {
    /// Picks the table recorded in `object`.
    ///
    /// The addend-bearing table wins when both counts are set, since the two
    /// share one address field.
    ///
    /// # Safety
    /// The table the object points to must be mapped and hold at least the
    /// recorded number of entries.
    pub unsafe fn from_object(object: &ModuleObject) -> Option<RelocationTable> {
        let addr = object.rel_addr();
        if object.rela_count() != 0 {
            let relas = unsafe { from_raw_parts(addr as *const Elf64_Rela, object.rela_count()) };
            Some(RelocationTable::Rela(relas))
        } else if object.rel_count() != 0 {
            let rels = unsafe { from_raw_parts(addr as *const Elf64_Rel, object.rel_count()) };
            Some(RelocationTable::Rel(rels))
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            RelocationTable::Rela(relas) => relas.len(),
            RelocationTable::Rel(rels) => rels.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applies the relative relocations of `object` and returns how many were
/// written.
///
/// * RELA: B + A is stored at B + offset.
/// * REL: B is added to the word already at B + offset.
///
/// # Safety
/// `object` must have been filled by [`dynamic::parse`](crate::dynamic::parse),
/// and every relocation target must be mapped writable.
pub unsafe fn relocate(object: &ModuleObject) -> usize {
    let base = object.base();
    let Some(table) = (unsafe { RelocationTable::from_object(object) }) else {
        return 0;
    };
    let mut applied = 0;
    match &table {
        RelocationTable::Rela(relas) => {
            for rela in relas.iter() {
                if kind(rela.r_info) != REL_RELATIVE {
                    continue;
                }
                // B + A
                let val = base.wrapping_add_signed(rela.r_addend as isize);
                unsafe { write_val(base, rela.r_offset as usize, val) };
                applied += 1;
            }
        }
        RelocationTable::Rel(rels) => {
            for rel in rels.iter() {
                if kind(rel.r_info) != REL_RELATIVE {
                    continue;
                }
                let ptr = base.wrapping_add(rel.r_offset as usize) as *mut usize;
                unsafe {
                    let origin_val = ptr.read();
                    ptr.write(origin_val.wrapping_add(base));
                }
                applied += 1;
            }
        }
    }
    #[cfg(feature = "log")]
    log::trace!(
        "[Relocate] module: 0x{:x}, entries: {}, relative: {}",
        base,
        table.len(),
        applied
    );
    applied
}

#[inline(always)]
unsafe fn write_val(base: usize, offset: usize, val: usize) {
    unsafe {
        let rel_addr = base.wrapping_add(offset) as *mut usize;
        rel_addr.write(val)
    };
}
