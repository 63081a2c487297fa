//! The `MOD0` bootstrap descriptor
//!
//! Every module image carries, at `base + 4`, the 32-bit offset of its `MOD0`
//! header. The header is the only way to find a module's dynamic section
//! without a filesystem.
use crate::{Result, error::bad_magic_error};
use static_assertions::const_assert_eq;
use zerocopy::{
    FromBytes, Immutable, KnownLayout,
    little_endian::{I32, U32},
};

/// MOD0 magic number: "MOD0" in ASCII.
pub const MOD0_MAGIC: u32 = 0x30444f4d;

/// Position, relative to the module base, of the word holding the header offset.
pub const HEADER_OFFSET_POSITION: usize = 4;

/// Index of the field holding the dynamic section offset.
pub const DYNAMIC_OFFSET_FIELD: usize = 6;

/// MOD0 header: the magic followed by seven offset fields.
///
/// Fields are numbered from the magic, which is field 0; field
/// [`DYNAMIC_OFFSET_FIELD`] therefore sits at byte 0x18.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct Mod0Header {
    /// Magic number (must be [`MOD0_MAGIC`])
    pub magic: U32,
    /// Offset fields 1 through 7
    pub fields: [I32; 7],
}

const_assert_eq!(size_of::<Mod0Header>(), 0x20);

impl Mod0Header {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic.get() == MOD0_MAGIC
    }

    /// Reads a header word by index. Index 0 is the magic.
    pub fn field(&self, index: usize) -> Option<u32> {
        match index {
            0 => Some(self.magic.get()),
            _ => self.fields.get(index - 1).map(|field| field.get() as u32),
        }
    }

    /// Offset of the dynamic section from the module base.
    #[inline]
    pub fn dynamic_offset(&self) -> i32 {
        self.fields[DYNAMIC_OFFSET_FIELD - 1].get()
    }
}

/// Reads the header offset word of the module at `base`.
///
/// # Safety
/// `base + 4` must be mapped and readable.
#[inline]
pub unsafe fn header_offset(base: usize) -> u32 {
    let ptr = (base + HEADER_OFFSET_POSITION) as *const u32;
    u32::from_le(unsafe { ptr.read_unaligned() })
}

/// Finds and validates the `MOD0` header of the module at `base`.
///
/// # Safety
/// `base` must be the start of a mapped module image.
pub unsafe fn locate(base: usize) -> Result<&'static Mod0Header> {
    let offset = unsafe { header_offset(base) } as usize;
    let ptr = base.wrapping_add(offset) as *const u8;
    let bytes = unsafe { core::slice::from_raw_parts(ptr, size_of::<Mod0Header>()) };
    let header = Mod0Header::ref_from_bytes(bytes).map_err(|_| bad_magic_error(base, 0))?;
    if !header.is_valid() {
        return Err(bad_magic_error(base, header.magic.get()));
    }
    #[cfg(feature = "log")]
    log::trace!(
        "[Mod0] module: 0x{:x}, header: 0x{:x}, dynamic offset: 0x{:x}",
        base,
        ptr as usize,
        header.dynamic_offset()
    );
    Ok(header)
}

/// Address of the dynamic section of the module at `base`.
#[inline]
pub fn dynamic_ptr(base: usize, header: &Mod0Header) -> usize {
    base.wrapping_add_signed(header.dynamic_offset() as isize)
}
