//! Uninitialized-data handling
use core::ops::Range;

/// A module's bss bounds, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BssRange {
    pub start: usize,
    pub end: usize,
}

impl BssRange {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes. An inverted range is empty.
    #[inline]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Range<usize>> for BssRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Layout facts the image loader settled before the rtld started.
///
/// The loader does not derive bss bounds itself; whoever mapped the module
/// knows them.
pub trait ImageLayout {
    /// Bss bounds of the module loaded at `base`.
    fn bss_range(&self, base: usize) -> BssRange;
}

impl<F> ImageLayout for F
where
    F: Fn(usize) -> BssRange,
{
    #[inline]
    fn bss_range(&self, base: usize) -> BssRange {
        self(base)
    }
}

/// Zero fills `range`.
///
/// # Safety
/// The whole range must be mapped writable and hold no live Rust values.
pub unsafe fn clear_bss(range: BssRange) {
    let len = range.len();
    if len == 0 {
        return;
    }
    let ptr = range.start as *mut u8;
    unsafe {
        ptr.write_bytes(0, len);
    }
    #[cfg(feature = "log")]
    log::trace!("[Bss] address: 0x{:x}, length: {}", range.start, len);
}
