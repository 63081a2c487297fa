//! Discovering sibling modules
use crate::{
    Result,
    memory::{MemoryInfo, MemoryProbe},
    mod0,
    os::Kernel,
};

/// First address of user-mappable space, where the scan starts.
pub const ADDRESS_SPACE_BEGIN: usize = 0x800_0000;

/// Walks the whole address space, region by region, and yields the base of
/// every sibling module it finds.
///
/// A region is a module candidate when it is read-execute static code. The
/// candidate must carry a valid `MOD0` descriptor; if it does not, the module
/// is corrupt and the scanner yields the fault and stops. The loader's own
/// region is stepped over without reading anything from it.
///
/// The walk ends once the next probe address, taken as signed, is no longer
/// positive. A failed probe also ends it, with the fault as the last item.
pub struct AddressSpaceScanner<'k, K: ?Sized> {
    probe: MemoryProbe<'k, K>,
    self_base: usize,
    cursor: Option<usize>,
}

impl<'k, K: Kernel + ?Sized> AddressSpaceScanner<'k, K> {
    /// Starts a scan at [`ADDRESS_SPACE_BEGIN`].
    ///
    /// # Safety
    /// Every region `kernel` reports as read-execute code must be readable for
    /// at least the module header.
    pub unsafe fn new(kernel: &'k K, self_base: usize) -> Self {
        Self {
            probe: MemoryProbe::new(kernel),
            self_base,
            cursor: Some(ADDRESS_SPACE_BEGIN),
        }
    }

    /// Moves the start of the scan.
    pub fn starting_at(mut self, address: usize) -> Self {
        self.cursor = Some(address);
        self
    }

    fn is_candidate(&self, info: &MemoryInfo) -> bool {
        info.base() != self.self_base && info.is_module_text()
    }
}

impl<K: Kernel + ?Sized> Iterator for AddressSpaceScanner<'_, K> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Result<usize>> {
        loop {
            let address = self.cursor?;
            let info = match self.probe.query(address) {
                Ok(info) => info,
                Err(err) => {
                    self.cursor = None;
                    return Some(Err(err));
                }
            };
            let next = info.end();
            self.cursor = (next as isize > 0).then_some(next);
            #[cfg(feature = "log")]
            log::trace!(
                "[Scan] region: 0x{:x}, size: 0x{:x}, state: 0x{:x}, permission: {:?}",
                info.base(),
                info.size(),
                info.state.0,
                info.permission
            );

            if !self.is_candidate(&info) {
                continue;
            }
            let base = info.base();
            // Mapped read-execute code per the constructor's contract.
            return match unsafe { mod0::locate(base) } {
                Ok(_) => Some(Ok(base)),
                Err(err) => {
                    self.cursor = None;
                    Some(Err(err))
                }
            };
        }
    }
}
