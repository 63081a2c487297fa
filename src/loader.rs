use crate::{
    Result, dynamic, mod0,
    object::ModuleField,
    os::Kernel,
    registry::{ModuleHandle, ModuleRegistry, ModuleState},
    relocation,
    scan::{ADDRESS_SPACE_BEGIN, AddressSpaceScanner},
    segment::{ImageLayout, clear_bss},
};

/// Bootstraps every module mapped into the process.
///
/// The loader borrows everything it works with: the kernel it probes and halts
/// through, the image loader's layout answers, and the registry the module
/// objects end up in.
///
/// # Examples
/// ```no_run
/// # use rtld::{Loader, ModuleRegistry, Kernel, BssRange};
/// # fn boot<K: Kernel>(kernel: &K, self_base: usize) {
/// let layout = |base: usize| BssRange::new(base + 0x4000, base + 0x4800);
/// let mut registry = ModuleRegistry::<8>::new();
/// unsafe {
///     Loader::new(kernel, &layout, &mut registry)
///         .address_space_begin(0x7100_0000)
///         .initialize(self_base)
/// };
/// assert!(registry.iter().count() >= 1);
/// # }
/// ```
pub struct Loader<'a, K: ?Sized, L: ?Sized, const N: usize> {
    kernel: &'a K,
    layout: &'a L,
    registry: &'a mut ModuleRegistry<N>,
    address_space_begin: usize,
}

impl<'a, K: Kernel + ?Sized, L: ImageLayout + ?Sized, const N: usize> Loader<'a, K, L, N> {
    /// Creates a loader over an empty registry.
    pub fn new(kernel: &'a K, layout: &'a L, registry: &'a mut ModuleRegistry<N>) -> Self {
        debug_assert!(registry.is_empty(), "modules are bootstrapped only once");
        Self {
            kernel,
            layout,
            registry,
            address_space_begin: ADDRESS_SPACE_BEGIN,
        }
    }

    /// Where the sibling scan starts. Defaults to [`ADDRESS_SPACE_BEGIN`].
    pub fn address_space_begin(mut self, address: usize) -> Self {
        self.address_space_begin = address;
        self
    }

    /// Initializes the loader's own module, then every sibling the scan finds.
    ///
    /// Each module is fully initialized before the scan moves on. When this
    /// returns, every discovered module is registered. Any fault halts the
    /// process instead: see [`Fatal::halt`](crate::Fatal::halt).
    ///
    /// # Safety
    /// `self_base` must be the base of the running loader image. The kernel's
    /// answers must describe the real address space, every module must be
    /// mapped with writable data, and the layout's bss ranges must be owned by
    /// their modules.
    pub unsafe fn initialize(self, self_base: usize) {
        let kernel = self.kernel;
        if let Err(fatal) = unsafe { self.try_initialize(self_base) } {
            fatal.halt(kernel)
        }
    }

    unsafe fn try_initialize(self, self_base: usize) -> Result<()> {
        let Loader {
            kernel,
            layout,
            registry,
            address_space_begin,
        } = self;

        #[cfg(feature = "log")]
        log::trace!(
            "[Loader] self: 0x{:x}, scan from: 0x{:x}",
            self_base,
            address_space_begin
        );
        let own = unsafe { init_module(registry, layout, self_base)? };
        debug_assert_eq!(own, ModuleHandle::LOADER);

        let scanner = unsafe { AddressSpaceScanner::new(kernel, self_base) }
            .starting_at(address_space_begin);
        for base in scanner {
            unsafe { init_module(registry, layout, base?)? };
        }

        #[cfg(feature = "log")]
        log::info!("[Loader] {} modules registered", registry.len());
        Ok(())
    }
}

/// Runs one module through every bootstrap step, in order.
unsafe fn init_module<L: ImageLayout + ?Sized, const N: usize>(
    registry: &mut ModuleRegistry<N>,
    layout: &L,
    base: usize,
) -> Result<ModuleHandle> {
    let handle = registry.create(base)?;

    let header = unsafe { mod0::locate(base)? };
    registry[handle].set(ModuleField::Dynamic, mod0::dynamic_ptr(base, header));
    registry.advance(handle, ModuleState::DescriptorLocated);

    unsafe { clear_bss(layout.bss_range(base)) };
    registry.advance(handle, ModuleState::BssCleared);

    unsafe { dynamic::parse(&mut registry[handle])? };
    registry.advance(handle, ModuleState::DynamicParsed);

    unsafe { relocation::relocate(&registry[handle]) };
    registry.advance(handle, ModuleState::Relocated);

    registry.link(handle);
    registry.advance(handle, ModuleState::Registered);
    Ok(handle)
}
