//! Registry of initialized modules
//!
//! Module objects live in a fixed-capacity arena and are chained into an
//! intrusive circular list. Links are arena handles, so the "points to itself
//! when unlinked" state is simply `prev == next == own handle`. The loader's own
//! object is created first and is the list sentinel.
use crate::{
    Result,
    error::registry_full_error,
    object::{ModuleField, ModuleObject},
};
use core::ops::{Index, IndexMut};

/// Registry capacity used by the Horizon entry point.
pub const DEFAULT_MODULE_CAPACITY: usize = 16;

/// Stable identifier of a module object inside a [`ModuleRegistry`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleHandle(usize);

impl ModuleHandle {
    /// The loader's own module, head of the list.
    pub const LOADER: ModuleHandle = ModuleHandle(0);

    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Bootstrap progress of a single module.
///
/// A module only ever moves one step forward; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModuleState {
    Unseen,
    DescriptorLocated,
    BssCleared,
    DynamicParsed,
    Relocated,
    Registered,
}

impl ModuleState {
    /// The state that follows this one, if any.
    pub const fn next(self) -> Option<ModuleState> {
        match self {
            ModuleState::Unseen => Some(ModuleState::DescriptorLocated),
            ModuleState::DescriptorLocated => Some(ModuleState::BssCleared),
            ModuleState::BssCleared => Some(ModuleState::DynamicParsed),
            ModuleState::DynamicParsed => Some(ModuleState::Relocated),
            ModuleState::Relocated => Some(ModuleState::Registered),
            ModuleState::Registered => None,
        }
    }
}

/// Fixed-capacity arena of module objects plus the list threading them.
pub struct ModuleRegistry<const N: usize> {
    objects: [ModuleObject; N],
    states: [ModuleState; N],
    len: usize,
}

impl<const N: usize> Default for ModuleRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ModuleRegistry<N> {
    pub const fn new() -> Self {
        Self {
            objects: [ModuleObject::unlinked(ModuleHandle::LOADER); N],
            states: [ModuleState::Unseen; N],
            len: 0,
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocates an unlinked object for the module at `base`.
    ///
    /// The object is zeroed except for its base address, and both links point
    /// back at it.
    pub fn create(&mut self, base: usize) -> Result<ModuleHandle> {
        if self.len == N {
            return Err(registry_full_error(N));
        }
        let handle = ModuleHandle(self.len);
        let mut object = ModuleObject::unlinked(handle);
        object.set(ModuleField::Base, base);
        self.objects[handle.0] = object;
        self.states[handle.0] = ModuleState::Unseen;
        self.len += 1;
        #[cfg(feature = "log")]
        log::trace!("[Registry] module: 0x{:x}, handle: {}", base, handle.0);
        Ok(handle)
    }

    #[inline]
    pub fn get(&self, handle: ModuleHandle) -> Option<&ModuleObject> {
        self.objects[..self.len].get(handle.0)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: ModuleHandle) -> Option<&mut ModuleObject> {
        self.objects[..self.len].get_mut(handle.0)
    }

    /// Bootstrap progress of `handle`. Handles never created are `Unseen`.
    #[inline]
    pub fn state(&self, handle: ModuleHandle) -> ModuleState {
        self.states[..self.len]
            .get(handle.0)
            .copied()
            .unwrap_or(ModuleState::Unseen)
    }

    /// Moves `handle` one step forward to `to`.
    pub(crate) fn advance(&mut self, handle: ModuleHandle, to: ModuleState) {
        let state = &mut self.states[handle.0];
        debug_assert_eq!(state.next(), Some(to), "module state must move forward");
        *state = to;
    }

    /// Handle of the module loaded at `base`.
    pub fn find(&self, base: usize) -> Option<ModuleHandle> {
        self.objects[..self.len]
            .iter()
            .position(|object| object.base() == base)
            .map(ModuleHandle)
    }

    /// Whether `handle` is part of the list.
    ///
    /// The sentinel always is; any other node is linked once its links stop
    /// pointing at itself.
    pub fn is_linked(&self, handle: ModuleHandle) -> bool {
        match self.get(handle) {
            Some(_) if handle == ModuleHandle::LOADER => true,
            Some(object) => object.next != handle,
            None => false,
        }
    }

    /// Inserts `handle` next to the sentinel, at the tail of the list.
    ///
    /// Linking the sentinel or an already linked node does nothing.
    pub fn link(&mut self, handle: ModuleHandle) {
        if handle.0 >= self.len || self.is_linked(handle) {
            return;
        }
        let head = ModuleHandle::LOADER;
        let tail = self.objects[head.0].prev;
        {
            let object = &mut self.objects[handle.0];
            object.prev = tail;
            object.next = head;
        }
        self.objects[tail.0].next = handle;
        self.objects[head.0].prev = handle;
        #[cfg(feature = "log")]
        log::trace!(
            "[Registry] linked module: 0x{:x}, after handle: {}",
            self.objects[handle.0].base(),
            tail.0
        );
    }

    /// Registered modules in list order, the loader's own module first.
    pub fn iter(&self) -> Iter<'_, N> {
        Iter {
            registry: self,
            cursor: (self.len > 0).then_some(ModuleHandle::LOADER),
        }
    }
}

impl<const N: usize> Index<ModuleHandle> for ModuleRegistry<N> {
    type Output = ModuleObject;

    fn index(&self, handle: ModuleHandle) -> &ModuleObject {
        &self.objects[..self.len][handle.0]
    }
}

impl<const N: usize> IndexMut<ModuleHandle> for ModuleRegistry<N> {
    fn index_mut(&mut self, handle: ModuleHandle) -> &mut ModuleObject {
        &mut self.objects[..self.len][handle.0]
    }
}

/// Walks the list from the sentinel until it comes back around.
pub struct Iter<'a, const N: usize> {
    registry: &'a ModuleRegistry<N>,
    cursor: Option<ModuleHandle>,
}

impl<'a, const N: usize> Iterator for Iter<'a, N> {
    type Item = (ModuleHandle, &'a ModuleObject);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let object = &self.registry.objects[handle.0];
        self.cursor = (object.next != ModuleHandle::LOADER).then_some(object.next);
        Some((handle, object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bases<const N: usize>(registry: &ModuleRegistry<N>) -> [usize; N] {
        let mut out = [0; N];
        for (slot, (_, object)) in out.iter_mut().zip(registry.iter()) {
            *slot = object.base();
        }
        out
    }

    #[test]
    fn created_object_points_to_itself() {
        let mut registry = ModuleRegistry::<4>::new();
        let loader = registry.create(0x1000).unwrap();
        let module = registry.create(0x2000).unwrap();
        assert_eq!(loader, ModuleHandle::LOADER);
        assert_eq!(registry[module].prev(), module);
        assert_eq!(registry[module].next(), module);
        assert!(!registry.is_linked(module));
        assert!(registry.is_linked(loader));
    }

    #[test]
    fn link_keeps_discovery_order() {
        let mut registry = ModuleRegistry::<4>::new();
        let loader = registry.create(0x1000).unwrap();
        let a = registry.create(0x2000).unwrap();
        let b = registry.create(0x3000).unwrap();
        registry.link(a);
        registry.link(b);
        assert_eq!(bases(&registry), [0x1000, 0x2000, 0x3000, 0]);
        assert_eq!(registry[loader].next(), a);
        assert_eq!(registry[loader].prev(), b);
        assert_eq!(registry[a].prev(), loader);
        assert_eq!(registry[b].next(), loader);
    }

    #[test]
    fn relinking_is_a_no_op() {
        let mut registry = ModuleRegistry::<3>::new();
        registry.create(0x1000).unwrap();
        let a = registry.create(0x2000).unwrap();
        registry.link(a);
        registry.link(a);
        registry.link(ModuleHandle::LOADER);
        assert_eq!(registry.iter().count(), 2);
    }

    #[test]
    fn full_registry_is_fatal() {
        let mut registry = ModuleRegistry::<1>::new();
        registry.create(0x1000).unwrap();
        assert_eq!(
            registry.create(0x2000),
            Err(crate::Fatal::RegistryFull { capacity: 1 })
        );
    }

    #[test]
    fn states_move_forward() {
        let mut registry = ModuleRegistry::<1>::new();
        let handle = registry.create(0x1000).unwrap();
        let mut state = registry.state(handle);
        while let Some(next) = state.next() {
            registry.advance(handle, next);
            state = registry.state(handle);
        }
        assert_eq!(state, ModuleState::Registered);
    }
}
