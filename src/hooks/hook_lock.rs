#[cfg(feature = "std")]
use std::sync as impl_;

#[cfg(not(feature = "std"))]
use spin as impl_;

/// Global lock around lazily created hook state.
///
/// The state starts out as `None` and is created on the first write, so a
/// program that never registers a hook never allocates.
#[repr(transparent)]
pub(crate) struct HookLock<T: 'static + Send + Sync>(impl_::RwLock<Option<T>>);

impl<T: 'static + Send + Sync> HookLock<T> {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self(impl_::RwLock::new(None))
    }

    /// Runs `f` on the current state, or returns `None` if nothing has been
    /// written yet.
    #[inline]
    pub(crate) fn with<R>(&'static self, f: impl FnOnce(&T) -> R) -> Option<R> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.read();

        // Hooks only observe features, so a hook that panicked while holding
        // the lock cannot have left the state half-updated.
        #[cfg(feature = "std")]
        let guard = self.0.read().unwrap_or_else(impl_::PoisonError::into_inner);

        guard.as_ref().map(f)
    }

    /// Runs `f` on the state, creating it first if needed.
    #[inline]
    pub(crate) fn update<R>(&'static self, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Default,
    {
        #[cfg(not(feature = "std"))]
        let mut guard = self.0.write();

        #[cfg(feature = "std")]
        let mut guard = self.0.write().unwrap_or_else(impl_::PoisonError::into_inner);

        f(guard.get_or_insert_with(T::default))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn test_empty_until_first_update() {
        static LOCK: HookLock<Vec<u32>> = HookLock::new();

        assert_eq!(LOCK.with(|values| values.len()), None);

        LOCK.update(|values| values.push(4));
        LOCK.update(|values| values.push(2));

        assert_eq!(LOCK.with(|values| values.clone()), Some(alloc::vec![4, 2]));
    }
}
