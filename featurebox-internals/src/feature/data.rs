//! This module encapsulates the fields of the [`FeatureData`]. Since this is
//! the only place they are visible, the type of the [`FeatureVtable`] is
//! guaranteed to always be in sync with the types of the payload and the
//! strategy. This follows from the fact that they are in sync when created
//! and that the API offers no way to change the [`FeatureVtable`], the payload
//! type or the strategy type after creation.

use crate::{
    feature::{raw::RawFeatureRef, vtable::FeatureVtable},
    handlers::{SerialiseHandler, VisualiseHandler},
    util::Erased,
};

/// Type-erased feature data structure with vtable-based dispatch.
///
/// This struct uses `#[repr(C)]` to enable safe field access in type-erased
/// contexts. The vtable is always at offset zero, and because the payload is
/// the second field its offset depends only on `T`, not on `S`.
#[repr(C)]
pub(super) struct FeatureData<T: 'static, S: 'static> {
    /// The vtable of this feature
    vtable: &'static FeatureVtable,
    /// The wrapped payload
    value: T,
    /// The visualisation strategy bound together with the payload
    strategy: S,
}

impl<T: 'static, S: 'static> FeatureData<T, S> {
    /// Creates a new [`FeatureData`] without a serialisation capability.
    #[inline]
    pub(super) fn new(value: T, strategy: S) -> Self
    where
        T: Clone,
        S: VisualiseHandler<T> + Clone,
    {
        Self {
            vtable: FeatureVtable::new::<T, S>(),
            value,
            strategy,
        }
    }

    /// Creates a new [`FeatureData`] that can also be serialised through `P`.
    #[inline]
    pub(super) fn new_serialisable<P>(value: T, strategy: S) -> Self
    where
        T: Clone,
        S: VisualiseHandler<T> + Clone,
        P: SerialiseHandler<T>,
    {
        Self {
            vtable: FeatureVtable::new_serialisable::<T, S, P>(),
            value,
            strategy,
        }
    }

    /// Returns a reference to the payload.
    #[inline]
    pub(super) fn value(&self) -> &T {
        &self.value
    }

    /// Returns a reference to the strategy.
    #[inline]
    pub(super) fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Clones the payload and then the strategy into a new [`FeatureData`]
    /// sharing the same vtable.
    ///
    /// If cloning the strategy panics, the already cloned payload is dropped
    /// while unwinding.
    #[inline]
    pub(super) fn clone_data(&self) -> Self
    where
        T: Clone,
        S: Clone,
    {
        Self {
            vtable: self.vtable,
            value: self.value.clone(),
            strategy: self.strategy.clone(),
        }
    }
}

impl<'a> RawFeatureRef<'a> {
    /// Returns a reference to the [`FeatureVtable`] of the [`FeatureData`]
    /// instance.
    #[inline]
    pub(super) fn vtable(self) -> &'static FeatureVtable {
        let ptr = self.as_ptr();
        // SAFETY: We don't know the actual payload and strategy types, but we do
        // know that the pointer points to an instance of `FeatureData<T, S>` for
        // some specific `T` and `S`. Since `FeatureData` is `#[repr(C)]`, it is
        // safe to create pointers to the first field.
        //
        // We must not create a reference to the `FeatureData` itself, as that
        // would be undefined behavior since we don't have the right type.
        let vtable_ptr: *const &'static FeatureVtable = unsafe { &raw const (*ptr).vtable };

        // SAFETY: Dereferencing the pointer and getting out the `&'static
        // FeatureVtable` is valid for the same reasons
        unsafe { *vtable_ptr }
    }

    /// Accesses the payload of the [`FeatureData`] instance as a reference to
    /// the specified type, without knowing the strategy type.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The type `T` matches the actual payload type stored in the
    ///    [`FeatureData`].
    #[inline]
    pub unsafe fn value_downcast_unchecked<T: 'static>(self) -> &'a T {
        debug_assert_eq!(self.vtable().type_id(), core::any::TypeId::of::<T>());

        // `FeatureData<T, S>` and `FeatureData<T, Erased>` share the offset of
        // `value`, since `repr(C)` places it directly after the vtable.
        let ptr: *const FeatureData<T, Erased> = self.as_ptr().cast::<FeatureData<T, Erased>>();

        // SAFETY: We only project to the `value` field, which is initialized and
        // lives at the same offset as in the real `FeatureData<T, S>`. No
        // reference to the whole struct is created.
        let value_ptr: *const T = unsafe { &raw const (*ptr).value };

        // SAFETY: The payload is initialized, properly aligned and valid for the
        // lifetime `'a` as guaranteed by the invariants of `RawFeatureRef`. The
        // type `T` matches as guaranteed by the caller.
        unsafe { &*value_ptr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_field_offsets() {
        use core::mem::{offset_of, size_of};

        #[repr(align(32))]
        struct LargeAlignment {
            _value: u8,
        }

        assert_eq!(offset_of!(FeatureData<u8, ()>, vtable), 0);
        assert_eq!(offset_of!(FeatureData<u32, u64>, vtable), 0);
        assert_eq!(offset_of!(FeatureData<[u64; 4], u8>, vtable), 0);
        assert_eq!(offset_of!(FeatureData<LargeAlignment, ()>, vtable), 0);

        assert!(offset_of!(FeatureData<u8, ()>, value) >= size_of::<&'static FeatureVtable>());
        assert!(
            offset_of!(FeatureData<LargeAlignment, ()>, value)
                >= size_of::<&'static FeatureVtable>()
        );
    }

    #[test]
    fn test_value_offset_independent_of_strategy() {
        use core::mem::offset_of;

        #[repr(align(64))]
        struct Wide {
            _bytes: [u8; 64],
        }

        let erased = offset_of!(FeatureData<u32, Erased>, value);
        assert_eq!(offset_of!(FeatureData<u32, ()>, value), erased);
        assert_eq!(offset_of!(FeatureData<u32, u8>, value), erased);
        assert_eq!(offset_of!(FeatureData<u32, Wide>, value), erased);

        let erased = offset_of!(FeatureData<[u16; 3], Erased>, value);
        assert_eq!(offset_of!(FeatureData<[u16; 3], Wide>, value), erased);
    }
}
