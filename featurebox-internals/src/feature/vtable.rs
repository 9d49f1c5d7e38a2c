//! Vtable for type-erased feature operations.
//!
//! This module contains the [`FeatureVtable`] which enables operating on a
//! feature when its concrete payload type `T` and strategy type `S` have been
//! erased. The vtable stores function pointers that dispatch to the correct
//! typed implementations.
//!
//! This module encapsulates the fields of [`FeatureVtable`] so they cannot
//! be accessed directly. This visibility restriction guarantees the safety
//! invariant: **the vtable's type parameters must match the actual payload
//! and strategy types stored in the [`FeatureData`]**.
//!
//! # Safety Invariant
//!
//! This invariant is maintained because vtables are created as `&'static`
//! references via [`FeatureVtable::new`] and
//! [`FeatureVtable::new_serialisable`], which pair the function pointers with
//! specific types at compile time.

use alloc::boxed::Box;
use core::{any::TypeId, ptr::NonNull};

use crate::{
    feature::{
        data::FeatureData,
        raw::{RawFeature, RawFeatureRef},
    },
    handlers::{SerialiseHandler, VisualiseHandler},
    util::Erased,
};

/// Signature of the optional serialise entry.
type SerialiseFn = unsafe fn(RawFeatureRef<'_>, &mut dyn core::fmt::Write) -> core::fmt::Result;

/// Vtable for type-erased feature operations.
///
/// # Safety Invariant
///
/// The fields `drop`, `clone`, `visualise` and `serialise` are guaranteed to
/// point to the functions defined below instantiated with the payload type
/// `T` and strategy type `S` that were used to create this [`FeatureVtable`].
pub(crate) struct FeatureVtable {
    /// Gets the [`TypeId`] of the payload type.
    type_id: fn() -> TypeId,
    /// Gets the [`core::any::type_name`] of the payload type.
    type_name: fn() -> &'static str,
    /// Gets the [`TypeId`] of the strategy type.
    strategy_type_id: fn() -> TypeId,
    /// Gets the [`core::any::type_name`] of the strategy type.
    strategy_type_name: fn() -> &'static str,
    /// Drops the [`Box<FeatureData<T, S>>`] instance pointed to by this
    /// pointer.
    drop: unsafe fn(NonNull<FeatureData<Erased, Erased>>),
    /// Deep-copies the payload and strategy into a new allocation.
    clone: unsafe fn(RawFeatureRef<'_>) -> RawFeature,
    /// Visualises the payload through the stored strategy.
    visualise: unsafe fn(RawFeatureRef<'_>, &mut core::fmt::Formatter<'_>) -> core::fmt::Result,
    /// Serialises the payload, if a serialiser was bound.
    serialise: Option<SerialiseFn>,
}

impl FeatureVtable {
    /// Creates a new [`FeatureVtable`] for the payload type `T` and the
    /// strategy type `S`, without a serialise entry.
    pub(super) const fn new<T, S>() -> &'static Self
    where
        T: Clone + 'static,
        S: VisualiseHandler<T> + Clone,
    {
        const {
            &Self {
                type_id: TypeId::of::<T>,
                type_name: core::any::type_name::<T>,
                strategy_type_id: TypeId::of::<S>,
                strategy_type_name: core::any::type_name::<S>,
                drop: drop::<T, S>,
                clone: clone::<T, S>,
                visualise: visualise::<T, S>,
                serialise: None,
            }
        }
    }

    /// Creates a new [`FeatureVtable`] for the payload type `T` and the
    /// strategy type `S`, serialising through `P`.
    pub(super) const fn new_serialisable<T, S, P>() -> &'static Self
    where
        T: Clone + 'static,
        S: VisualiseHandler<T> + Clone,
        P: SerialiseHandler<T>,
    {
        const {
            &Self {
                type_id: TypeId::of::<T>,
                type_name: core::any::type_name::<T>,
                strategy_type_id: TypeId::of::<S>,
                strategy_type_name: core::any::type_name::<S>,
                drop: drop::<T, S>,
                clone: clone::<T, S>,
                visualise: visualise::<T, S>,
                serialise: Some(serialise::<T, P> as SerialiseFn),
            }
        }
    }

    /// Gets the [`TypeId`] of the payload type that was used to create this
    /// [`FeatureVtable`].
    #[inline]
    pub(super) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the [`core::any::type_name`] of the payload type that was used to
    /// create this [`FeatureVtable`].
    #[inline]
    pub(super) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Gets the [`TypeId`] of the strategy type that was used to create this
    /// [`FeatureVtable`].
    #[inline]
    pub(super) fn strategy_type_id(&self) -> TypeId {
        (self.strategy_type_id)()
    }

    /// Gets the [`core::any::type_name`] of the strategy type that was used to
    /// create this [`FeatureVtable`].
    #[inline]
    pub(super) fn strategy_type_name(&self) -> &'static str {
        (self.strategy_type_name)()
    }

    /// Returns whether a serialiser was bound with this vtable.
    #[inline]
    pub(super) fn is_serialisable(&self) -> bool {
        self.serialise.is_some()
    }

    /// Drops the `Box<FeatureData<T, S>>` instance pointed to by this pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The pointer comes from [`Box<FeatureData<T, S>>`] via
    ///    [`Box::into_raw`]
    /// 2. This [`FeatureVtable`] must be a vtable for the payload and strategy
    ///    types stored in the [`FeatureData`].
    /// 3. This method drops the [`Box<FeatureData<T, S>>`], so the caller must
    ///    ensure that the pointer has not previously been dropped, that it is
    ///    able to transfer ownership of the pointer, and that it will not use
    ///    the pointer after calling this method.
    #[inline]
    pub(super) unsafe fn drop(&self, ptr: NonNull<FeatureData<Erased, Erased>>) {
        // SAFETY: We know that `self.drop` points to the function `drop::<T, S>`
        // below. That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        // 3. Guaranteed by the caller
        unsafe {
            (self.drop)(ptr);
        }
    }

    /// Deep-copies the feature using the `Clone` implementations of the types
    /// used when creating this [`FeatureVtable`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`FeatureVtable`] must be a vtable for the payload and strategy
    ///    types stored in the [`RawFeatureRef`].
    #[inline]
    pub(super) unsafe fn clone(&self, ptr: RawFeatureRef<'_>) -> RawFeature {
        // SAFETY: We know that the `self.clone` field points to the function
        // `clone::<T, S>` below. That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        unsafe { (self.clone)(ptr) }
    }

    /// Visualises the payload using the [`S::visualise`] method of the
    /// strategy stored with it.
    ///
    /// [`S::visualise`]: VisualiseHandler::visualise
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`FeatureVtable`] must be a vtable for the payload and strategy
    ///    types stored in the [`RawFeatureRef`].
    #[inline]
    pub(super) unsafe fn visualise(
        &self,
        ptr: RawFeatureRef<'_>,
        formatter: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        // SAFETY: We know that the `self.visualise` field points to the function
        // `visualise::<T, S>` below. That function's safety requirements are
        // upheld:
        // 1. Guaranteed by the caller
        unsafe { (self.visualise)(ptr, formatter) }
    }

    /// Serialises the payload using the [`P::serialise`] function used when
    /// creating this [`FeatureVtable`].
    ///
    /// Returns `None` if the vtable was created without a serialiser.
    ///
    /// [`P::serialise`]: SerialiseHandler::serialise
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`FeatureVtable`] must be a vtable for the payload type stored
    ///    in the [`RawFeatureRef`].
    #[inline]
    pub(super) unsafe fn serialise(
        &self,
        ptr: RawFeatureRef<'_>,
        writer: &mut dyn core::fmt::Write,
    ) -> Option<core::fmt::Result> {
        let serialise = self.serialise?;
        // SAFETY: We know that `serialise` points to the function
        // `serialise::<T, P>` below. That function's safety requirements are
        // upheld:
        // 1. Guaranteed by the caller
        Some(unsafe { serialise(ptr, writer) })
    }
}

/// Drops the [`Box<FeatureData<T, S>>`] instance pointed to by this pointer.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The pointer comes from [`Box<FeatureData<T, S>>`] via [`Box::into_raw`]
/// 2. The types `T` and `S` match the actual types stored in the
///    [`FeatureData`]
/// 3. This method drops the [`Box<FeatureData<T, S>>`], so the caller must
///    ensure that the pointer has not previously been dropped, that it is able
///    to transfer ownership of the pointer, and that it will not use the
///    pointer after calling this method.
unsafe fn drop<T: 'static, S: 'static>(ptr: NonNull<FeatureData<Erased, Erased>>) {
    let ptr: NonNull<FeatureData<T, S>> = ptr.cast();
    let ptr = ptr.as_ptr();
    // SAFETY: Our pointer has the correct type as guaranteed by the caller, and it
    // came from a call to `Box::into_raw` as also guaranteed by our caller.
    let boxed = unsafe { Box::from_raw(ptr) };
    core::mem::drop(boxed);
}

/// Deep-copies a feature into a fresh allocation.
///
/// The new allocation is only made after both clones succeeded, so a
/// panicking `Clone` implementation leaves nothing behind.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The types `T` and `S` match the actual types stored in the
///    [`FeatureData`]
unsafe fn clone<T, S>(ptr: RawFeatureRef<'_>) -> RawFeature
where
    T: Clone + 'static,
    S: VisualiseHandler<T> + Clone,
{
    // SAFETY:
    // 1. Guaranteed by the caller
    let data: &FeatureData<T, S> = unsafe { ptr.cast_inner::<T, S>() };
    RawFeature::from_box(Box::new(data.clone_data()))
}

/// Visualises a payload using the strategy stored next to it.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The types `T` and `S` match the actual types stored in the
///    [`FeatureData`]
unsafe fn visualise<T, S>(
    ptr: RawFeatureRef<'_>,
    formatter: &mut core::fmt::Formatter<'_>,
) -> core::fmt::Result
where
    T: 'static,
    S: VisualiseHandler<T>,
{
    // SAFETY:
    // 1. Guaranteed by the caller
    let data: &FeatureData<T, S> = unsafe { ptr.cast_inner::<T, S>() };
    data.strategy().visualise(data.value(), formatter)
}

/// Serialises a payload using the serialiser `P`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The type `T` matches the actual payload type stored in the
///    [`FeatureData`]
unsafe fn serialise<T: 'static, P: SerialiseHandler<T>>(
    ptr: RawFeatureRef<'_>,
    writer: &mut dyn core::fmt::Write,
) -> core::fmt::Result {
    // SAFETY:
    // 1. Guaranteed by the caller
    let value: &T = unsafe { ptr.value_downcast_unchecked::<T>() };
    P::serialise(value, writer)
}
