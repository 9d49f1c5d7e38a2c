//! Type-erased feature pointer types.
//!
//! This module encapsulates the `ptr` field of [`RawFeature`] and
//! [`RawFeatureRef`], ensuring it is only visible within this module. This
//! visibility restriction guarantees the safety invariant: **the pointer always
//! comes from `Box<FeatureData<T, S>>`**.
//!
//! # Safety Invariant
//!
//! Since the `ptr` field can only be set via [`RawFeature::from_box`] (which
//! creates it from `Box::into_raw`), and cannot be modified afterward (no
//! `pub` or `pub(crate)` fields), the pointer provenance remains valid
//! throughout the value's lifetime.
//!
//! The [`RawFeature::drop`] implementation relies on this invariant to
//! safely reconstruct the `Box` and deallocate the memory.
//!
//! # Type Erasure
//!
//! The concrete type parameters `T` and `S` are erased by casting to
//! `FeatureData<Erased, Erased>`. The vtable stored within the `FeatureData`
//! provides the runtime type information needed to dispatch operations and to
//! safely downcast the payload.

use alloc::boxed::Box;
use core::{any::TypeId, ptr::NonNull};

use crate::{
    feature::data::FeatureData,
    handlers::{SerialiseHandler, VisualiseHandler},
    util::Erased,
};

/// A pointer to a [`FeatureData`] that is guaranteed to point to an
/// initialized instance of a [`FeatureData<T, S>`] for some specific `T` and
/// `S`, though we do not know which.
///
/// However, the pointer is allowed to transition into a non-initialized state
/// inside the [`RawFeature::drop`] method.
///
/// The pointer is guaranteed to have been created using [`Box::into_raw`].
///
/// We cannot use a [`Box<FeatureData<T, S>>`] directly, because that does not
/// allow us to type-erase `T` and `S`.
#[repr(transparent)]
pub struct RawFeature {
    /// Pointer to the inner feature data
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer must have been created from a `Box<FeatureData<T, S>>`
    ///    for some `T` and `S` using `Box::into_raw`.
    /// 2. The pointer will point to the same `FeatureData<T, S>` for the
    ///    entire lifetime of this object.
    /// 3. The pointee is properly initialized for the entire lifetime of this
    ///    object, except during the execution of the `Drop` implementation.
    ptr: NonNull<FeatureData<Erased, Erased>>,
}

impl RawFeature {
    /// Creates a new [`RawFeature`] binding `value` to `strategy`.
    ///
    /// The returned feature has no serialisation capability.
    #[inline]
    pub fn new<T, S>(value: T, strategy: S) -> Self
    where
        T: Clone + 'static,
        S: VisualiseHandler<T> + Clone,
    {
        Self::from_box(Box::new(FeatureData::new(value, strategy)))
    }

    /// Creates a new [`RawFeature`] binding `value` to `strategy`, which can
    /// additionally be serialised through `P`.
    #[inline]
    pub fn new_serialisable<T, S, P>(value: T, strategy: S) -> Self
    where
        T: Clone + 'static,
        S: VisualiseHandler<T> + Clone,
        P: SerialiseHandler<T>,
    {
        Self::from_box(Box::new(FeatureData::new_serialisable::<P>(value, strategy)))
    }

    /// Erases the types of a boxed [`FeatureData`].
    #[inline]
    pub(super) fn from_box<T: 'static, S: 'static>(data: Box<FeatureData<T, S>>) -> Self {
        let ptr: *mut FeatureData<T, S> = Box::into_raw(data);
        let ptr: *mut FeatureData<Erased, Erased> = ptr.cast::<FeatureData<Erased, Erased>>();

        // SAFETY: `Box::into_raw` returns a non-null pointer
        let ptr: NonNull<FeatureData<Erased, Erased>> = unsafe { NonNull::new_unchecked(ptr) };

        Self { ptr }
    }

    /// Returns a reference to the [`FeatureData`] instance.
    #[inline]
    pub fn as_ref(&self) -> RawFeatureRef<'_> {
        RawFeatureRef {
            ptr: self.ptr,
            _marker: core::marker::PhantomData,
        }
    }

    /// Creates an independent deep copy of this feature.
    ///
    /// See [`RawFeatureRef::clone_raw`].
    #[inline]
    pub fn clone_raw(&self) -> RawFeature {
        self.as_ref().clone_raw()
    }
}

impl core::ops::Drop for RawFeature {
    #[inline]
    fn drop(&mut self) {
        let vtable = self.as_ref().vtable();

        // SAFETY:
        // 1. The pointer comes from `Box::into_raw` (guaranteed by
        //    `RawFeature::from_box`)
        // 2. The vtable returned by `self.as_ref().vtable()` is guaranteed to match the
        //    data in the `FeatureData`.
        // 3. The pointer is initialized and has not been previously freed as
        //    guaranteed by the invariants on this type. We are correctly transferring
        //    ownership here and the pointer is not used afterwards, as we are in the
        //    drop function.
        unsafe {
            vtable.drop(self.ptr);
        }
    }
}

/// A lifetime-bound pointer to a [`FeatureData`] that is guaranteed to
/// point to an initialized instance of a [`FeatureData<T, S>`] for some
/// specific `T` and `S`, though we do not know which.
///
/// We cannot use a [`&'a FeatureData<T, S>`] directly, because that would
/// require us to know the actual types, which we do not.
///
/// [`&'a FeatureData<T, S>`]: FeatureData
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RawFeatureRef<'a> {
    /// Pointer to the inner feature data
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer must have been created from a `Box<FeatureData<T, S>>`
    ///    for some `T` and `S` using `Box::into_raw`.
    /// 2. The pointer will point to the same `FeatureData<T, S>` for the
    ///    entire lifetime of this object.
    ptr: NonNull<FeatureData<Erased, Erased>>,

    /// Marker to tell the compiler that we should
    /// behave the same as a `&'a FeatureData<Erased, Erased>`
    _marker: core::marker::PhantomData<&'a FeatureData<Erased, Erased>>,
}

impl<'a> RawFeatureRef<'a> {
    /// Casts the [`RawFeatureRef`] to a [`FeatureData<T, S>`] reference.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The types `T` and `S` match the actual payload and strategy types
    ///    stored in the [`FeatureData`].
    #[inline]
    pub(super) unsafe fn cast_inner<T: 'static, S: 'static>(self) -> &'a FeatureData<T, S> {
        // Debug assertions to catch type mismatches in case of bugs
        debug_assert_eq!(self.vtable().type_id(), TypeId::of::<T>());
        debug_assert_eq!(self.vtable().strategy_type_id(), TypeId::of::<S>());

        let this = self.ptr.cast::<FeatureData<T, S>>();
        // SAFETY: Converting the NonNull pointer to a reference is sound because:
        // - The pointer is non-null, properly aligned, and dereferenceable (guaranteed
        //   by RawFeatureRef's type invariants)
        // - The pointee is properly initialized (RawFeatureRef's doc comment
        //   guarantees it points to an initialized FeatureData<T, S> for some T and S)
        // - The types `T` and `S` match the actual types (guaranteed by caller)
        // - Shared access is allowed
        // - The reference lifetime 'a is valid (tied to RawFeatureRef<'a>'s lifetime)
        unsafe { this.as_ref() }
    }

    /// Returns a raw pointer to the [`FeatureData`] instance.
    #[inline]
    pub(super) fn as_ptr(self) -> *const FeatureData<Erased, Erased> {
        self.ptr.as_ptr()
    }

    /// Returns the [`TypeId`] of the payload.
    #[inline]
    pub fn value_type_id(self) -> TypeId {
        self.vtable().type_id()
    }

    /// Returns the [`core::any::type_name`] of the payload.
    #[inline]
    pub fn value_type_name(self) -> &'static str {
        self.vtable().type_name()
    }

    /// Returns the [`TypeId`] of the strategy.
    #[inline]
    pub fn strategy_type_id(self) -> TypeId {
        self.vtable().strategy_type_id()
    }

    /// Returns the [`core::any::type_name`] of the strategy.
    #[inline]
    pub fn strategy_type_name(self) -> &'static str {
        self.vtable().strategy_type_name()
    }

    /// Returns whether the feature was bound with a serialiser.
    #[inline]
    pub fn is_serialisable(self) -> bool {
        self.vtable().is_serialisable()
    }

    /// Visualises the payload by calling the [`VisualiseHandler::visualise`]
    /// method of the strategy stored in the [`FeatureData`].
    #[inline]
    pub fn visualise(self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let vtable = self.vtable();
        // SAFETY:
        // 1. The vtable returned by `self.vtable()` is guaranteed to match the data in
        //    the `FeatureData`.
        unsafe { vtable.visualise(self, formatter) }
    }

    /// Serialises the payload using the [`SerialiseHandler`] that was bound
    /// when creating the [`FeatureData`].
    ///
    /// Returns `None` if the feature was created without one.
    #[inline]
    pub fn serialise(self, writer: &mut dyn core::fmt::Write) -> Option<core::fmt::Result> {
        let vtable = self.vtable();
        // SAFETY:
        // 1. The vtable returned by `self.vtable()` is guaranteed to match the data in
        //    the `FeatureData`.
        unsafe { vtable.serialise(self, writer) }
    }

    /// Creates an independent deep copy of the payload and the strategy.
    ///
    /// A panic raised by either `Clone` implementation propagates to the
    /// caller, and no allocation is leaked.
    #[inline]
    pub fn clone_raw(self) -> RawFeature {
        let vtable = self.vtable();
        // SAFETY:
        // 1. The vtable returned by `self.vtable()` is guaranteed to match the data in
        //    the `FeatureData`.
        unsafe { vtable.clone(self) }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{format, string::String};

    use super::*;

    #[derive(Clone)]
    struct DisplayStrategy;
    impl<T: core::fmt::Display> VisualiseHandler<T> for DisplayStrategy {
        fn visualise(&self, value: &T, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            core::fmt::Display::fmt(value, formatter)
        }
    }

    #[derive(Clone)]
    struct Prefixed(&'static str);
    impl VisualiseHandler<i32> for Prefixed {
        fn visualise(&self, value: &i32, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(formatter, "{}{}", self.0, value)
        }
    }

    struct Quoted;
    impl SerialiseHandler<String> for Quoted {
        fn serialise(value: &String, writer: &mut dyn core::fmt::Write) -> core::fmt::Result {
            write!(writer, "{value:?}")
        }
    }

    // Helper struct for rendering through a `RawFeatureRef`
    struct Visualised<'a>(RawFeatureRef<'a>);

    impl core::fmt::Display for Visualised<'_> {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            self.0.visualise(f)
        }
    }

    #[test]
    fn test_raw_feature_size() {
        assert_eq!(
            core::mem::size_of::<RawFeature>(),
            core::mem::size_of::<usize>()
        );
        assert_eq!(
            core::mem::size_of::<Option<RawFeature>>(),
            core::mem::size_of::<usize>()
        );
        assert_eq!(
            core::mem::size_of::<RawFeatureRef<'_>>(),
            core::mem::size_of::<usize>()
        );
        assert_eq!(
            core::mem::size_of::<Option<RawFeatureRef<'_>>>(),
            core::mem::size_of::<usize>()
        );
    }

    #[test]
    fn test_raw_feature_get_refs() {
        let feature = RawFeature::new(100, DisplayStrategy);
        let feature_ref = feature.as_ref();

        // Accessing the pointer multiple times should be safe and consistent
        let ptr1 = feature_ref.as_ptr();
        let ptr2 = feature_ref.as_ptr();
        assert_eq!(ptr1, ptr2);
    }

    #[test]
    fn test_raw_feature_type_ids() {
        let int_feature = RawFeature::new(42i32, DisplayStrategy);
        let string_feature = RawFeature::new(String::from("test"), DisplayStrategy);

        let int_ref = int_feature.as_ref();
        let string_ref = string_feature.as_ref();

        assert_eq!(int_ref.value_type_id(), TypeId::of::<i32>());
        assert_eq!(string_ref.value_type_id(), TypeId::of::<String>());
        assert_eq!(int_ref.strategy_type_id(), TypeId::of::<DisplayStrategy>());

        // The vtables should be different
        assert!(!core::ptr::eq(int_ref.vtable(), string_ref.vtable()));
    }

    #[test]
    fn test_raw_feature_visualise() {
        let plain = RawFeature::new(42i32, DisplayStrategy);
        let prefixed = RawFeature::new(42i32, Prefixed("value="));

        assert_eq!(format!("{}", Visualised(plain.as_ref())), "42");
        assert_eq!(format!("{}", Visualised(prefixed.as_ref())), "value=42");
    }

    #[test]
    fn test_raw_feature_serialise() {
        let plain = RawFeature::new(String::from("a"), DisplayStrategy);
        let serialisable =
            RawFeature::new_serialisable::<_, _, Quoted>(String::from("a"), DisplayStrategy);

        let mut out = String::new();
        assert!(plain.as_ref().serialise(&mut out).is_none());
        assert!(out.is_empty());
        assert!(!plain.as_ref().is_serialisable());

        assert_eq!(serialisable.as_ref().serialise(&mut out), Some(Ok(())));
        assert_eq!(out, "\"a\"");
        assert!(serialisable.as_ref().is_serialisable());
    }

    #[test]
    fn test_raw_feature_clone_is_independent() {
        let original = RawFeature::new(7i32, Prefixed("#"));
        let copy = original.clone_raw();

        assert_ne!(original.as_ref().as_ptr(), copy.as_ref().as_ptr());
        assert!(core::ptr::eq(original.as_ref().vtable(), copy.as_ref().vtable()));
        assert_eq!(format!("{}", Visualised(copy.as_ref())), "#7");

        drop(original);
        assert_eq!(format!("{}", Visualised(copy.as_ref())), "#7");
    }

    #[test]
    fn test_raw_feature_value_downcast() {
        let feature = RawFeature::new(String::from("payload"), DisplayStrategy);
        // SAFETY: The payload is a `String`
        let value: &String = unsafe { feature.as_ref().value_downcast_unchecked::<String>() };
        assert_eq!(value, "payload");
    }

    #[test]
    fn test_send_sync() {
        static_assertions::assert_not_impl_any!(RawFeature: Send, Sync);
        static_assertions::assert_not_impl_any!(RawFeatureRef<'_>: Send, Sync);
    }
}
