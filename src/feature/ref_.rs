use core::{any::TypeId, fmt, marker::PhantomData};

use featurebox_internals::RawFeatureRef;

use crate::{
    Feature, FeatureError,
    markers::{self, Dynamic, Local, SendSync},
};

/// A borrowed view of a [`Feature`].
///
/// This is the type hooks and iterators hand out. It is `Copy` and offers the
/// same read-only operations as the owned feature, plus
/// [`to_owned_feature`](FeatureRef::to_owned_feature) to make a deep copy.
///
/// # Examples
///
/// ```
/// use featurebox::{Feature, FeatureRef, handlers};
///
/// let feature: Feature<&'static str> = Feature::new_custom("pump", handlers::Display);
/// let view: FeatureRef<'_, &'static str> = feature.as_ref();
///
/// assert_eq!(*view.inner(), "pump");
/// assert_eq!(view.to_string(), "pump");
/// ```
#[repr(transparent)]
pub struct FeatureRef<'a, T = Dynamic, ThreadSafety = SendSync>
where
    T: markers::ObjectMarker + ?Sized,
    ThreadSafety: markers::ThreadSafetyMarker,
{
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. `T` must either be a type bounded by `Sized`, or `Dynamic`.
    /// 2. If `T` is a `Sized` type: The payload of the feature must be of type
    ///    `T`.
    /// 3. If `ThreadSafety = SendSync`: The payload and the strategy of the
    ///    feature must be `Send + Sync`.
    raw: RawFeatureRef<'a>,
    _payload: PhantomData<T>,
    _thread_safety: PhantomData<ThreadSafety>,
}

impl<'a, T, Th> Copy for FeatureRef<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
}

impl<'a, T, Th> Clone for FeatureRef<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T, Th> FeatureRef<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    /// Creates a new [`FeatureRef`] from a [`RawFeatureRef`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `T` is either a `Sized` type, or `Dynamic`.
    /// 2. If `T` is a `Sized` type: The payload of the feature is of type `T`.
    /// 3. If `Th = SendSync`: The payload and the strategy are `Send + Sync`.
    #[must_use]
    pub(crate) unsafe fn from_raw(raw: RawFeatureRef<'a>) -> Self {
        // SAFETY: We must uphold the safety invariants of the raw field:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        // 3. Guaranteed by the caller
        FeatureRef {
            raw,
            _payload: PhantomData,
            _thread_safety: PhantomData,
        }
    }

    #[must_use]
    pub(crate) fn as_raw_ref(self) -> RawFeatureRef<'a> {
        self.raw
    }

    /// Returns the [`TypeId`] of the payload.
    #[must_use]
    pub fn inner_type_id(self) -> TypeId {
        self.as_raw_ref().value_type_id()
    }

    /// Returns the [`core::any::type_name`] of the payload.
    #[must_use]
    pub fn inner_type_name(self) -> &'static str {
        self.as_raw_ref().value_type_name()
    }

    /// Returns the [`TypeId`] of the strategy the feature was bound with.
    #[must_use]
    pub fn strategy_type_id(self) -> TypeId {
        self.as_raw_ref().strategy_type_id()
    }

    /// Returns the [`core::any::type_name`] of the strategy the feature was
    /// bound with.
    #[must_use]
    pub fn strategy_type_name(self) -> &'static str {
        self.as_raw_ref().strategy_type_name()
    }

    /// Returns `true` if the feature was bound with a serialisation handler.
    #[must_use]
    pub fn is_serialisable(self) -> bool {
        self.as_raw_ref().is_serialisable()
    }

    /// Writes the visualisation of the feature into `writer`.
    pub fn visualise<W>(self, writer: &mut W) -> fmt::Result
    where
        W: fmt::Write + ?Sized,
    {
        write!(writer, "{self}")
    }

    /// Writes the serialised form of the payload into `writer`.
    ///
    /// # Errors
    ///
    /// - [`FeatureError::NotSerialisable`] if the feature was bound without a
    ///   serialisation handler. Nothing is written in that case.
    /// - [`FeatureError::Format`] if the handler or the writer failed.
    pub fn serialise(self, writer: &mut dyn fmt::Write) -> crate::Result<()> {
        match self.as_raw_ref().serialise(writer) {
            Some(result) => Ok(result?),
            None => Err(FeatureError::NotSerialisable {
                type_name: self.inner_type_name(),
            }),
        }
    }

    /// Makes a deep copy of the referenced feature.
    ///
    /// Both the payload and the strategy are cloned. If either clone panics,
    /// the panic propagates and nothing is leaked.
    #[must_use]
    pub fn to_owned_feature(self) -> Feature<T, Th> {
        let raw = self.as_raw_ref().clone_raw();

        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. The copy holds a payload of the same type as the original.
        // 3. The copy holds a payload and a strategy of the same types as the
        //    original.
        let copy = unsafe { Feature::<T, Th>::from_raw(raw) };

        crate::hooks::run_clone_hooks(self.into_dynamic().into_local(), copy.as_dynamic_local());

        copy
    }

    /// Forgets the payload type of the reference.
    #[must_use]
    pub fn into_dynamic(self) -> FeatureRef<'a, Dynamic, Th> {
        // SAFETY:
        // 1. `T=Dynamic`, so this is trivially true.
        // 2. `T=Dynamic`, so this is trivially true.
        // 3. Guaranteed by the invariants of this type.
        unsafe { FeatureRef::from_raw(self.as_raw_ref()) }
    }

    /// Forgets the thread-safety guarantee of the reference.
    #[must_use]
    pub fn into_local(self) -> FeatureRef<'a, T, Local> {
        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. Guaranteed by the invariants of this type.
        // 3. `Th=Local`, so this is trivially true.
        unsafe { FeatureRef::from_raw(self.as_raw_ref()) }
    }

    /// Returns a reference to the payload if it is of type `U`.
    #[must_use]
    pub fn downcast_inner<U>(self) -> Option<&'a U>
    where
        U: Sized + 'static,
    {
        if self.inner_type_id() == TypeId::of::<U>() {
            // SAFETY:
            // 1. We just checked that the type IDs match
            Some(unsafe { self.downcast_inner_unchecked() })
        } else {
            None
        }
    }

    /// Returns a reference to the payload, assuming it is of type `U`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The payload is of type `U`.
    #[must_use]
    pub unsafe fn downcast_inner_unchecked<U>(self) -> &'a U
    where
        U: Sized + 'static,
    {
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { self.as_raw_ref().value_downcast_unchecked::<U>() }
    }

    /// Converts the reference into one with payload type `U`, if the payload
    /// is a `U` or `U` is [`Dynamic`].
    #[must_use]
    pub fn downcast_feature<U>(self) -> Option<FeatureRef<'a, U, Th>>
    where
        U: markers::ObjectMarker + ?Sized,
    {
        if TypeId::of::<U>() == TypeId::of::<Dynamic>() || TypeId::of::<U>() == self.inner_type_id()
        {
            // SAFETY:
            // 1. We just checked that the type IDs match, or `U=Dynamic`
            Some(unsafe { self.downcast_feature_unchecked() })
        } else {
            None
        }
    }

    /// Converts the reference into one with payload type `U` without
    /// checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Either `U` is [`Dynamic`], or `U` is a `Sized` type and the payload
    ///    is of type `U`.
    #[must_use]
    pub unsafe fn downcast_feature_unchecked<U>(self) -> FeatureRef<'a, U, Th>
    where
        U: markers::ObjectMarker + ?Sized,
    {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        // 3. Guaranteed by the invariants of this type.
        unsafe { FeatureRef::from_raw(self.as_raw_ref()) }
    }
}

impl<'a, T, Th> FeatureRef<'a, T, Th>
where
    T: markers::ObjectMarker,
    Th: markers::ThreadSafetyMarker,
{
    /// Returns a reference to the payload.
    #[must_use]
    pub fn inner(self) -> &'a T {
        // SAFETY:
        // 1. `T` is `Sized`, so by the invariants of this type the payload is a `T`.
        unsafe { self.downcast_inner_unchecked::<T>() }
    }
}

impl<'a, T, Th> fmt::Display for FeatureRef<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_raw_ref().visualise(f)
    }
}

impl<'a, T, Th> fmt::Debug for FeatureRef<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("type", &self.inner_type_name())
            .field("strategy", &self.strategy_type_name())
            .field("view", &format_args!("{self}"))
            .finish()
    }
}

// SAFETY: The `SendSync` marker indicates that the payload and the strategy
// are `Send + Sync`, so sharing a reference to them across threads is sound.
unsafe impl<'a, T: markers::ObjectMarker + ?Sized> Send for FeatureRef<'a, T, SendSync> {}

// SAFETY: The `SendSync` marker indicates that the payload and the strategy
// are `Send + Sync`, so sharing a reference to them across threads is sound.
unsafe impl<'a, T: markers::ObjectMarker + ?Sized> Sync for FeatureRef<'a, T, SendSync> {}

impl<'a, T, Th> From<&'a Feature<T, Th>> for FeatureRef<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn from(feature: &'a Feature<T, Th>) -> Self {
        feature.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String};

    use super::*;

    #[allow(dead_code)]
    struct NonSend(*const ());
    static_assertions::assert_not_impl_any!(NonSend: Send, Sync);

    #[test]
    fn test_feature_ref_send_sync() {
        static_assertions::assert_impl_all!(FeatureRef<'static, (), SendSync>: Send, Sync);
        static_assertions::assert_impl_all!(FeatureRef<'static, String, SendSync>: Send, Sync);
        static_assertions::assert_impl_all!(FeatureRef<'static, Dynamic, SendSync>: Send, Sync);

        static_assertions::assert_not_impl_any!(FeatureRef<'static, (), Local>: Send, Sync);
        static_assertions::assert_not_impl_any!(FeatureRef<'static, NonSend, Local>: Send, Sync);
        static_assertions::assert_not_impl_any!(FeatureRef<'static, Rc<u8>, Local>: Send, Sync);
        static_assertions::assert_not_impl_any!(FeatureRef<'static, Dynamic, Local>: Send, Sync);
    }

    #[test]
    fn test_feature_ref_copy_clone() {
        static_assertions::assert_impl_all!(FeatureRef<'static, (), SendSync>: Copy, Clone);
        static_assertions::assert_impl_all!(FeatureRef<'static, String, Local>: Copy, Clone);
        static_assertions::assert_impl_all!(FeatureRef<'static, Dynamic, SendSync>: Copy, Clone);
    }

    #[test]
    fn test_feature_ref_size() {
        assert_eq!(
            core::mem::size_of::<FeatureRef<'static, Dynamic>>(),
            core::mem::size_of::<usize>()
        );
        assert_eq!(
            core::mem::size_of::<Option<FeatureRef<'static, Dynamic>>>(),
            core::mem::size_of::<usize>()
        );
    }
}
