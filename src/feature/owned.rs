use core::{any::TypeId, fmt};

use featurebox_internals::RawFeature;

use crate::{
    FeatureRef,
    capability::{Serialise, Visualise},
    handlers::{self, SerialiseHandler, VisualiseHandler},
    markers::{self, Dynamic, Local, ObjectMarkerFor, SendSync, ThreadSafetyMarker},
};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `raw` field
/// an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use featurebox_internals::{RawFeature, RawFeatureRef};

    use crate::markers::{self, Dynamic, SendSync};

    /// A type-erased value wrapper.
    ///
    /// A feature owns exactly one payload together with the strategy that
    /// visualises it. Both are chosen when the feature is bound and stay fixed
    /// for its whole lifetime: [`Display`](core::fmt::Display) and
    /// [`visualise`](Feature::visualise) always forward to that strategy,
    /// whatever the feature is later converted to.
    ///
    /// The payload type can be kept in the type (`Feature<T>`) for direct
    /// access through [`inner`](Feature::inner), or erased with
    /// [`into_dynamic`](Feature::into_dynamic) so that features holding
    /// different types can live side by side.
    ///
    /// Cloning a feature makes a deep copy of both the payload and the
    /// strategy. Moving a feature only moves a pointer.
    ///
    /// # Examples
    ///
    /// ```
    /// use featurebox::{Feature, handlers};
    ///
    /// let a: Feature<u32> = Feature::new_custom(5, handlers::Display);
    /// let b: Feature<String> = Feature::new_custom("five".to_string(), handlers::Debug);
    ///
    /// let features: Vec<Feature> = vec![a.into_dynamic(), b.into_dynamic()];
    /// let rendered: Vec<String> = features.iter().map(|f| f.to_string()).collect();
    /// assert_eq!(rendered, ["5", "\"five\""]);
    /// ```
    #[repr(transparent)]
    pub struct Feature<T = Dynamic, ThreadSafety = SendSync>
    where
        T: markers::ObjectMarker + ?Sized,
        ThreadSafety: markers::ThreadSafetyMarker,
    {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. `T` must either be a type bounded by `Sized`, or `Dynamic`.
        /// 2. If `T` is a `Sized` type: The payload must be of type `T`.
        /// 3. If `ThreadSafety = SendSync`: The payload and the strategy must
        ///    be `Send + Sync`.
        raw: RawFeature,
        _payload: PhantomData<T>,
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<T, Th> Feature<T, Th>
    where
        T: markers::ObjectMarker + ?Sized,
        Th: markers::ThreadSafetyMarker,
    {
        /// Creates a new [`Feature`] from a [`RawFeature`].
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. `T` is either a `Sized` type, or `Dynamic`.
        /// 2. If `T` is a `Sized` type: The payload is of type `T`.
        /// 3. If `Th = SendSync`: The payload and the strategy are
        ///    `Send + Sync`.
        #[must_use]
        pub(crate) unsafe fn from_raw(raw: RawFeature) -> Self {
            // SAFETY: We must uphold the safety invariants of the raw field:
            // 1. Guaranteed by the caller
            // 2. Guaranteed by the caller
            // 3. Guaranteed by the caller
            Feature {
                raw,
                _payload: PhantomData,
                _thread_safety: PhantomData,
            }
        }

        /// Consumes the [`Feature`] and returns the inner [`RawFeature`].
        #[must_use]
        pub(crate) fn into_raw(self) -> RawFeature {
            // SAFETY: We are destroying `self`, so we no longer need to uphold
            // any safety invariants.
            self.raw
        }

        /// Creates a [`RawFeatureRef`] pointing at this feature.
        #[must_use]
        pub(crate) fn as_raw_ref(&self) -> RawFeatureRef<'_> {
            // SAFETY: We must uphold the safety invariants of the raw field:
            // 1. Upheld as the type parameters do not change.
            // 2. Upheld as the type parameters do not change.
            // 3. Upheld as the type parameters do not change.
            let raw = &self.raw;

            raw.as_ref()
        }
    }
}
pub use limit_field_access::Feature;

impl<T, Th> Feature<T, Th>
where
    T: markers::ObjectMarker,
    Th: ThreadSafetyMarker,
{
    /// Binds `value` with the [`Intrinsic`](handlers::Intrinsic) strategy,
    /// which uses the payload's own [`Visualise`] implementation.
    ///
    /// The thread-safety marker is inferred from context. See
    /// [`new_sendsync`](Feature::new_sendsync) and
    /// [`new_local`](Feature::new_local) to pick it explicitly.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::fmt;
    ///
    /// use featurebox::{Feature, Visualise};
    ///
    /// #[derive(Clone)]
    /// struct Valve {
    ///     open: bool,
    /// }
    ///
    /// impl Visualise for Valve {
    ///     fn visualise(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    ///         formatter.write_str(if self.open { "valve: open" } else { "valve: closed" })
    ///     }
    /// }
    ///
    /// let feature: Feature<Valve> = Feature::new(Valve { open: true });
    /// assert_eq!(feature.to_string(), "valve: open");
    /// ```
    #[must_use]
    pub fn new(value: T) -> Self
    where
        T: ObjectMarkerFor<Th> + Visualise + Clone,
        handlers::Intrinsic: ObjectMarkerFor<Th>,
    {
        Self::new_custom(value, handlers::Intrinsic)
    }

    /// Binds `value` together with an explicit visualisation `strategy`.
    ///
    /// The strategy takes precedence over any [`Visualise`] implementation of
    /// the payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use featurebox::{Feature, handlers::VisualiseHandler};
    ///
    /// #[derive(Clone)]
    /// struct Prefixed(&'static str);
    ///
    /// impl VisualiseHandler<u16> for Prefixed {
    ///     fn visualise(&self, value: &u16, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    ///         write!(f, "{}{value}", self.0)
    ///     }
    /// }
    ///
    /// let feature: Feature<u16> = Feature::new_custom(8080, Prefixed("port "));
    /// assert_eq!(feature.to_string(), "port 8080");
    /// ```
    #[must_use]
    pub fn new_custom<S>(value: T, strategy: S) -> Self
    where
        T: ObjectMarkerFor<Th> + Clone,
        S: VisualiseHandler<T> + ObjectMarkerFor<Th> + Clone,
    {
        let raw = RawFeature::new(value, strategy);

        // SAFETY:
        // 1. `T` is bounded by `Sized` in this impl, so this is trivially true.
        // 2. We just created the `RawFeature` and it does indeed hold a payload of
        //    type `T`.
        // 3. If `Th=Local`, then this is trivially true. If `Th=SendSync`, then the
        //    bounds `T: ObjectMarkerFor<SendSync>` and `S: ObjectMarkerFor<SendSync>`
        //    guarantee that both are `Send + Sync`.
        let feature = unsafe { Feature::from_raw(raw) };
        crate::hooks::run_bind_hooks(feature.as_dynamic_local());
        feature
    }

    /// Binds `value` with a closure as its visualisation strategy.
    ///
    /// # Examples
    ///
    /// ```
    /// use featurebox::Feature;
    ///
    /// let feature: Feature<(u8, u8)> =
    ///     Feature::with_strategy((3, 4), |(w, h), f| write!(f, "{w}x{h}"));
    /// assert_eq!(feature.to_string(), "3x4");
    /// ```
    #[must_use]
    pub fn with_strategy<F>(value: T, strategy: F) -> Self
    where
        T: ObjectMarkerFor<Th> + Clone,
        F: Fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result + Clone + 'static,
        handlers::FnVisualiser<F>: ObjectMarkerFor<Th>,
    {
        Self::new_custom(value, handlers::FnVisualiser::new(strategy))
    }

    /// Binds `value` with the [`Intrinsic`](handlers::Intrinsic) strategy and
    /// the payload's own [`Serialise`] implementation.
    #[must_use]
    pub fn new_serialisable(value: T) -> Self
    where
        T: ObjectMarkerFor<Th> + Visualise + Serialise + Clone,
        handlers::Intrinsic: ObjectMarkerFor<Th>,
    {
        Self::new_serialisable_custom::<handlers::Intrinsic, handlers::Intrinsic>(
            value,
            handlers::Intrinsic,
        )
    }

    /// Binds `value` with an explicit visualisation `strategy` and the
    /// serialisation handler `P`.
    ///
    /// # Examples
    ///
    /// ```
    /// use featurebox::{Feature, handlers::{self, SerialiseHandler}};
    ///
    /// struct Hex;
    ///
    /// impl SerialiseHandler<u32> for Hex {
    ///     fn serialise(value: &u32, writer: &mut dyn core::fmt::Write) -> core::fmt::Result {
    ///         write!(writer, "{value:#x}")
    ///     }
    /// }
    ///
    /// let feature: Feature<u32> =
    ///     Feature::new_serialisable_custom::<_, Hex>(255, handlers::Display);
    /// let mut out = String::new();
    /// feature.serialise(&mut out)?;
    /// assert_eq!((feature.to_string(), out), ("255".to_string(), "0xff".to_string()));
    /// # Ok::<(), featurebox::FeatureError>(())
    /// ```
    #[must_use]
    pub fn new_serialisable_custom<S, P>(value: T, strategy: S) -> Self
    where
        T: ObjectMarkerFor<Th> + Clone,
        S: VisualiseHandler<T> + ObjectMarkerFor<Th> + Clone,
        P: SerialiseHandler<T>,
    {
        let raw = RawFeature::new_serialisable::<T, S, P>(value, strategy);

        // SAFETY:
        // 1. `T` is bounded by `Sized` in this impl, so this is trivially true.
        // 2. We just created the `RawFeature` and it does indeed hold a payload of
        //    type `T`.
        // 3. If `Th=Local`, then this is trivially true. If `Th=SendSync`, then the
        //    bounds `T: ObjectMarkerFor<SendSync>` and `S: ObjectMarkerFor<SendSync>`
        //    guarantee that both are `Send + Sync`.
        let feature = unsafe { Feature::from_raw(raw) };
        crate::hooks::run_bind_hooks(feature.as_dynamic_local());
        feature
    }

    /// Returns a reference to the payload.
    #[must_use]
    pub fn inner(&self) -> &T {
        self.as_ref().inner()
    }
}

impl<T, Th> Feature<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: ThreadSafetyMarker,
{
    /// Forgets the payload type of the feature.
    ///
    /// The bound strategy is unaffected.
    #[must_use]
    pub fn into_dynamic(self) -> Feature<Dynamic, Th> {
        let raw = self.into_raw();

        // SAFETY:
        // 1. `T=Dynamic`, so this is trivially true.
        // 2. `T=Dynamic`, so this is trivially true.
        // 3. Guaranteed by the invariants of this type.
        unsafe {
            // @add-unsafe-context: Dynamic
            Feature::<Dynamic, Th>::from_raw(raw)
        }
    }

    /// Forgets the thread-safety guarantee of the feature.
    #[must_use]
    pub fn into_local(self) -> Feature<T, Local> {
        let raw = self.into_raw();

        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. Guaranteed by the invariants of this type.
        // 3. `Th=Local`, so this is trivially true.
        unsafe { Feature::from_raw(raw) }
    }

    /// Returns the [`TypeId`] of the payload.
    #[must_use]
    pub fn inner_type_id(&self) -> TypeId {
        self.as_raw_ref().value_type_id()
    }

    /// Returns the [`core::any::type_name`] of the payload.
    #[must_use]
    pub fn inner_type_name(&self) -> &'static str {
        self.as_raw_ref().value_type_name()
    }

    /// Returns the [`TypeId`] of the strategy the feature was bound with.
    #[must_use]
    pub fn strategy_type_id(&self) -> TypeId {
        self.as_raw_ref().strategy_type_id()
    }

    /// Returns the [`core::any::type_name`] of the strategy the feature was
    /// bound with.
    #[must_use]
    pub fn strategy_type_name(&self) -> &'static str {
        self.as_raw_ref().strategy_type_name()
    }

    /// Returns `true` if the feature was bound with a serialisation handler.
    #[must_use]
    pub fn is_serialisable(&self) -> bool {
        self.as_raw_ref().is_serialisable()
    }

    /// Writes the visualisation of the feature into `writer`.
    ///
    /// This is the same output as the [`Display`](core::fmt::Display) impl.
    /// The bound strategy is invoked exactly once.
    pub fn visualise<W>(&self, writer: &mut W) -> fmt::Result
    where
        W: fmt::Write + ?Sized,
    {
        self.as_ref().visualise(writer)
    }

    /// Writes the serialised form of the payload into `writer`.
    ///
    /// # Errors
    ///
    /// - [`FeatureError::NotSerialisable`](crate::FeatureError::NotSerialisable)
    ///   if the feature was bound without a serialisation handler.
    /// - [`FeatureError::Format`](crate::FeatureError::Format) if the handler
    ///   or the writer failed.
    pub fn serialise(&self, writer: &mut dyn fmt::Write) -> crate::Result<()> {
        self.as_ref().serialise(writer)
    }

    /// Exchanges the bound payloads and strategies of two features.
    ///
    /// Only the internal pointers move; nothing is cloned or allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use featurebox::{Feature, handlers};
    ///
    /// let a: Feature<u8> = Feature::new_custom(1, handlers::Display);
    /// let b: Feature<char> = Feature::new_custom('b', handlers::Debug);
    /// let (mut a, mut b) = (a.into_dynamic(), b.into_dynamic());
    ///
    /// a.swap(&mut b);
    /// assert_eq!((a.to_string(), b.to_string()), ("'b'".to_string(), "1".to_string()));
    /// ```
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Returns a borrowed view of the feature.
    #[must_use]
    pub fn as_ref(&self) -> FeatureRef<'_, T, Th> {
        let raw = self.as_raw_ref();

        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. Guaranteed by the invariants of this type.
        // 3. Guaranteed by the invariants of this type.
        unsafe { FeatureRef::from_raw(raw) }
    }

    /// The view handed to hooks.
    pub(crate) fn as_dynamic_local(&self) -> FeatureRef<'_, Dynamic, Local> {
        self.as_ref().into_dynamic().into_local()
    }
}

impl<T: Sized + Send + Sync + 'static> Feature<T, SendSync> {
    /// Binds `value` with the [`Intrinsic`](handlers::Intrinsic) strategy as a
    /// thread-safe feature.
    ///
    /// This is the same as [`Feature::new`] with the thread-safety marker
    /// spelled out.
    #[must_use]
    pub fn new_sendsync(value: T) -> Self
    where
        T: Visualise + Clone,
    {
        Self::new(value)
    }

    /// Binds `value` and `strategy` as a thread-safe feature.
    #[must_use]
    pub fn new_sendsync_custom<S>(value: T, strategy: S) -> Self
    where
        T: Clone,
        S: VisualiseHandler<T> + Send + Sync + Clone,
    {
        Self::new_custom(value, strategy)
    }
}

impl<T: Sized + 'static> Feature<T, Local> {
    /// Binds `value` with the [`Intrinsic`](handlers::Intrinsic) strategy as a
    /// feature that stays on the current thread.
    #[must_use]
    pub fn new_local(value: T) -> Self
    where
        T: Visualise + Clone,
    {
        Self::new(value)
    }

    /// Binds `value` and `strategy` as a feature that stays on the current
    /// thread.
    #[must_use]
    pub fn new_local_custom<S>(value: T, strategy: S) -> Self
    where
        T: Clone,
        S: VisualiseHandler<T> + Clone,
    {
        Self::new_custom(value, strategy)
    }
}

impl<Th: ThreadSafetyMarker> Feature<Dynamic, Th> {
    /// Returns a reference to the payload if it is of type `T`.
    #[must_use]
    pub fn downcast_inner<T>(&self) -> Option<&T>
    where
        T: Sized + 'static,
    {
        self.as_ref().downcast_inner()
    }

    /// Returns a reference to the payload, assuming it is of type `T`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The payload is of type `T`.
    #[must_use]
    pub unsafe fn downcast_inner_unchecked<T>(&self) -> &T
    where
        T: Sized + 'static,
    {
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe { self.as_ref().downcast_inner_unchecked() }
    }

    /// Recovers the typed feature if the payload is of type `T`, or gives the
    /// feature back unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use featurebox::{Feature, handlers};
    ///
    /// let feature: Feature<f32> = Feature::new_custom(2.5, handlers::Display);
    /// let feature: Feature = feature.into_dynamic();
    ///
    /// let feature = feature.downcast_feature::<u8>().unwrap_err();
    /// let typed: Feature<f32> = feature.downcast_feature().unwrap();
    /// assert_eq!(*typed.inner(), 2.5);
    /// ```
    pub fn downcast_feature<T>(self) -> Result<Feature<T, Th>, Self>
    where
        T: Sized + 'static,
    {
        if TypeId::of::<T>() == self.inner_type_id() {
            // SAFETY:
            // 1. We just checked that the type IDs match
            let feature = unsafe { self.downcast_unchecked() };

            Ok(feature)
        } else {
            Err(self)
        }
    }

    /// Recovers the typed feature without checking the payload type.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The payload is of type `T`.
    #[must_use]
    pub unsafe fn downcast_unchecked<T>(self) -> Feature<T, Th>
    where
        T: Sized + 'static,
    {
        let raw = self.into_raw();

        // SAFETY:
        // 1. `T` is bounded by `Sized`, so this is trivially true.
        // 2. Guaranteed by the caller
        // 3. Guaranteed by the invariants of this type.
        unsafe { Feature::from_raw(raw) }
    }
}

impl<T, Th> Clone for Feature<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: ThreadSafetyMarker,
{
    fn clone(&self) -> Self {
        self.as_ref().to_owned_feature()
    }

    /// Replaces `self` with a deep copy of `source`.
    ///
    /// The copy is completed before `self` is touched, so a panic from the
    /// payload's or the strategy's `clone` leaves `self` as it was.
    fn clone_from(&mut self, source: &Self) {
        let copy = source.clone();
        *self = copy;
    }
}

impl<T, Th> fmt::Display for Feature<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: ThreadSafetyMarker,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_ref(), f)
    }
}

impl<T, Th> fmt::Debug for Feature<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: ThreadSafetyMarker,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_ref(), f)
    }
}

impl<T, Th> From<T> for Feature<T, Th>
where
    T: ObjectMarkerFor<Th> + Visualise + Clone,
    Th: ThreadSafetyMarker,
    handlers::Intrinsic: ObjectMarkerFor<Th>,
{
    fn from(value: T) -> Self {
        Feature::new(value)
    }
}

impl<T, Th> From<T> for Feature<Dynamic, Th>
where
    T: ObjectMarkerFor<Th> + Visualise + Clone,
    Th: ThreadSafetyMarker,
    handlers::Intrinsic: ObjectMarkerFor<Th>,
{
    fn from(value: T) -> Self {
        Feature::<T, Th>::new(value).into_dynamic()
    }
}

// SAFETY: The `SendSync` marker indicates that the payload and the strategy
// are `Send + Sync`. Therefore it is safe to implement `Send + Sync` for the
// feature itself.
unsafe impl<T: markers::ObjectMarker + ?Sized> Send for Feature<T, SendSync> {}

// SAFETY: The `SendSync` marker indicates that the payload and the strategy
// are `Send + Sync`. Therefore it is safe to implement `Send + Sync` for the
// feature itself.
unsafe impl<T: markers::ObjectMarker + ?Sized> Sync for Feature<T, SendSync> {}

impl<T: markers::ObjectMarker + ?Sized, Th: ThreadSafetyMarker> Unpin for Feature<T, Th> {}

macro_rules! from_impls {
    ($(
        <
            $($param:ident),*
        >:
        $payload1:ty => $payload2:ty,
        $thread_safety1:ty => $thread_safety2:ty,
        [$($op:ident),*]
    ),* $(,)?) => {
        $(
            impl<$($param: markers::ObjectMarker),*> From<Feature<$payload1, $thread_safety1>> for Feature<$payload2, $thread_safety2>
            {
                fn from(feature: Feature<$payload1, $thread_safety1>) -> Self {
                    feature
                        $(
                            .$op()
                        )*
                }
            }
        )*
    };
}

from_impls!(
    <T>: T => T, SendSync => Local, [into_local],
    <T>: T => Dynamic, SendSync => SendSync, [into_dynamic],
    <T>: T => Dynamic, SendSync => Local, [into_dynamic, into_local],
    <T>: T => Dynamic, Local => Local, [into_dynamic],
    <>:  Dynamic => Dynamic, SendSync => Local, [into_local],
);
