use core::iter::FusedIterator;

use crate::{Feature, FeatureRef, markers};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `raw` field
/// an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use featurebox_internals::RawFeature;

    use crate::markers::{self, Dynamic, SendSync};

    /// Iterator over borrowed features in a
    /// [`FeatureCollection`](crate::FeatureCollection).
    ///
    /// Created by [`FeatureCollection::iter`](crate::FeatureCollection::iter).
    #[must_use]
    pub struct FeatureCollectionIter<
        'a,
        T: markers::ObjectMarker + ?Sized = Dynamic,
        ThreadSafety: markers::ThreadSafetyMarker = SendSync,
    > {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. Every remaining feature upholds the invariants of
        ///    [`FeatureRef<'a, T, ThreadSafety>`](crate::FeatureRef).
        raw: core::slice::Iter<'a, RawFeature>,
        _payload: PhantomData<T>,
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<'a, T, Th> FeatureCollectionIter<'a, T, Th>
    where
        T: markers::ObjectMarker + ?Sized,
        Th: markers::ThreadSafetyMarker,
    {
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. Every feature in `raw` upholds the invariants of
        ///    [`FeatureRef<'a, T, Th>`](crate::FeatureRef).
        pub(crate) unsafe fn from_raw(raw: &'a [RawFeature]) -> Self {
            // SAFETY: We must uphold the safety invariants of this type:
            // 1. Guaranteed by the caller
            Self {
                raw: raw.iter(),
                _payload: PhantomData,
                _thread_safety: PhantomData,
            }
        }

        pub(crate) fn as_raw(&self) -> &core::slice::Iter<'a, RawFeature> {
            &self.raw
        }

        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. The iterator is only advanced, never pointed at other features.
        pub(crate) unsafe fn as_raw_mut(&mut self) -> &mut core::slice::Iter<'a, RawFeature> {
            // SAFETY: We must uphold the safety invariants of this type:
            // 1. Guaranteed by the caller
            &mut self.raw
        }
    }

    /// Owning iterator over the features of a
    /// [`FeatureCollection`](crate::FeatureCollection).
    ///
    /// Created by the [`IntoIterator`] impl of the collection.
    #[must_use]
    pub struct FeatureCollectionIntoIter<
        T: markers::ObjectMarker + ?Sized = Dynamic,
        ThreadSafety: markers::ThreadSafetyMarker = SendSync,
    > {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. Every remaining feature upholds the invariants of
        ///    [`Feature<T, ThreadSafety>`](crate::Feature).
        raw: alloc::vec::IntoIter<RawFeature>,
        _payload: PhantomData<T>,
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<T, Th> FeatureCollectionIntoIter<T, Th>
    where
        T: markers::ObjectMarker + ?Sized,
        Th: markers::ThreadSafetyMarker,
    {
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. Every feature in `raw` upholds the invariants of
        ///    [`Feature<T, Th>`](crate::Feature).
        pub(crate) unsafe fn from_raw(raw: alloc::vec::IntoIter<RawFeature>) -> Self {
            // SAFETY: We must uphold the safety invariants of this type:
            // 1. Guaranteed by the caller
            Self {
                raw,
                _payload: PhantomData,
                _thread_safety: PhantomData,
            }
        }

        pub(crate) fn as_raw(&self) -> &alloc::vec::IntoIter<RawFeature> {
            &self.raw
        }

        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. Features are only taken out of the iterator, never put in.
        pub(crate) unsafe fn as_raw_mut(&mut self) -> &mut alloc::vec::IntoIter<RawFeature> {
            // SAFETY: We must uphold the safety invariants of this type:
            // 1. Guaranteed by the caller
            &mut self.raw
        }
    }
}
pub use limit_field_access::{FeatureCollectionIntoIter, FeatureCollectionIter};

impl<'a, T, Th> Iterator for FeatureCollectionIter<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    type Item = FeatureRef<'a, T, Th>;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY:
        // 1. We only advance the iterator
        let raw = unsafe { self.as_raw_mut() };

        let item = raw.next()?.as_ref();

        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. Guaranteed by the invariants of this type.
        // 3. Guaranteed by the invariants of this type.
        let feature = unsafe { FeatureRef::<T, Th>::from_raw(item) };

        Some(feature)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.as_raw().size_hint()
    }
}

impl<'a, T, Th> DoubleEndedIterator for FeatureCollectionIter<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        // SAFETY:
        // 1. We only advance the iterator
        let raw = unsafe { self.as_raw_mut() };

        let item = raw.next_back()?.as_ref();

        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. Guaranteed by the invariants of this type.
        // 3. Guaranteed by the invariants of this type.
        let feature = unsafe { FeatureRef::<T, Th>::from_raw(item) };

        Some(feature)
    }
}

impl<'a, T, Th> ExactSizeIterator for FeatureCollectionIter<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn len(&self) -> usize {
        self.as_raw().len()
    }
}

impl<'a, T, Th> FusedIterator for FeatureCollectionIter<'a, T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
}

impl<T, Th> Iterator for FeatureCollectionIntoIter<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    type Item = Feature<T, Th>;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY:
        // 1. We only take features out of the iterator
        let raw = unsafe { self.as_raw_mut() };

        let item = raw.next()?;

        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. Guaranteed by the invariants of this type.
        // 3. Guaranteed by the invariants of this type.
        let feature = unsafe { Feature::<T, Th>::from_raw(item) };

        Some(feature)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.as_raw().size_hint()
    }
}

impl<T, Th> DoubleEndedIterator for FeatureCollectionIntoIter<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        // SAFETY:
        // 1. We only take features out of the iterator
        let raw = unsafe { self.as_raw_mut() };

        let item = raw.next_back()?;

        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. Guaranteed by the invariants of this type.
        // 3. Guaranteed by the invariants of this type.
        let feature = unsafe { Feature::<T, Th>::from_raw(item) };

        Some(feature)
    }
}

impl<T, Th> ExactSizeIterator for FeatureCollectionIntoIter<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn len(&self) -> usize {
        self.as_raw().len()
    }
}

impl<T, Th> FusedIterator for FeatureCollectionIntoIter<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
}

// SAFETY: The `SendSync` marker guarantees the remaining features are
// `Send + Sync`.
unsafe impl<T: markers::ObjectMarker + ?Sized> Send
    for FeatureCollectionIntoIter<T, markers::SendSync>
{
}

// SAFETY: The `SendSync` marker guarantees the remaining features are
// `Send + Sync`.
unsafe impl<T: markers::ObjectMarker + ?Sized> Sync
    for FeatureCollectionIntoIter<T, markers::SendSync>
{
}
