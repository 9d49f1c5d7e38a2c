use alloc::vec::Vec;
use core::{fmt, marker::PhantomData};

use featurebox_internals::RawFeature;

use crate::{
    Feature, FeatureRef,
    feature_collection::{FeatureCollectionIntoIter, FeatureCollectionIter},
    markers::{self, Dynamic, Local, SendSync},
};

/// A homogeneous sequence of features.
///
/// All features in a collection share the payload marker `T` (usually
/// [`Dynamic`]) and the thread-safety marker. Visualising the collection
/// visualises every element exactly once, in order, one per line.
///
/// # Examples
///
/// ```
/// use featurebox::{Feature, FeatureCollection, handlers};
///
/// let mut collection: FeatureCollection = FeatureCollection::new();
/// let a: Feature<u8> = Feature::new_custom(1, handlers::Display);
/// let b: Feature<&str> = Feature::new_custom("two", handlers::Debug);
/// collection.push(a.into_dynamic());
/// collection.push(b.into_dynamic());
///
/// assert_eq!(collection.len(), 2);
/// assert_eq!(collection.to_string(), "1\n\"two\"\n");
/// ```
#[repr(transparent)]
pub struct FeatureCollection<T = Dynamic, ThreadSafety = SendSync>
where
    T: markers::ObjectMarker + ?Sized,
    ThreadSafety: markers::ThreadSafetyMarker,
{
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. Every element upholds the invariants of
    ///    [`Feature<T, ThreadSafety>`].
    raw: Vec<RawFeature>,
    _payload: PhantomData<T>,
    _thread_safety: PhantomData<ThreadSafety>,
}

impl<T, Th> FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Every element of `raw` upholds the invariants of
    ///    [`Feature<T, Th>`].
    pub(crate) unsafe fn from_raw(raw: Vec<RawFeature>) -> Self {
        Self {
            raw,
            _payload: PhantomData,
            _thread_safety: PhantomData,
        }
    }

    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        // SAFETY:
        // 1. There are no elements
        unsafe { Self::from_raw(Vec::new()) }
    }

    /// Appends a feature to the end of the collection.
    pub fn push(&mut self, feature: Feature<T, Th>) {
        self.raw.push(feature.into_raw());
    }

    /// Removes the last feature and returns it, or `None` if the collection
    /// is empty.
    pub fn pop(&mut self) -> Option<Feature<T, Th>> {
        let raw = self.raw.pop()?;

        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. Guaranteed by the invariants of this type.
        // 3. Guaranteed by the invariants of this type.
        Some(unsafe { Feature::from_raw(raw) })
    }

    /// Returns the number of features in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns a reference to the feature at `index`, or `None` if it is out
    /// of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<FeatureRef<'_, T, Th>> {
        let raw = self.raw.get(index)?.as_ref();

        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        // 2. Guaranteed by the invariants of this type.
        // 3. Guaranteed by the invariants of this type.
        Some(unsafe { FeatureRef::from_raw(raw) })
    }

    /// Returns an iterator over borrowed features, in order.
    pub fn iter(&self) -> FeatureCollectionIter<'_, T, Th> {
        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        unsafe { FeatureCollectionIter::from_raw(&self.raw) }
    }

    /// Writes the visualisation of every feature into `writer`, in order, each
    /// followed by a newline.
    ///
    /// Each feature's strategy is invoked exactly once. The first formatting
    /// error stops the walk and is returned.
    pub fn visualise<W>(&self, writer: &mut W) -> fmt::Result
    where
        W: fmt::Write + ?Sized,
    {
        crate::feature_collection::visualise_all(self.iter(), writer)
    }

    /// Forgets the payload type of every feature in the collection.
    #[must_use]
    pub fn into_dynamic(self) -> FeatureCollection<Dynamic, Th> {
        // SAFETY:
        // 1. Every element upholds the invariants of `Feature<T, Th>`, which imply
        //    the ones of `Feature<Dynamic, Th>`.
        unsafe { FeatureCollection::from_raw(self.raw) }
    }

    /// Forgets the thread-safety guarantee of the collection.
    #[must_use]
    pub fn into_local(self) -> FeatureCollection<T, Local> {
        // SAFETY:
        // 1. Every element upholds the invariants of `Feature<T, Th>`, which imply
        //    the ones of `Feature<T, Local>`.
        unsafe { FeatureCollection::from_raw(self.raw) }
    }
}

impl<T, Th> Default for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, Th> Extend<Feature<T, Th>> for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn extend<I: IntoIterator<Item = Feature<T, Th>>>(&mut self, iter: I) {
        for feature in iter {
            self.push(feature);
        }
    }
}

impl<T, Th> Extend<Feature<T, Th>> for FeatureCollection<Dynamic, Th>
where
    T: markers::ObjectMarker,
    Th: markers::ThreadSafetyMarker,
{
    fn extend<I: IntoIterator<Item = Feature<T, Th>>>(&mut self, iter: I) {
        for feature in iter {
            self.push(feature.into_dynamic());
        }
    }
}

impl<'a, T, Th> Extend<FeatureRef<'a, T, Th>> for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn extend<I: IntoIterator<Item = FeatureRef<'a, T, Th>>>(&mut self, iter: I) {
        for feature in iter {
            self.push(feature.to_owned_feature());
        }
    }
}

impl<T, Th> FromIterator<Feature<T, Th>> for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn from_iter<I: IntoIterator<Item = Feature<T, Th>>>(iter: I) -> Self {
        let mut collection = FeatureCollection::new();
        collection.extend(iter);
        collection
    }
}

impl<T, Th> FromIterator<Feature<T, Th>> for FeatureCollection<Dynamic, Th>
where
    T: markers::ObjectMarker,
    Th: markers::ThreadSafetyMarker,
{
    fn from_iter<I: IntoIterator<Item = Feature<T, Th>>>(iter: I) -> Self {
        let mut collection = FeatureCollection::new();
        collection.extend(iter);
        collection
    }
}

impl<'a, T, Th> FromIterator<FeatureRef<'a, T, Th>> for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn from_iter<I: IntoIterator<Item = FeatureRef<'a, T, Th>>>(iter: I) -> Self {
        let mut collection = FeatureCollection::new();
        collection.extend(iter);
        collection
    }
}

impl<T, Th> fmt::Display for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.visualise(f)
    }
}

impl<T, Th> fmt::Debug for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

mod from_impls {
    use super::*;

    macro_rules! unsafe_feature_collection_to_feature_collection {
        ($(
            <
                $($param:ident),*
            >:
            $payload1:ty => $payload2:ty,
            $thread_safety1:ty => $thread_safety2:ty
        ),* $(,)?) => {
            $(
                impl<$($param),*> From<FeatureCollection<$payload1, $thread_safety1>> for FeatureCollection<$payload2, $thread_safety2>
                    where
                        $($param: markers::ObjectMarker)*
                    {
                    fn from(value: FeatureCollection<$payload1, $thread_safety1>) -> Self {
                        // SAFETY:
                        // 1. The target markers are weaker than or equal to the source ones
                        unsafe { FeatureCollection::from_raw(value.raw) }
                    }
                }
            )*
        };
    }

    unsafe_feature_collection_to_feature_collection! {
        <T>: T => T, SendSync => Local,
        <T>: T => Dynamic, SendSync => SendSync,
        <T>: T => Dynamic, SendSync => Local,
        <T>: T => Dynamic, Local => Local,
        <>: Dynamic => Dynamic, SendSync => Local,
    }
}

impl<T, Th> From<Vec<Feature<T, Th>>> for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn from(features: Vec<Feature<T, Th>>) -> Self {
        let raw = features.into_iter().map(Feature::into_raw).collect();

        // SAFETY:
        // 1. Every element came out of a `Feature<T, Th>`
        unsafe { FeatureCollection::from_raw(raw) }
    }
}

impl<const N: usize, T, Th> From<[Feature<T, Th>; N]> for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    fn from(features: [Feature<T, Th>; N]) -> Self {
        let raw = features.into_iter().map(Feature::into_raw).collect();

        // SAFETY:
        // 1. Every element came out of a `Feature<T, Th>`
        unsafe { FeatureCollection::from_raw(raw) }
    }
}

// SAFETY: The `SendSync` marker guarantees that every element is
// `Send + Sync`.
unsafe impl<T> Send for FeatureCollection<T, SendSync> where T: markers::ObjectMarker + ?Sized {}

// SAFETY: The `SendSync` marker guarantees that every element is
// `Send + Sync`.
unsafe impl<T> Sync for FeatureCollection<T, SendSync> where T: markers::ObjectMarker + ?Sized {}

impl<T, Th> IntoIterator for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    type Item = Feature<T, Th>;
    type IntoIter = FeatureCollectionIntoIter<T, Th>;

    fn into_iter(self) -> Self::IntoIter {
        // SAFETY:
        // 1. Guaranteed by the invariants of this type.
        unsafe { FeatureCollectionIntoIter::from_raw(self.raw.into_iter()) }
    }
}

impl<'a, T, Th> IntoIterator for &'a FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    type Item = FeatureRef<'a, T, Th>;
    type IntoIter = FeatureCollectionIter<'a, T, Th>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, Th> Clone for FeatureCollection<T, Th>
where
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
{
    /// Deep copies every feature. If any element's clone panics, the copies
    /// made so far are dropped and `self` is untouched.
    fn clone(&self) -> Self {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::{String, ToString};

    use super::*;
    use crate::handlers;

    #[allow(dead_code)]
    struct NonSend(*const ());
    static_assertions::assert_not_impl_any!(NonSend: Send, Sync);

    #[test]
    fn test_feature_collection_send_sync() {
        static_assertions::assert_impl_all!(FeatureCollection<(), SendSync>: Send, Sync);
        static_assertions::assert_impl_all!(FeatureCollection<String, SendSync>: Send, Sync);
        static_assertions::assert_impl_all!(FeatureCollection<NonSend, SendSync>: Send, Sync);
        static_assertions::assert_impl_all!(FeatureCollection<Dynamic, SendSync>: Send, Sync);

        static_assertions::assert_not_impl_any!(FeatureCollection<(), Local>: Send, Sync);
        static_assertions::assert_not_impl_any!(FeatureCollection<String, Local>: Send, Sync);
        static_assertions::assert_not_impl_any!(FeatureCollection<NonSend, Local>: Send, Sync);
        static_assertions::assert_not_impl_any!(FeatureCollection<Dynamic, Local>: Send, Sync);
    }

    #[test]
    fn test_feature_collection_copy_clone() {
        static_assertions::assert_impl_all!(FeatureCollection<(), SendSync>: Clone);
        static_assertions::assert_impl_all!(FeatureCollection<Dynamic, Local>: Clone);
        static_assertions::assert_not_impl_any!(FeatureCollection<(), SendSync>: Copy);
        static_assertions::assert_not_impl_any!(FeatureCollection<Dynamic, Local>: Copy);
    }

    #[test]
    fn test_push_pop_get() {
        let mut collection: FeatureCollection<u32> = FeatureCollection::new();
        assert!(collection.is_empty());
        assert!(collection.pop().is_none());

        collection.push(Feature::new_custom(1, handlers::Display));
        collection.push(Feature::new_custom(2, handlers::Debug));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(0).map(|f| *f.inner()), Some(1));
        assert!(collection.get(2).is_none());

        let last = collection.pop().unwrap();
        assert_eq!(*last.inner(), 2);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_conversions_keep_order() {
        let typed: FeatureCollection<char> = FeatureCollection::from([
            Feature::new_custom('x', handlers::Display),
            Feature::new_custom('y', handlers::Display),
        ]);
        let dynamic: FeatureCollection = typed.into_dynamic();
        let local: FeatureCollection<Dynamic, Local> = dynamic.into();

        let rendered: Vec<String> = local.iter().map(|f| f.to_string()).collect();
        assert_eq!(rendered, ["x", "y"]);

        let reversed: Vec<String> = local.iter().rev().map(|f| f.to_string()).collect();
        assert_eq!(reversed, ["y", "x"]);
        assert_eq!(local.iter().len(), 2);
    }
}
