//! Marker types and traits for erasure and thread-safety semantics.
//!
//! The markers in this module are used as generic parameters in types like
//! [`Feature<T, ThreadSafety>`](crate::Feature) and
//! [`FeatureCollection<T, ThreadSafety>`](crate::FeatureCollection) to encode
//! compile-time guarantees about what is known of the payload and whether it
//! may cross thread boundaries.
//!
//! # Design Philosophy
//!
//! The constraints encoded by these markers are enforced at construction time.
//! It is impossible to construct a [`Feature`](crate::Feature) that violates
//! the invariants associated with its marker types. A `Feature<_, SendSync>`
//! truly is `Send + Sync`, since both its payload and its strategy were
//! required to be `Send + Sync` when it was bound.
//!
//! # Payload Markers
//!
//! The first type parameter of a feature is either the concrete payload type
//! or [`Dynamic`]. A typed feature gives direct access to its payload through
//! [`inner`](crate::Feature::inner); a dynamic feature has forgotten the type
//! and must be downcast first.
//!
//! # Thread Safety Markers
//!
//! - [`SendSync`]: The payload and the strategy are `Send + Sync`, so the
//!   feature can be sent to and shared with other threads.
//! - [`Local`]: The feature may contain non-thread-safe data (like `Rc`) and
//!   cannot be sent between threads.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//!
//! use featurebox::{Feature, handlers, markers};
//!
//! let shared: Feature<String, markers::SendSync> =
//!     Feature::new_custom("ready".to_string(), handlers::Display);
//! std::thread::spawn(move || {
//!     println!("{shared}");
//! });
//!
//! let local: Feature<Rc<str>, markers::Local> = Feature::new_local_custom(Rc::from("idle"), handlers::Display);
//! assert_eq!(local.to_string(), "idle");
//! ```

use core::any::Any;

/// Marker for features whose payload type has been erased.
///
/// A `Feature<Dynamic>` can hold any payload. The concrete type can be
/// recovered with [`downcast_feature`](crate::Feature::downcast_feature) or
/// [`downcast_inner`](crate::Feature::downcast_inner).
pub type Dynamic = dyn Any;

/// Marker type for thread-safe features.
///
/// Features carrying this marker were bound from a payload and a strategy
/// that are both `Send + Sync`, and are therefore `Send + Sync` themselves.
///
/// # Examples
///
/// ```
/// use featurebox::{Feature, handlers, markers::SendSync};
///
/// let feature: Feature<u32, SendSync> = Feature::new_sendsync_custom(7, handlers::Debug);
/// let handle = std::thread::spawn(move || feature.to_string());
/// assert_eq!(handle.join().unwrap(), "7");
/// ```
///
/// Payloads that are not `Send + Sync` are rejected:
///
/// ```compile_fail
/// use std::rc::Rc;
///
/// use featurebox::{Feature, handlers, markers::SendSync};
///
/// // This won't compile because Rc is not Send + Sync
/// let feature: Feature<Rc<u8>, SendSync> = Feature::new_custom(Rc::new(3), handlers::Display);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct SendSync;

/// Marker type for features that must stay on the current thread.
///
/// Any payload and strategy can be bound into a `Local` feature. A thread-safe
/// feature can always be turned into a local one with
/// [`into_local`](crate::Feature::into_local), but not the other way around.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
///
/// use featurebox::{Feature, handlers, markers::Local};
///
/// let feature: Feature<Rc<u8>, Local> = Feature::new_local_custom(Rc::new(3), handlers::Display);
/// assert_eq!(feature.to_string(), "3");
/// ```
///
/// A `Local` feature never leaves its thread, even when the payload itself is
/// thread-safe:
///
/// ```compile_fail
/// use featurebox::{Feature, handlers, markers::Local};
///
/// let feature: Feature<u8, Local> = Feature::new_local_custom(3, handlers::Display);
/// std::thread::spawn(move || feature.to_string());
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Local;

mod sealed_thread_safety_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for SendSync {}
    impl Sealed for Local {}
}

mod sealed_object_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl<T: 'static> Sealed for T {}
    impl Sealed for dyn Any {}
}

/// Trait implemented by every type that can appear as the payload parameter
/// of a feature: all `'static` sized types, plus [`Dynamic`].
///
/// This trait is sealed and cannot be implemented outside this crate.
pub trait ObjectMarker: 'static + sealed_object_marker::Sealed {}

impl<T> ObjectMarker for T where T: 'static {}
impl ObjectMarker for dyn Any {}

/// Trait implemented by the thread-safety markers [`SendSync`] and [`Local`].
///
/// This trait is sealed and cannot be implemented outside this crate.
pub trait ThreadSafetyMarker: sealed_thread_safety_marker::Sealed {}

impl ThreadSafetyMarker for SendSync {}
impl ThreadSafetyMarker for Local {}

/// Trait for values that may be stored in a feature with the thread-safety
/// marker `T`.
///
/// Every object type can be stored in a [`Local`] feature, while only
/// `Send + Sync` types can be stored in a [`SendSync`] feature. The bound
/// applies to both the payload and the strategy.
pub trait ObjectMarkerFor<T: ThreadSafetyMarker>: ObjectMarker {}

impl<O> ObjectMarkerFor<Local> for O where O: ObjectMarker {}
impl<O> ObjectMarkerFor<SendSync> for O where O: ObjectMarker + Send + Sync {}
impl ObjectMarkerFor<Local> for dyn Any {}
impl ObjectMarkerFor<SendSync> for dyn Any {}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String};

    use super::*;

    #[test]
    fn test_object_marker_for() {
        static_assertions::assert_impl_all!(String: ObjectMarkerFor<SendSync>, ObjectMarkerFor<Local>);
        static_assertions::assert_impl_all!(Rc<u8>: ObjectMarkerFor<Local>);
        static_assertions::assert_not_impl_any!(Rc<u8>: ObjectMarkerFor<SendSync>);
        static_assertions::assert_impl_all!(Dynamic: ObjectMarkerFor<SendSync>, ObjectMarkerFor<Local>);
    }

    #[test]
    fn test_markers_are_zero_sized() {
        assert_eq!(core::mem::size_of::<SendSync>(), 0);
        assert_eq!(core::mem::size_of::<Local>(), 0);
    }
}
