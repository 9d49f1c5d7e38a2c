#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Type-erased value wrappers with strategies bound at construction.
//!
//! ## Overview
//!
//! A [`Feature`] owns one value of any type together with the *strategy* that
//! knows how to visualise it. Once the feature is bound, callers only see the
//! feature: they can render it, copy it, move it, put it in a sequence next to
//! features of completely different types, and every call is forwarded to the
//! strategy chosen at construction.
//!
//! ```
//! use core::fmt;
//!
//! use featurebox::{Feature, FeatureCollection, Visualise, handlers};
//!
//! #[derive(Clone)]
//! struct Sensor {
//!     name: &'static str,
//!     celsius: f32,
//! }
//!
//! impl Visualise for Sensor {
//!     fn visualise(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(formatter, "{}: {:.1}°C", self.name, self.celsius)
//!     }
//! }
//!
//! let sensor: Feature<Sensor> = Feature::new(Sensor { name: "boiler", celsius: 71.0 });
//! let count: Feature<u32> = Feature::new_custom(3, handlers::Display);
//!
//! let features: FeatureCollection = [sensor.into_dynamic(), count.into_dynamic()].into();
//! assert_eq!(features.to_string(), "boiler: 71.0°C\n3\n");
//! ```
//!
//! ## Binding a strategy
//!
//! There are three ways to decide how a payload is visualised:
//!
//! - Implement [`Visualise`] on the payload and bind it with
//!   [`Feature::new`]. The [`Intrinsic`](handlers::Intrinsic) handler is used.
//! - Pass a handler value to [`Feature::new_custom`]. Handlers implement
//!   [`VisualiseHandler`](handlers::VisualiseHandler) and may carry state.
//!   The built-in [`handlers::Display`] and [`handlers::Debug`] reuse the
//!   standard formatting traits.
//! - Pass a closure to [`Feature::with_strategy`].
//!
//! An explicit strategy always wins over the payload's own [`Visualise`]
//! implementation. The strategy never changes after binding, and it is cloned
//! along with the payload.
//!
//! A feature can also carry a serialisation capability. Bind it with
//! [`Feature::new_serialisable`] or [`Feature::new_serialisable_custom`] and
//! call [`Feature::serialise`]. Features bound without one report
//! [`FeatureError::NotSerialisable`].
//!
//! ## Copying and moving
//!
//! [`Clone`] makes a deep copy of the payload and the strategy. `clone_from`
//! builds the complete copy before replacing the target, so a panic from
//! either `clone` leaves the target untouched. Moving a feature, or exchanging
//! two with [`Feature::swap`], only moves a pointer.
//!
//! ## Type parameters
//!
//! `Feature<T, ThreadSafety>` carries two markers:
//!
//! - `T` is the payload type, or [`Dynamic`](markers::Dynamic) once erased
//!   with [`Feature::into_dynamic`].
//! - `ThreadSafety` is [`SendSync`](markers::SendSync) (the default) or
//!   [`Local`](markers::Local). See [`markers`] for details.
//!
//! ## Architecture
//!
//! The erased storage lives in the `featurebox-internals` crate: a single heap
//! allocation holding a static vtable, the payload and the strategy. This crate
//! wraps it in typed handles whose markers guarantee that the unsafe accessors
//! underneath are only ever used with the right types.
//!
//! ## Features
//!
//! - `std` (default): the hook registry uses `std::sync::RwLock`. Without it
//!   the crate is `no_std` and uses a spin lock.

extern crate alloc;

#[cfg(all(feature = "std", not(doc)))]
extern crate std;

mod capability;
mod error;
mod feature;
pub mod feature_collection;
pub mod handlers;
pub mod hooks;
pub mod markers;
pub mod prelude;

pub use self::{
    capability::{Serialise, Visualise},
    error::{FeatureError, Result},
    feature::{Feature, FeatureRef},
    feature_collection::{FeatureCollection, visualise_all},
};
