#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`featurebox`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased storage and the unsafe
//! operations that power the [`featurebox`] value wrapper. A feature is a
//! heap-allocated pair of a payload and a visualisation strategy, reachable
//! only through a pointer whose concrete types have been forgotten. All
//! operations on it are dispatched through a `&'static` vtable that was
//! monomorphised for the payload and strategy types when the feature was
//! bound.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`featurebox`] crate,
//! not this one.
//!
//! # Architecture
//!
//! - **[`feature`]**: Type-erased feature storage
//!   - [`RawFeature`]: Owned feature with [`Box`]-based allocation
//!   - [`RawFeatureRef`]: Borrowed reference to a feature
//!   - [`FeatureData`]: `#[repr(C)]` wrapper enabling field access on erased
//!     types
//!   - [`FeatureVtable`]: Function pointers for type-erased dispatch
//!
//! - **[`handlers`]**: Trait definitions for the capabilities a feature
//!   forwards to
//!   - [`VisualiseHandler`]: A stored strategy that visualises the payload
//!   - [`SerialiseHandler`]: An optional serialisation capability
//!
//! # Safety Strategy
//!
//! When we erase `FeatureData<T, S>` to `FeatureData<Erased, Erased>`, the
//! vtable function pointers must still match the concrete types stored in
//! memory. This crate keeps that true through:
//!
//! - **Module-based encapsulation**: The fields of [`FeatureData`] and the
//!   pointer inside [`RawFeature`] are module-private, so every place that
//!   could break the pairing is in a single file
//! - **`#[repr(C)]` layout**: The vtable is the first field, and the payload
//!   offset depends only on the payload type, so both can be projected from
//!   an erased pointer without constructing an invalid reference
//! - **Documented vtable contracts**: Each vtable method states exactly when
//!   it can be called
//!
//! [`featurebox`]: https://docs.rs/featurebox/latest/featurebox/
//! [`FeatureData`]: feature::data::FeatureData
//! [`FeatureVtable`]: feature::vtable::FeatureVtable
//! [`VisualiseHandler`]: handlers::VisualiseHandler
//! [`SerialiseHandler`]: handlers::SerialiseHandler
//! [`Box`]: alloc::boxed::Box

extern crate alloc;

mod feature;
pub mod handlers;
mod util;

pub use feature::{RawFeature, RawFeatureRef};
