//! Commonly used items for convenient importing.
//!
//! # Usage
//!
//! ```rust
//! use featurebox::prelude::*;
//!
//! let feature: Feature<i64> = Feature::new_custom(-3, handlers::Display);
//! let features: FeatureCollection = [feature.into_dynamic()].into();
//! assert_eq!(features.to_string(), "-3\n");
//! ```
//!
//! # What's Included
//!
//! - **[`Feature`]** and **[`FeatureCollection`]**: The owned wrapper types
//! - **[`Visualise`]** and **[`Serialise`]**: Capabilities a payload can
//!   implement itself
//! - **[`handlers`]**: Built-in strategies
//! - **[`markers`]**: Type markers for erasure and thread safety

pub use crate::{Feature, FeatureCollection, Serialise, Visualise, handlers, markers};
