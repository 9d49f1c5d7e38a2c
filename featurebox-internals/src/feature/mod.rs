//! Module containing the main feature data structure

mod data;
mod raw;
mod vtable;

pub use self::raw::{RawFeature, RawFeatureRef};
