//! The [`Feature`] wrapper and its borrowed view [`FeatureRef`].

mod owned;
mod ref_;

pub use self::{owned::Feature, ref_::FeatureRef};
