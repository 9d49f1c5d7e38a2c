//! Sequences of features and how they are visualised.
//!
//! [`FeatureCollection`] is an owned, homogeneous sequence of features.
//! [`visualise_all`] visualises any sequence of borrowed features, such as a
//! slice of [`Feature`](crate::Feature)s or a collection's iterator.

mod iter;
mod owned;

use core::fmt;

pub use self::{
    iter::{FeatureCollectionIntoIter, FeatureCollectionIter},
    owned::FeatureCollection,
};
use crate::{FeatureRef, markers};

/// Writes the visualisation of every feature in `features` into `writer`.
///
/// Features are visited in iteration order and each one is visualised exactly
/// once, followed by a newline. The first formatting error stops the walk and
/// is returned.
///
/// Anything that yields `&Feature` or [`FeatureRef`] is accepted.
///
/// # Examples
///
/// ```
/// use featurebox::{Feature, handlers, visualise_all};
///
/// let a: Feature<u8> = Feature::new_custom(4, handlers::Display);
/// let b: Feature<u8> = Feature::new_custom(2, handlers::Debug);
/// let features = [a, b];
///
/// let mut out = String::new();
/// visualise_all(&features, &mut out)?;
/// assert_eq!(out, "4\n2\n");
/// # Ok::<(), core::fmt::Error>(())
/// ```
pub fn visualise_all<'a, I, T, Th, W>(features: I, writer: &mut W) -> fmt::Result
where
    I: IntoIterator,
    I::Item: Into<FeatureRef<'a, T, Th>>,
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
    W: fmt::Write + ?Sized,
{
    for feature in features {
        let feature: FeatureRef<'a, T, Th> = feature.into();
        feature.visualise(writer)?;
        writer.write_char('\n')?;
    }
    Ok(())
}
