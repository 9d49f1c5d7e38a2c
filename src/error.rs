use core::fmt;

/// Errors reported by operations on a [`Feature`](crate::Feature).
///
/// Capability mismatches are caught at compile time through trait bounds, so
/// the only runtime failures are asking for a capability that was not bound
/// and formatting errors raised by a handler.
///
/// # Examples
///
/// ```
/// use featurebox::{Feature, FeatureError, handlers};
///
/// let feature: Feature<u8> = Feature::new_custom(1, handlers::Display);
/// let mut out = String::new();
/// assert!(matches!(
///     feature.serialise(&mut out),
///     Err(FeatureError::NotSerialisable { .. })
/// ));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FeatureError {
    /// The feature was bound without a serialisation handler.
    #[error("feature holding `{type_name}` was bound without a serialiser")]
    NotSerialisable {
        /// Name of the payload type of the feature
        type_name: &'static str,
    },
    /// The handler or the writer reported a formatting error.
    #[error("failed to format feature")]
    Format(#[from] fmt::Error),
}

/// A [`Result`](core::result::Result) type alias where the error defaults to
/// [`FeatureError`].
pub type Result<T, E = FeatureError> = core::result::Result<T, E>;
