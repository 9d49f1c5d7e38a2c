//! Capabilities a payload can offer on its own.
//!
//! A type implementing [`Visualise`] can be bound into a
//! [`Feature`](crate::Feature) with [`Feature::new`](crate::Feature::new),
//! without naming a strategy. Types that also implement [`Serialise`] can be
//! bound with [`Feature::new_serialisable`](crate::Feature::new_serialisable).
//!
//! Both capabilities are dispatched through the
//! [`Intrinsic`](crate::handlers::Intrinsic) handler, which is chosen when the
//! feature is created and never re-resolved afterwards.

use core::fmt;

/// A type that knows how to render itself for humans.
///
/// # Examples
///
/// ```
/// use core::fmt;
///
/// use featurebox::{Feature, Visualise};
///
/// #[derive(Clone)]
/// struct Gauge {
///     level: u8,
/// }
///
/// impl Visualise for Gauge {
///     fn visualise(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(formatter, "gauge at {}%", self.level)
///     }
/// }
///
/// let feature: Feature<Gauge> = Feature::new(Gauge { level: 40 });
/// assert_eq!(feature.to_string(), "gauge at 40%");
/// ```
///
/// Binding a payload without a strategy requires this trait, so a missing
/// implementation is rejected at compile time:
///
/// ```compile_fail
/// use featurebox::Feature;
///
/// #[derive(Clone)]
/// struct Opaque;
///
/// // `Opaque` does not implement `Visualise`
/// let feature: Feature<Opaque> = Feature::new(Opaque);
/// ```
pub trait Visualise {
    /// Renders `self` into `formatter`.
    fn visualise(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// A type that knows how to write a serialised form of itself.
///
/// The output format is entirely up to the implementor.
///
/// # Examples
///
/// ```
/// use core::fmt;
///
/// use featurebox::{Feature, Serialise, Visualise};
///
/// #[derive(Clone)]
/// struct Channel(u16);
///
/// impl Visualise for Channel {
///     fn visualise(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(formatter, "channel #{}", self.0)
///     }
/// }
///
/// impl Serialise for Channel {
///     fn serialise(&self, writer: &mut dyn fmt::Write) -> fmt::Result {
///         write!(writer, "{}", self.0)
///     }
/// }
///
/// let feature: Feature<Channel> = Feature::new_serialisable(Channel(12));
/// let mut out = String::new();
/// feature.serialise(&mut out)?;
/// assert_eq!(out, "12");
/// # Ok::<(), featurebox::FeatureError>(())
/// ```
pub trait Serialise {
    /// Writes a serialised form of `self` into `writer`.
    fn serialise(&self, writer: &mut dyn fmt::Write) -> fmt::Result;
}

impl<T: Visualise + ?Sized> Visualise for &T {
    fn visualise(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).visualise(formatter)
    }
}

impl<T: Serialise + ?Sized> Serialise for &T {
    fn serialise(&self, writer: &mut dyn fmt::Write) -> fmt::Result {
        (**self).serialise(writer)
    }
}
