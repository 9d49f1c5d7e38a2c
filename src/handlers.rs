//! Handlers that control how a feature's payload is visualised and serialised.
//!
//! A handler is the strategy a [`Feature`](crate::Feature) forwards to. It is
//! bound once, when the feature is created, and stays bound for the lifetime
//! of the feature and of every copy made from it.
//!
//! # What Are Handlers?
//!
//! Handlers are types that implement [`VisualiseHandler`] and/or
//! [`SerialiseHandler`]. A visualisation handler is a value: it is stored next
//! to the payload, it may carry state, and it is cloned together with the
//! payload. A serialisation handler is only a type and is recorded when the
//! feature is bound.
//!
//! # Built-in Handlers
//!
//! ## [`Intrinsic`]
//!
//! Defers to the payload's own [`Visualise`] and [`Serialise`]
//! implementations. This is the handler used by
//! [`Feature::new`](crate::Feature::new) and
//! [`Feature::new_serialisable`](crate::Feature::new_serialisable).
//!
//! ## [`Display`]
//!
//! For types implementing [`Display`](core::fmt::Display).
//!
//! ## [`struct@Debug`]
//!
//! For types implementing [`Debug`](core::fmt::Debug).
//!
//! ## [`FnVisualiser`]
//!
//! Wraps a closure. This is what
//! [`Feature::with_strategy`](crate::Feature::with_strategy) binds.
//!
//! # Examples
//!
//! ```rust
//! use featurebox::{Feature, handlers};
//!
//! let shown: Feature<f64> = Feature::new_custom(1.5, handlers::Display);
//! let debugged: Feature<Vec<u8>> = Feature::new_custom(vec![1, 2], handlers::Debug);
//!
//! assert_eq!(shown.to_string(), "1.5");
//! assert_eq!(debugged.to_string(), "[1, 2]");
//! ```

use core::fmt;

pub use featurebox_internals::handlers::{SerialiseHandler, VisualiseHandler};

use crate::capability::{Serialise, Visualise};

/// Handler that uses the payload's own [`Visualise`] and [`Serialise`]
/// implementations.
///
/// # Examples
///
/// ```
/// use core::fmt;
///
/// use featurebox::{Feature, Visualise, handlers};
///
/// #[derive(Clone)]
/// struct Led(bool);
///
/// impl Visualise for Led {
///     fn visualise(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
///         formatter.write_str(if self.0 { "on" } else { "off" })
///     }
/// }
///
/// let feature: Feature<Led> = Feature::new_custom(Led(true), handlers::Intrinsic);
/// assert_eq!(feature.to_string(), "on");
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct Intrinsic;

impl<T> VisualiseHandler<T> for Intrinsic
where
    T: Visualise,
{
    #[inline]
    fn visualise(&self, value: &T, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        value.visualise(formatter)
    }
}

impl<T> SerialiseHandler<T> for Intrinsic
where
    T: Serialise,
{
    #[inline]
    fn serialise(value: &T, writer: &mut dyn fmt::Write) -> fmt::Result {
        value.serialise(writer)
    }
}

/// Handler for types implementing [`Display`](core::fmt::Display).
#[derive(Copy, Clone, Debug, Default)]
pub struct Display;

impl<T> VisualiseHandler<T> for Display
where
    T: fmt::Display,
{
    #[inline]
    fn visualise(&self, value: &T, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(value, formatter)
    }
}

/// Handler for types implementing [`Debug`](core::fmt::Debug).
///
/// Respects the alternate flag of the formatter, so `{:#}` on the feature
/// pretty-prints the payload.
#[derive(Copy, Clone, Debug, Default)]
pub struct Debug;

impl<T> VisualiseHandler<T> for Debug
where
    T: fmt::Debug,
{
    #[inline]
    fn visualise(&self, value: &T, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(value, formatter)
    }
}

/// Handler wrapping a closure of the shape
/// `Fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result`.
///
/// The closure is cloned along with the payload, so any state it captures is
/// copied as well.
///
/// # Examples
///
/// ```
/// use featurebox::{Feature, handlers::FnVisualiser};
///
/// let unit = "ms";
/// let feature: Feature<u64> =
///     Feature::new_custom(250, FnVisualiser::new(move |v: &u64, f: &mut core::fmt::Formatter<'_>| {
///         write!(f, "{v}{unit}")
///     }));
/// assert_eq!(feature.to_string(), "250ms");
/// ```
#[derive(Copy, Clone)]
pub struct FnVisualiser<F>(F);

impl<F> FnVisualiser<F> {
    /// Wraps `function` as a visualisation handler.
    #[must_use]
    pub const fn new(function: F) -> Self {
        Self(function)
    }

    /// Returns the wrapped closure.
    #[must_use]
    pub fn into_inner(self) -> F {
        self.0
    }
}

impl<F> fmt::Debug for FnVisualiser<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnVisualiser")
            .field(&core::any::type_name::<F>())
            .finish()
    }
}

impl<T, F> VisualiseHandler<T> for FnVisualiser<F>
where
    F: Fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result + 'static,
{
    #[inline]
    fn visualise(&self, value: &T, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(value, formatter)
    }
}
