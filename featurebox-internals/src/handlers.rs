//! Handlers that define the capabilities a feature forwards to.
//!
//! A feature stores its payload together with a *visualisation strategy*.
//! The strategy is an ordinary value, so it can carry state, and it is copied
//! along with the payload whenever the feature is cloned. Serialisation is an
//! optional second capability that is selected by type when the feature is
//! bound.

/// Trait for implementing a visualisation strategy for payloads of type `T`.
///
/// A strategy is stored inside the feature next to the payload. Every call to
/// visualise the feature is forwarded to the strategy that was bound when the
/// feature was created; it is never re-resolved afterwards.
///
/// # When to Implement
///
/// You typically don't need to implement this trait directly. The featurebox
/// library provides built-in handlers that defer to the payload's own
/// `Visualise`, `Display` or `Debug` implementations, and a wrapper for
/// closures.
///
/// Implement this trait when a strategy needs configuration of its own, for
/// instance a prefix or a level of detail chosen by the caller.
///
/// # Examples
///
/// ```
/// use featurebox_internals::handlers::VisualiseHandler;
///
/// struct Temperature(f32);
///
/// #[derive(Clone)]
/// struct Units {
///     fahrenheit: bool,
/// }
///
/// impl VisualiseHandler<Temperature> for Units {
///     fn visualise(
///         &self,
///         value: &Temperature,
///         formatter: &mut core::fmt::Formatter<'_>,
///     ) -> core::fmt::Result {
///         if self.fahrenheit {
///             write!(formatter, "{:.1}°F", value.0 * 1.8 + 32.0)
///         } else {
///             write!(formatter, "{:.1}°C", value.0)
///         }
///     }
/// }
/// ```
pub trait VisualiseHandler<T>: 'static {
    /// Renders `value` into `formatter`.
    ///
    /// Errors from the formatter should be propagated unchanged.
    fn visualise(&self, value: &T, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result;
}

/// Trait for implementing the optional serialisation capability for payloads
/// of type `T`.
///
/// Unlike [`VisualiseHandler`], a serialiser is stateless: it is chosen by
/// type when the feature is bound and is only recorded in the vtable.
///
/// No output format is implied. The implementor decides what gets written to
/// `writer`.
///
/// # Examples
///
/// ```
/// use featurebox_internals::handlers::SerialiseHandler;
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// struct Csv;
///
/// impl SerialiseHandler<Point> for Csv {
///     fn serialise(value: &Point, writer: &mut dyn core::fmt::Write) -> core::fmt::Result {
///         write!(writer, "{},{}", value.x, value.y)
///     }
/// }
/// ```
pub trait SerialiseHandler<T>: 'static {
    /// Writes a serialised form of `value` into `writer`.
    fn serialise(value: &T, writer: &mut dyn core::fmt::Write) -> core::fmt::Result;
}
