//! Internal utility types.

/// Marker type used when type-erasing features.
///
/// This zero-sized type serves as a placeholder in generic type parameters
/// when the actual concrete type has been erased. For example,
/// `FeatureData<Erased, Erased>` represents a feature whose payload and
/// strategy types are unknown at the current scope.
///
/// Using a distinct marker type (rather than `()`) makes the intent clearer
/// in type signatures and error messages.
pub(crate) struct Erased;
