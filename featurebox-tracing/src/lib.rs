#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Structured logging of featurebox features with `tracing`.
//!
//! The featurebox crates never log on their own. This crate connects them to
//! whatever `tracing` subscriber your application uses.
//!
//! # How It Works
//!
//! - [`TracingHook`] is a feature hook that emits an event every time a
//!   feature is bound or cloned.
//! - [`Traced`] wraps a strategy so that every visualisation runs inside a
//!   `visualise` span.
//! - [`visualise_all_traced`] visualises a sequence and emits one event per
//!   element.
//!
//! All events and spans use the target `featurebox`, so they can be filtered
//! independently from the rest of your application.
//!
//! # Quick Start
//!
//! ```
//! use featurebox::{Feature, handlers};
//! use featurebox_tracing::Traced;
//!
//! // 1. Register the hook once, early in main
//! featurebox_tracing::install();
//!
//! // 2. Bind features as usual - this one also visualises inside a span
//! let feature: Feature<u8> = Feature::new_custom(7, Traced::new(handlers::Display));
//! assert_eq!(feature.to_string(), "7");
//! ```
//!
//! # Environment Variables
//!
//! - `FEATUREBOX_TRACING` - Comma-separated options:
//!   - `no-clones` - Do not emit events when features are cloned

use std::{fmt, sync::OnceLock};

use featurebox::{
    FeatureRef,
    handlers::VisualiseHandler,
    hooks::{self, FeatureHook},
    markers::{self, Dynamic, Local},
};

/// The target of every event and span emitted by this crate.
pub const TARGET: &str = "featurebox";

/// Feature hook that emits a `tracing` event for every bound and cloned
/// feature.
///
/// Bind events are emitted at `DEBUG` level and clone events at `TRACE`
/// level. Both carry the fields `type_name`, `strategy` and `serialisable`.
///
/// # Examples
///
/// ```
/// use featurebox::hooks;
/// use featurebox_tracing::TracingHook;
///
/// hooks::register_feature_hook(TracingHook {
///     log_clones: false,
/// });
/// ```
#[derive(Copy, Clone, Debug)]
pub struct TracingHook {
    /// Whether clone events are emitted
    pub log_clones: bool,
}

#[derive(Debug)]
struct FeatureboxTracingEnvOptions {
    no_clones: bool,
}

impl FeatureboxTracingEnvOptions {
    fn get() -> &'static Self {
        static FEATUREBOX_TRACING_FLAGS: OnceLock<FeatureboxTracingEnvOptions> = OnceLock::new();

        FEATUREBOX_TRACING_FLAGS.get_or_init(|| {
            let mut no_clones = false;

            if let Some(var) = std::env::var_os("FEATUREBOX_TRACING") {
                for v in var.to_string_lossy().split(',') {
                    if v.trim().eq_ignore_ascii_case("no-clones") {
                        no_clones = true;
                    }
                }
            }

            FeatureboxTracingEnvOptions { no_clones }
        })
    }
}

impl TracingHook {
    /// Creates a hook configured from the `FEATUREBOX_TRACING` environment
    /// variable.
    #[must_use]
    pub fn new() -> Self {
        let env_options = FeatureboxTracingEnvOptions::get();

        Self {
            log_clones: !env_options.no_clones,
        }
    }
}

impl Default for TracingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureHook for TracingHook {
    fn on_bind(&self, feature: FeatureRef<'_, Dynamic, Local>) {
        tracing::debug!(
            target: TARGET,
            type_name = feature.inner_type_name(),
            strategy = feature.strategy_type_name(),
            serialisable = feature.is_serialisable(),
            "feature bound"
        );
    }

    fn on_clone(
        &self,
        original: FeatureRef<'_, Dynamic, Local>,
        _copy: FeatureRef<'_, Dynamic, Local>,
    ) {
        if self.log_clones {
            tracing::trace!(
                target: TARGET,
                type_name = original.inner_type_name(),
                strategy = original.strategy_type_name(),
                serialisable = original.is_serialisable(),
                "feature cloned"
            );
        }
    }
}

/// Registers a [`TracingHook`] configured from the environment.
///
/// Hooks are global and registering appends, so call this once.
pub fn install() {
    hooks::register_feature_hook(TracingHook::new());
}

/// Strategy wrapper that runs the inner strategy inside a `visualise` span.
///
/// The span is created at `TRACE` level with the field `type_name`. If the
/// inner strategy fails, a `WARN` event is emitted inside the span before the
/// error is returned.
///
/// # Examples
///
/// ```
/// use featurebox::{Feature, handlers};
/// use featurebox_tracing::Traced;
///
/// let feature: Feature<&str> = Feature::new_custom("ok", Traced::new(handlers::Debug));
/// assert_eq!(feature.to_string(), "\"ok\"");
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct Traced<S>(S);

impl<S> Traced<S> {
    /// Wraps `strategy`.
    #[must_use]
    pub const fn new(strategy: S) -> Self {
        Self(strategy)
    }

    /// Returns a reference to the wrapped strategy.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.0
    }
}

impl<T, S> VisualiseHandler<T> for Traced<S>
where
    S: VisualiseHandler<T>,
{
    fn visualise(&self, value: &T, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = tracing::trace_span!(
            target: TARGET,
            "visualise",
            type_name = core::any::type_name::<T>()
        );
        let _guard = span.enter();

        let result = self.0.visualise(value, formatter);
        if result.is_err() {
            tracing::warn!(target: TARGET, "strategy failed to visualise feature");
        }
        result
    }
}

/// Like [`featurebox::visualise_all`], but emits a `DEBUG` event with the
/// fields `index` and `type_name` before each element is visualised.
///
/// On the first formatting error an `ERROR` event with the failing `index`
/// is emitted and the error is returned.
///
/// # Examples
///
/// ```
/// use featurebox::{Feature, handlers};
///
/// let a: Feature<u8> = Feature::new_custom(1, handlers::Display);
/// let b: Feature<u8> = Feature::new_custom(2, handlers::Display);
///
/// let mut out = String::new();
/// featurebox_tracing::visualise_all_traced(&[a, b], &mut out)?;
/// assert_eq!(out, "1\n2\n");
/// # Ok::<(), std::fmt::Error>(())
/// ```
pub fn visualise_all_traced<'a, I, T, Th, W>(features: I, writer: &mut W) -> fmt::Result
where
    I: IntoIterator,
    I::Item: Into<FeatureRef<'a, T, Th>>,
    T: markers::ObjectMarker + ?Sized,
    Th: markers::ThreadSafetyMarker,
    W: fmt::Write + ?Sized,
{
    for (index, feature) in features.into_iter().enumerate() {
        let feature: FeatureRef<'a, T, Th> = feature.into();
        tracing::debug!(
            target: TARGET,
            index,
            type_name = feature.inner_type_name(),
            "visualising feature"
        );

        let result = featurebox::visualise_all([feature], writer);
        if let Err(error) = result {
            tracing::error!(target: TARGET, index, "failed to visualise feature");
            return Err(error);
        }
    }
    Ok(())
}
