//! Hooks for observing feature lifecycle events.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use featurebox::{Feature, FeatureRef, handlers, hooks, markers::{Dynamic, Local}};
//!
//! static BOUND: AtomicUsize = AtomicUsize::new(0);
//!
//! hooks::register_feature_hook(|_feature: FeatureRef<'_, Dynamic, Local>| {
//!     BOUND.fetch_add(1, Ordering::Relaxed);
//! });
//!
//! let _feature: Feature<u8> = Feature::new_custom(1, handlers::Display);
//! assert!(BOUND.load(Ordering::Relaxed) >= 1);
//! ```
//!
//! # When to Use Hooks
//!
//! Hooks are global observers. Use them to integrate features with logging or
//! diagnostics, for instance the `featurebox-tracing` crate registers a hook
//! that emits a `tracing` event for every bound and cloned feature.
//!
//! Hooks only receive shared references. They cannot change the strategy a
//! feature was bound with, so visualisation is always decided at construction.
//!
//! # Hook Types
//!
//! - **[`register_feature_hook`]**: Runs for every feature, whatever its
//!   payload type.
//! - **[`register_feature_hook_for`]**: Runs only for features holding a
//!   specific payload type, and receives a typed [`FeatureRef`].
//!
//! Registering a hook appends it. Hooks run in registration order, global
//! hooks before typed ones. The registry is not locked while a hook runs, so
//! a hook may bind or clone features and register further hooks. Hooks
//! registered while a bind is in progress only see later binds.

mod hook_lock;

use alloc::vec::Vec;
use core::{any::TypeId, marker::PhantomData};

use hashbrown::HashMap;
use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{
    FeatureRef,
    hooks::hook_lock::HookLock,
    markers::{Dynamic, Local, ObjectMarker},
};

/// Trait for observing features holding payloads of type `T`.
///
/// With the default `T = Dynamic`, the hook receives erased references and
/// can be registered globally with [`register_feature_hook`]. With a concrete
/// `T`, it is registered with [`register_feature_hook_for`] and receives typed
/// references.
///
/// Closures taking a single `FeatureRef<'_, T, Local>` implement this trait
/// with [`on_bind`](FeatureHook::on_bind) as the closure body.
///
/// # Examples
///
/// ```
/// use featurebox::{
///     FeatureRef,
///     hooks::{self, FeatureHook},
///     markers::Local,
/// };
///
/// struct CountLargeBuffers;
///
/// impl FeatureHook<Vec<u8>> for CountLargeBuffers {
///     fn on_bind(&self, feature: FeatureRef<'_, Vec<u8>, Local>) {
///         if feature.inner().len() > 1024 {
///             eprintln!("large buffer bound: {} bytes", feature.inner().len());
///         }
///     }
/// }
///
/// hooks::register_feature_hook_for::<Vec<u8>, _>(CountLargeBuffers);
/// ```
pub trait FeatureHook<T: ObjectMarker + ?Sized = Dynamic>: 'static + Send + Sync {
    /// Called after a feature holding a `T` has been bound.
    fn on_bind(&self, feature: FeatureRef<'_, T, Local>);

    /// Called after `copy` has been cloned from `original`.
    fn on_clone(&self, original: FeatureRef<'_, T, Local>, copy: FeatureRef<'_, T, Local>) {
        let _ = (original, copy);
    }
}

impl<T, F> FeatureHook<T> for F
where
    T: ObjectMarker + ?Sized,
    F: Fn(FeatureRef<'_, T, Local>) + 'static + Send + Sync,
{
    fn on_bind(&self, feature: FeatureRef<'_, T, Local>) {
        self(feature)
    }
}

/// A [`FeatureHook`] with its payload type erased.
trait UntypedFeatureHook: 'static + Send + Sync {
    /// # Safety
    ///
    /// The payload of `feature` must have the type the hook was registered
    /// for, or the hook must have been registered for [`Dynamic`].
    unsafe fn on_bind(&self, feature: FeatureRef<'_, Dynamic, Local>);

    /// # Safety
    ///
    /// Same requirements as [`UntypedFeatureHook::on_bind`], for both
    /// features.
    unsafe fn on_clone(
        &self,
        original: FeatureRef<'_, Dynamic, Local>,
        copy: FeatureRef<'_, Dynamic, Local>,
    );
}

struct Hook<T, H>
where
    T: ObjectMarker + ?Sized,
{
    hook: H,
    _hooked_type: PhantomData<fn(&T)>,
}

impl<T, H> UntypedFeatureHook for Hook<T, H>
where
    T: ObjectMarker + ?Sized,
    H: FeatureHook<T>,
{
    unsafe fn on_bind(&self, feature: FeatureRef<'_, Dynamic, Local>) {
        // SAFETY:
        // 1. Guaranteed by the caller
        let feature = unsafe { feature.downcast_feature_unchecked::<T>() };
        self.hook.on_bind(feature);
    }

    unsafe fn on_clone(
        &self,
        original: FeatureRef<'_, Dynamic, Local>,
        copy: FeatureRef<'_, Dynamic, Local>,
    ) {
        // SAFETY:
        // 1. Guaranteed by the caller
        let original = unsafe { original.downcast_feature_unchecked::<T>() };
        // SAFETY:
        // 1. Guaranteed by the caller
        let copy = unsafe { copy.downcast_feature_unchecked::<T>() };
        self.hook.on_clone(original, copy);
    }
}

type HookList = Vec<Arc<dyn UntypedFeatureHook>>;

#[derive(Default)]
struct HookRegistry {
    /// Hooks registered for [`Dynamic`]
    global: HookList,
    /// Hooks keyed by the [`TypeId`] of the payload they were registered for
    typed: HashMap<TypeId, HookList, rustc_hash::FxBuildHasher>,
}

static HOOKS: HookLock<HookRegistry> = HookLock::new();

/// Registers a hook that observes every feature.
///
/// # Examples
///
/// ```
/// use featurebox::{FeatureRef, hooks, markers::{Dynamic, Local}};
///
/// hooks::register_feature_hook(|feature: FeatureRef<'_, Dynamic, Local>| {
///     eprintln!("bound a {}", feature.inner_type_name());
/// });
/// ```
pub fn register_feature_hook<H>(hook: H)
where
    H: FeatureHook<Dynamic>,
{
    let hook: Arc<Hook<Dynamic, H>> = Arc::new(Hook {
        hook,
        _hooked_type: PhantomData,
    });
    let hook = hook.unsize(unsize::Coercion!(to dyn UntypedFeatureHook));
    HOOKS.update(|registry| registry.global.push(hook));
}

/// Registers a hook that only observes features holding a `T`.
pub fn register_feature_hook_for<T, H>(hook: H)
where
    T: Sized + 'static,
    H: FeatureHook<T>,
{
    let hook: Arc<Hook<T, H>> = Arc::new(Hook {
        hook,
        _hooked_type: PhantomData,
    });
    let hook = hook.unsize(unsize::Coercion!(to dyn UntypedFeatureHook));
    HOOKS.update(|registry| {
        registry
            .typed
            .entry(TypeId::of::<T>())
            .or_default()
            .push(hook);
    });
}

impl HookRegistry {
    fn hooks_for(&self, type_id: TypeId) -> HookList {
        self.global
            .iter()
            .chain(self.typed.get(&type_id).into_iter().flatten())
            .cloned()
            .collect()
    }
}

/// Copies the hooks that apply to `type_id` out of the registry, so that the
/// lock is released before any of them runs.
fn get_hooks(type_id: TypeId) -> HookList {
    HOOKS
        .with(|registry| registry.hooks_for(type_id))
        .unwrap_or_default()
}

pub(crate) fn run_bind_hooks(feature: FeatureRef<'_, Dynamic, Local>) {
    for hook in get_hooks(feature.inner_type_id()) {
        // SAFETY:
        // 1. `get_hooks` only returns global hooks, which were registered for
        //    `Dynamic`, and hooks registered for the payload type of `feature`.
        unsafe { hook.on_bind(feature) }
    }
}

pub(crate) fn run_clone_hooks(
    original: FeatureRef<'_, Dynamic, Local>,
    copy: FeatureRef<'_, Dynamic, Local>,
) {
    debug_assert_eq!(original.inner_type_id(), copy.inner_type_id());

    for hook in get_hooks(original.inner_type_id()) {
        // SAFETY:
        // 1. As in `run_bind_hooks`, and `copy` holds the same payload type as
        //    `original` since it was cloned from it.
        unsafe { hook.on_clone(original, copy) }
    }
}
