use std::{
    sync::{
        Mutex, mpsc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use featurebox::{
    Feature, FeatureRef,
    handlers,
    hooks::{self, FeatureHook},
    markers::{Dynamic, Local},
};

// Hooks are process-wide, so every test below uses a payload type of its own.

#[derive(Clone, Debug)]
struct GlobalProbe(u8);

static GLOBAL_BINDS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn test_global_hook_sees_every_bind() {
    hooks::register_feature_hook(|feature: FeatureRef<'_, Dynamic, Local>| {
        if feature.downcast_inner::<GlobalProbe>().is_some() {
            GLOBAL_BINDS.fetch_add(1, Ordering::Relaxed);
        }
    });

    let a: Feature<GlobalProbe> = Feature::new_custom(GlobalProbe(1), handlers::Debug);
    let _b: Feature<GlobalProbe, Local> = Feature::new_local_custom(GlobalProbe(2), handlers::Debug);
    assert_eq!(GLOBAL_BINDS.load(Ordering::Relaxed), 2);

    // Cloning is not a bind
    let _c = a.clone();
    assert_eq!(GLOBAL_BINDS.load(Ordering::Relaxed), 2);
}

#[derive(Clone, Debug)]
struct Ledger(Vec<u32>);

struct LedgerHook {
    binds: &'static Mutex<Vec<usize>>,
    clones: &'static AtomicUsize,
}

impl FeatureHook<Ledger> for LedgerHook {
    fn on_bind(&self, feature: FeatureRef<'_, Ledger, Local>) {
        self.binds.lock().unwrap().push(feature.inner().0.len());
    }

    fn on_clone(&self, original: FeatureRef<'_, Ledger, Local>, copy: FeatureRef<'_, Ledger, Local>) {
        assert_eq!(original.inner().0, copy.inner().0);
        assert!(!core::ptr::eq(original.inner(), copy.inner()));
        self.clones.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_typed_hook_receives_typed_refs() {
    static BINDS: Mutex<Vec<usize>> = Mutex::new(Vec::new());
    static CLONES: AtomicUsize = AtomicUsize::new(0);

    hooks::register_feature_hook_for::<Ledger, _>(LedgerHook {
        binds: &BINDS,
        clones: &CLONES,
    });

    let ledger: Feature<Ledger> = Feature::new_custom(Ledger(vec![1, 2, 3]), handlers::Debug);
    let _other: Feature<u32> = Feature::new_custom(3, handlers::Display);
    assert_eq!(*BINDS.lock().unwrap(), [3]);

    let dynamic = ledger.into_dynamic();
    let copy = dynamic.clone();
    assert_eq!(CLONES.load(Ordering::Relaxed), 1);

    let mut target = copy.clone();
    target.clone_from(&dynamic);
    assert_eq!(CLONES.load(Ordering::Relaxed), 3);
    assert_eq!(*BINDS.lock().unwrap(), [3]);
}

#[derive(Clone, Debug)]
struct Ordered;

#[test]
fn test_hooks_run_in_registration_order() {
    static ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    hooks::register_feature_hook_for::<Ordered, _>(|_: FeatureRef<'_, Ordered, Local>| {
        ORDER.lock().unwrap().push("typed");
    });
    hooks::register_feature_hook(|feature: FeatureRef<'_, Dynamic, Local>| {
        if feature.downcast_inner::<Ordered>().is_some() {
            ORDER.lock().unwrap().push("first global");
        }
    });
    hooks::register_feature_hook(|feature: FeatureRef<'_, Dynamic, Local>| {
        if feature.downcast_inner::<Ordered>().is_some() {
            ORDER.lock().unwrap().push("second global");
        }
    });

    let _feature: Feature<Ordered> = Feature::new_custom(Ordered, handlers::Debug);
    assert_eq!(
        *ORDER.lock().unwrap(),
        ["first global", "second global", "typed"]
    );
}

#[derive(Clone, Debug)]
struct Reentrant(u8);

#[derive(Clone, Debug)]
struct Nested;

static NESTED_BINDS: AtomicUsize = AtomicUsize::new(0);
static LATE_BINDS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn test_hooks_may_bind_clone_and_register() {
    hooks::register_feature_hook_for::<Nested, _>(|_: FeatureRef<'_, Nested, Local>| {
        NESTED_BINDS.fetch_add(1, Ordering::Relaxed);
    });
    hooks::register_feature_hook_for::<Reentrant, _>(|feature: FeatureRef<'_, Reentrant, Local>| {
        let copy = feature.to_owned_feature();
        assert_eq!(copy.inner().0, feature.inner().0);

        let _nested: Feature<Nested, Local> = Feature::new_local_custom(Nested, handlers::Debug);

        hooks::register_feature_hook(|feature: FeatureRef<'_, Dynamic, Local>| {
            if feature.downcast_inner::<Reentrant>().is_some() {
                LATE_BINDS.fetch_add(1, Ordering::Relaxed);
            }
        });
    });

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let feature: Feature<Reentrant> = Feature::new_custom(Reentrant(7), handlers::Debug);
        sender.send(feature).unwrap();
    });

    let feature = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("bind did not return");
    assert_eq!(feature.inner().0, 7);
    assert_eq!(NESTED_BINDS.load(Ordering::Relaxed), 1);

    // The hook registered during the first bind only sees later binds
    assert_eq!(LATE_BINDS.load(Ordering::Relaxed), 0);
    let _second: Feature<Reentrant> = Feature::new_custom(Reentrant(8), handlers::Debug);
    assert_eq!(LATE_BINDS.load(Ordering::Relaxed), 1);
    assert_eq!(NESTED_BINDS.load(Ordering::Relaxed), 2);
}
