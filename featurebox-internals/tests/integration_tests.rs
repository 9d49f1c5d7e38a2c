//! Integration tests for the featurebox-internals crate.
//!
//! These exercise the raw erased storage end to end:
//! - dispatch through the vtable with stateless and stateful strategies
//! - deep copies and their independence from the original
//! - exactly-once drop of payloads and strategies, including when a clone
//!   panics halfway through
//! - the optional serialise entry

use std::{
    any::TypeId,
    cell::Cell,
    fmt,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

use featurebox_internals::{
    RawFeature, RawFeatureRef,
    handlers::{SerialiseHandler, VisualiseHandler},
};

// Renders a `RawFeatureRef` through `Display`
struct Show<'a>(RawFeatureRef<'a>);

impl fmt::Display for Show<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.visualise(f)
    }
}

fn show(feature: &RawFeature) -> String {
    Show(feature.as_ref()).to_string()
}

#[derive(Clone, Debug, PartialEq)]
struct Source {
    name: String,
    rate: u32,
}

#[derive(Clone, Debug, PartialEq)]
struct Sink {
    capacity: usize,
}

#[derive(Clone)]
struct DebugStrategy;

impl<T: fmt::Debug> VisualiseHandler<T> for DebugStrategy {
    fn visualise(&self, value: &T, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(value, formatter)
    }
}

#[derive(Clone)]
struct Labelled {
    label: String,
}

impl VisualiseHandler<Source> for Labelled {
    fn visualise(&self, value: &Source, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{}] {} @ {}Hz", self.label, value.name, value.rate)
    }
}

struct KeyValue;

impl SerialiseHandler<Sink> for KeyValue {
    fn serialise(value: &Sink, writer: &mut dyn fmt::Write) -> fmt::Result {
        write!(writer, "capacity={}", value.capacity)
    }
}

// Counts how many times it has been cloned and dropped
#[derive(Debug)]
struct Tracked {
    clones: Rc<Cell<usize>>,
    drops: Rc<Cell<usize>>,
    panic_on_clone: bool,
}

impl Tracked {
    fn new(clones: &Rc<Cell<usize>>, drops: &Rc<Cell<usize>>) -> Self {
        Self {
            clones: clones.clone(),
            drops: drops.clone(),
            panic_on_clone: false,
        }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        if self.panic_on_clone {
            panic!("refusing to clone");
        }
        self.clones.set(self.clones.get() + 1);
        Self {
            clones: self.clones.clone(),
            drops: self.drops.clone(),
            panic_on_clone: false,
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn test_feature_creation_and_dispatch() {
    let source = RawFeature::new(
        Source {
            name: "mic".to_owned(),
            rate: 48_000,
        },
        DebugStrategy,
    );
    let sink = RawFeature::new(Sink { capacity: 4 }, DebugStrategy);

    assert_eq!(source.as_ref().value_type_id(), TypeId::of::<Source>());
    assert_eq!(sink.as_ref().value_type_id(), TypeId::of::<Sink>());
    assert_eq!(
        source.as_ref().strategy_type_id(),
        TypeId::of::<DebugStrategy>()
    );
    assert!(source.as_ref().value_type_name().ends_with("Source"));

    assert_eq!(show(&source), "Source { name: \"mic\", rate: 48000 }");
    assert_eq!(show(&sink), "Sink { capacity: 4 }");
}

#[test]
fn test_stateful_strategy() {
    let feature = RawFeature::new(
        Source {
            name: "line-in".to_owned(),
            rate: 44_100,
        },
        Labelled {
            label: "input".to_owned(),
        },
    );

    assert_eq!(show(&feature), "[input] line-in @ 44100Hz");
    assert_eq!(
        feature.as_ref().strategy_type_id(),
        TypeId::of::<Labelled>()
    );
}

#[test]
fn test_same_payload_type_different_strategies() {
    let source = Source {
        name: "mic".to_owned(),
        rate: 8_000,
    };
    let plain = RawFeature::new(source.clone(), DebugStrategy);
    let labelled = RawFeature::new(
        source,
        Labelled {
            label: "x".to_owned(),
        },
    );

    assert_eq!(
        plain.as_ref().value_type_id(),
        labelled.as_ref().value_type_id()
    );
    assert_ne!(
        plain.as_ref().strategy_type_id(),
        labelled.as_ref().strategy_type_id()
    );
    assert_ne!(show(&plain), show(&labelled));
}

#[test]
fn test_clone_is_deep() {
    let original = RawFeature::new(
        Source {
            name: "a".to_owned(),
            rate: 1,
        },
        Labelled {
            label: "first".to_owned(),
        },
    );
    let copy = original.clone_raw();

    // SAFETY: Both features hold a `Source`
    let (a, b) = unsafe {
        (
            original.as_ref().value_downcast_unchecked::<Source>(),
            copy.as_ref().value_downcast_unchecked::<Source>(),
        )
    };
    assert_eq!(a, b);
    assert!(!std::ptr::eq(a, b));
    assert_eq!(show(&original), show(&copy));
}

#[test]
fn test_serialise_entry() {
    let with = RawFeature::new_serialisable::<_, _, KeyValue>(Sink { capacity: 9 }, DebugStrategy);
    let without = RawFeature::new(Sink { capacity: 9 }, DebugStrategy);

    let mut out = String::new();
    assert_eq!(with.as_ref().serialise(&mut out), Some(Ok(())));
    assert_eq!(out, "capacity=9");

    out.clear();
    assert_eq!(without.as_ref().serialise(&mut out), None);
    assert!(out.is_empty());

    // The serialiser survives cloning
    let copy = with.clone_raw();
    assert!(copy.as_ref().is_serialisable());
}

#[test]
fn test_clone_and_drop_behavior() {
    let clones = Rc::new(Cell::new(0));
    let drops = Rc::new(Cell::new(0));

    {
        let feature = RawFeature::new(Tracked::new(&clones, &drops), DebugStrategy);
        assert_eq!(drops.get(), 0);

        let copy = feature.clone_raw();
        assert_eq!(clones.get(), 1);

        drop(feature);
        assert_eq!(drops.get(), 1);

        let copy_of_copy = copy.clone_raw();
        assert_eq!(clones.get(), 2);
        drop(copy);
        assert_eq!(drops.get(), 2);
        drop(copy_of_copy);
    }

    assert_eq!(clones.get(), 2);
    assert_eq!(drops.get(), 3);
}

#[derive(Clone)]
struct TrackedStrategy(Tracked);

impl VisualiseHandler<Tracked> for TrackedStrategy {
    fn visualise(&self, _: &Tracked, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("tracked")
    }
}

#[test]
fn test_panicking_strategy_clone_drops_cloned_payload() {
    let payload_clones = Rc::new(Cell::new(0));
    let payload_drops = Rc::new(Cell::new(0));
    let strategy_clones = Rc::new(Cell::new(0));
    let strategy_drops = Rc::new(Cell::new(0));

    let mut strategy = Tracked::new(&strategy_clones, &strategy_drops);
    strategy.panic_on_clone = true;

    let payload = Tracked::new(&payload_clones, &payload_drops);

    let feature = RawFeature::new(payload, TrackedStrategy(strategy));

    let result = panic::catch_unwind(AssertUnwindSafe(|| feature.clone_raw()));
    assert!(result.is_err());

    // The payload was cloned, then dropped again while unwinding
    assert_eq!(payload_clones.get(), 1);
    assert_eq!(payload_drops.get(), 1);
    assert_eq!(strategy_clones.get(), 0);

    // The original is untouched
    assert_eq!(show(&feature), "tracked");
    drop(feature);
    assert_eq!(payload_drops.get(), 2);
    assert_eq!(strategy_drops.get(), 1);
}

#[test]
fn test_vtable_consistency() {
    let a = RawFeature::new(1u8, DebugStrategy);
    let b = RawFeature::new(2u8, DebugStrategy);

    assert_eq!(a.as_ref().value_type_id(), b.as_ref().value_type_id());
    assert_eq!(a.as_ref().strategy_type_id(), b.as_ref().strategy_type_id());
    assert_eq!(show(&a), "1");
    assert_eq!(show(&b), "2");
}
