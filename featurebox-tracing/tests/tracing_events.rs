use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, Once},
};

use featurebox::{Feature, handlers};
use featurebox_tracing::{TARGET, Traced, TracingHook, visualise_all_traced};
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{Layer, Registry, layer::Context, prelude::*, registry::LookupSpan};

#[derive(Clone, Debug)]
struct Captured {
    target: String,
    level: tracing::Level,
    fields: BTreeMap<String, String>,
    spans: Vec<String>,
}

impl Captured {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Default)]
struct FieldVisitor(BTreeMap<String, String>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl CaptureLayer {
    fn take(&self) -> Vec<Captured> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let spans = ctx
            .event_scope(event)
            .map(|scope| scope.from_root().map(|span| span.name().to_owned()).collect())
            .unwrap_or_default();

        self.events.lock().unwrap().push(Captured {
            target: event.metadata().target().to_owned(),
            level: *event.metadata().level(),
            fields: visitor.0,
            spans,
        });
    }
}

fn install_once() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        featurebox::hooks::register_feature_hook(TracingHook { log_clones: true });
    });
}

fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Captured>) {
    install_once();
    let layer = CaptureLayer::default();
    let subscriber = Registry::default().with(layer.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, layer.take())
}

#[test]
fn test_bind_emits_event() {
    let (feature, events) = capture(|| {
        let feature: Feature<u16> = Feature::new_custom(9, handlers::Display);
        feature
    });
    assert_eq!(feature.to_string(), "9");

    let bound: Vec<_> = events
        .iter()
        .filter(|event| event.field("message") == Some("feature bound"))
        .collect();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].target, TARGET);
    assert_eq!(bound[0].level, tracing::Level::DEBUG);
    assert_eq!(bound[0].field("type_name"), Some("u16"));
    assert_eq!(
        bound[0].field("strategy"),
        Some(std::any::type_name::<handlers::Display>())
    );
    assert_eq!(bound[0].field("serialisable"), Some("false"));
}

#[test]
fn test_clone_emits_event() {
    let feature: Feature<String> = Feature::new_custom("x".to_owned(), handlers::Debug);

    let (copy, events) = capture(|| feature.clone());
    assert_eq!(copy.to_string(), "\"x\"");

    let cloned: Vec<_> = events
        .iter()
        .filter(|event| event.field("message") == Some("feature cloned"))
        .collect();
    assert_eq!(cloned.len(), 1);
    assert_eq!(cloned[0].level, tracing::Level::TRACE);
    assert_eq!(
        cloned[0].field("type_name"),
        Some(std::any::type_name::<String>())
    );
}

#[derive(Clone)]
struct Failing;

impl handlers::VisualiseHandler<u8> for Failing {
    fn visualise(&self, _: &u8, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        Err(fmt::Error)
    }
}

#[test]
fn test_traced_strategy_runs_in_span() {
    let feature: Feature<u8> = Feature::new_custom(3, Traced::new(Failing));

    let (result, events) = capture(|| {
        let mut out = String::new();
        feature.visualise(&mut out)
    });
    assert!(result.is_err());

    let warning = events
        .iter()
        .find(|event| event.level == tracing::Level::WARN)
        .expect("no warning emitted");
    assert_eq!(warning.spans, ["visualise"]);
    assert_eq!(warning.target, TARGET);
}

#[test]
fn test_visualise_all_traced_reports_each_index() {
    let features: Vec<Feature> = vec![
        Feature::<u8>::new_custom(1, handlers::Display).into_dynamic(),
        Feature::<char>::new_custom('c', handlers::Debug).into_dynamic(),
        Feature::<u8>::new_custom(3, Failing).into_dynamic(),
        Feature::<u8>::new_custom(4, handlers::Display).into_dynamic(),
    ];

    let ((result, out), events) = capture(|| {
        let mut out = String::new();
        let result = visualise_all_traced(&features, &mut out);
        (result, out)
    });

    assert!(result.is_err());
    assert_eq!(out, "1\n'c'\n");

    let visited: Vec<&str> = events
        .iter()
        .filter(|event| event.field("message") == Some("visualising feature"))
        .filter_map(|event| event.field("index"))
        .collect();
    assert_eq!(visited, ["0", "1", "2"]);

    let failure = events
        .iter()
        .find(|event| event.level == tracing::Level::ERROR)
        .expect("no error emitted");
    assert_eq!(failure.field("index"), Some("2"));
}
