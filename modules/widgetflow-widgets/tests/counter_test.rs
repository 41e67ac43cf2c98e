use std::sync::Arc;

use serde_json::json;
use widgetflow_engine::{MemoryActionSink, MemoryStorage, SnapshotLog, Storage};
use widgetflow_widgets::counter::{counter, storage_key, CounterAction};

#[tokio::test]
async fn increment_and_clear_events() {
    let sink = Arc::new(MemoryActionSink::new());
    let instance = counter("clicks", None).journal(sink.clone()).build().unwrap();

    instance.handle_event("increment", json!({}));
    instance.handle_event("increment", json!({}));
    assert_eq!(instance.snapshot().tally, 2);

    instance.handle_event("clear", json!({}));
    assert_eq!(instance.snapshot().tally, 0);

    assert_eq!(
        sink.types(),
        vec![
            "COMPONENT_BOOTSTRAPPED",
            "INCREMENT",
            "TALLY_CHANGED",
            "INCREMENT",
            "TALLY_CHANGED",
            "CLEAR",
            "TALLY_CHANGED",
        ]
    );
}

#[tokio::test]
async fn clearing_zero_changes_nothing() {
    let log = SnapshotLog::new();
    let sink = Arc::new(MemoryActionSink::new());
    let instance = counter("clicks", None)
        .renderer(log.clone())
        .journal(sink.clone())
        .build()
        .unwrap();
    let renders = log.count();

    instance.dispatch(CounterAction::Clear);

    assert_eq!(log.count(), renders);
    assert!(!sink.types().contains(&"TALLY_CHANGED"));
}

#[tokio::test]
async fn tally_survives_a_restart() {
    let storage = Arc::new(MemoryStorage::new());

    let first = counter("clicks", Some(storage.clone())).build().unwrap();
    for _ in 0..3 {
        first.dispatch(CounterAction::Increment);
    }
    first.destroy();
    assert_eq!(storage.value(&storage_key("clicks")).as_deref(), Some("3"));

    let second = counter("clicks", Some(storage.clone() as Arc<dyn Storage>))
        .build()
        .unwrap();
    assert_eq!(second.snapshot().tally, 3);
    second.dispatch(CounterAction::Increment);
    assert_eq!(second.snapshot().tally, 4);
}
