//! Integration tests for the per-instance dispatch loop.

mod support;

use std::sync::Arc;

use anyhow::anyhow;
use support::*;
use widgetflow_common::{ErrorLocation, FlowError};
use widgetflow_engine::{Behavior, Dispatcher, MemoryActionSink, RenderFn, SnapshotLog};

// =========================================================================
// Ordering
// =========================================================================

#[tokio::test]
async fn reducers_run_in_registration_order_against_previous_commit() {
    let instance = builder()
        .reducer(TestTag::Push, |ctx| match &ctx.action.kind {
            TestAction::Push(label) => Ok(Some(push(ctx.state, format!("first:{label}")))),
            _ => Ok(None),
        })
        .reducer(TestTag::Push, |ctx| {
            // Sees the first reducer's entry already committed.
            let seen = ctx.state.log.len();
            Ok(Some(push(ctx.state, format!("second saw {seen}"))))
        })
        .build()
        .unwrap();

    instance.dispatch(TestAction::Push("x".into()));

    assert_eq!(instance.snapshot().log, vec!["first:x", "second saw 1"]);
}

#[tokio::test]
async fn actions_raised_by_reducers_are_handled_breadth_first() {
    // root → [A, B] → [end-A, end-B]
    let instance = builder()
        .reducer(TestTag::Push, |ctx| {
            if let TestAction::Push(label) = &ctx.action.kind {
                match label.as_str() {
                    "root" => {
                        ctx.dispatch(TestAction::Push("A".into()));
                        ctx.dispatch(TestAction::Push("B".into()));
                    }
                    "A" | "B" => {
                        ctx.dispatch(TestAction::Push(format!("end-{label}")));
                    }
                    _ => {}
                }
            }
            log_push(ctx)
        })
        .reducer(TestTag::Push, |ctx| match &ctx.action.kind {
            TestAction::Push(label) => Ok(Some(push(ctx.state, format!("seen:{label}")))),
            _ => Ok(None),
        })
        .build()
        .unwrap();

    instance.dispatch(TestAction::Push("root".into()));

    assert_eq!(
        instance.snapshot().log,
        vec![
            "root", "seen:root", "A", "seen:A", "B", "seen:B", "end-A", "seen:end-A", "end-B",
            "seen:end-B",
        ]
    );
}

#[tokio::test]
async fn action_without_handlers_changes_nothing() {
    let log = SnapshotLog::new();
    let instance = builder().renderer(log.clone()).build().unwrap();

    assert!(instance.dispatch(TestAction::Ignored));

    assert_eq!(*instance.snapshot(), TestState::default());
    assert_eq!(log.count(), 0);
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test]
async fn failing_reducer_aborts_only_itself() {
    let instance = builder()
        .reducer(TestTag::Fail, |ctx| Ok(Some(push(ctx.state, "before"))))
        .reducer(TestTag::Fail, |_ctx| Err(anyhow!("bad input")))
        .reducer(TestTag::Fail, |ctx| Ok(Some(push(ctx.state, "after"))))
        .reducer(TestTag::Push, log_push)
        .build()
        .unwrap();

    instance.dispatch(TestAction::Fail);
    instance.dispatch(TestAction::Push("next".into()));

    let state = instance.snapshot();
    // No rollback of the earlier commit, later handlers and actions still run.
    assert_eq!(state.log, vec!["before", "after", "next"]);
    assert_eq!(state.errors.len(), 1);
    assert_eq!(state.errors[0].location, ErrorLocation::ActionHandler);
    assert_eq!(state.errors[0].source.as_deref(), Some("FAIL"));
    assert!(state.errors[0].message.contains("bad input"));
}

#[tokio::test]
async fn panicking_reducer_is_reported_not_propagated() {
    let instance = builder()
        .reducer(TestTag::Fail, |_ctx| -> anyhow::Result<Option<TestDelta>> {
            panic!("reducer exploded")
        })
        .reducer(TestTag::Push, log_push)
        .build()
        .unwrap();

    instance.dispatch(TestAction::Fail);
    instance.dispatch(TestAction::Push("still alive".into()));

    let state = instance.snapshot();
    assert_eq!(state.log, vec!["still alive"]);
    assert_eq!(state.errors.len(), 1);
    assert!(state.errors[0].message.contains("reducer exploded"));
}

#[tokio::test]
async fn render_failure_is_reported_once() {
    let instance = builder()
        .reducer(TestTag::Push, log_push)
        .renderer(RenderFn(
            |_snapshot: &Arc<TestState>, _dispatch: &Dispatcher<TestState, TestAction>| -> anyhow::Result<()> {
                Err(anyhow!("template missing"))
            },
        ))
        .build()
        .unwrap();

    instance.dispatch(TestAction::Push("x".into()));

    // The ErrorThrown commit also fails to render, but that is only logged.
    let state = instance.snapshot();
    assert_eq!(state.errors.len(), 1);
    assert_eq!(state.errors[0].location, ErrorLocation::Render);
    assert_eq!(state.errors[0].source.as_deref(), Some("PUSH"));
}

#[tokio::test]
async fn event_handler_errors_carry_their_origin() {
    let instance = builder()
        .reducer(TestTag::Push, log_push)
        .on_event("click", |_ctx| Err(anyhow!("Error in event handler")))
        .behavior(Behavior::<TestState, TestAction>::new("drop").on(&["drop"], |ctx| {
            let label = ctx.payload["label"]
                .as_str()
                .ok_or_else(|| anyhow!("drop payload has no label"))?;
            ctx.dispatch(TestAction::Push(label.to_string()));
            Ok(())
        }))
        .build()
        .unwrap();

    instance.handle_event("click", serde_json::json!({}));
    instance.handle_event("drop", serde_json::json!({"label": "card-1"}));
    instance.handle_event("drop", serde_json::json!({}));

    let state = instance.snapshot();
    assert_eq!(state.log, vec!["card-1"]);
    assert_eq!(state.errors.len(), 2);
    assert_eq!(state.errors[0].location, ErrorLocation::EventHandler);
    assert_eq!(state.errors[0].source.as_deref(), Some("click"));
    assert_eq!(state.errors[1].source.as_deref(), Some("drop:drop"));
}

#[tokio::test]
async fn unknown_event_is_ignored() {
    let instance = builder().build().unwrap();
    instance.handle_event("mouseover", serde_json::json!({}));
    assert!(instance.snapshot().errors.is_empty());
}

// =========================================================================
// Derived state and rendering
// =========================================================================

#[tokio::test]
async fn computed_field_is_consistent_in_every_rendered_snapshot() {
    let log = SnapshotLog::new();
    let instance = builder()
        .reducer(TestTag::Push, log_push)
        .reducer(TestTag::Push, |_ctx| {
            // Writes the computed field directly; the derived pass overwrites it.
            Ok(Some(TestDelta {
                count: Some(1000),
                ..Default::default()
            }))
        })
        .renderer(log.clone())
        .build()
        .unwrap();

    for label in ["a", "b", "c", "d"] {
        instance.dispatch(TestAction::Push(label.into()));
    }

    let snapshots = log.snapshots();
    assert!(!snapshots.is_empty());
    for snapshot in &snapshots {
        assert_eq!(snapshot.count, snapshot.log.len());
    }
    assert_eq!(instance.snapshot().count, 4);
}

#[tokio::test]
async fn rendered_snapshots_are_never_mutated() {
    let log = SnapshotLog::new();
    let instance = builder()
        .reducer(TestTag::Push, log_push)
        .renderer(log.clone())
        .build()
        .unwrap();

    instance.dispatch(TestAction::Push("one".into()));
    let first = log.last().unwrap();
    instance.dispatch(TestAction::Push("two".into()));

    assert_eq!(first.log, vec!["one"]);
    assert_eq!(log.last().unwrap().log, vec!["one", "two"]);
    assert_eq!(log.count(), 2);
}

#[tokio::test]
async fn renderer_can_dispatch() {
    let instance = builder()
        .reducer(TestTag::Push, log_push)
        .renderer(RenderFn(
            |snapshot: &Arc<TestState>, dispatch: &Dispatcher<TestState, TestAction>| -> anyhow::Result<()> {
                if snapshot.log.last().map(String::as_str) == Some("ping") {
                    dispatch.dispatch(TestAction::Push("pong".into()));
                }
                Ok(())
            },
        ))
        .build()
        .unwrap();

    instance.dispatch(TestAction::Push("ping".into()));
    assert_eq!(instance.snapshot().log, vec!["ping", "pong"]);
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn bootstrapped_is_the_first_action() {
    let sink = Arc::new(MemoryActionSink::new());
    let instance = builder().journal(sink.clone()).build().unwrap();
    instance.dispatch(TestAction::Ignored);
    assert_eq!(sink.types(), vec!["LIFECYCLE", "IGNORED"]);
}

#[tokio::test]
async fn destroyed_instance_discards_dispatches() {
    let instance = builder().reducer(TestTag::Push, log_push).build().unwrap();
    let dispatcher = instance.dispatcher();
    instance.dispatch(TestAction::Push("before".into()));

    instance.destroy();

    assert!(instance.is_destroyed());
    assert!(!dispatcher.is_live());
    assert!(!instance.dispatch(TestAction::Push("after".into())));
    assert!(!dispatcher.dispatch(TestAction::Push("late".into())));
    assert_eq!(instance.snapshot().log, vec!["before"]);
}

#[tokio::test]
async fn journal_links_follow_ups_to_their_cause() {
    let sink = Arc::new(MemoryActionSink::new());
    let instance = builder()
        .reducer(TestTag::Push, |ctx| {
            if matches!(&ctx.action.kind, TestAction::Push(l) if l == "root") {
                ctx.dispatch(TestAction::Push("child".into()));
            }
            log_push(ctx)
        })
        .journal(sink.clone())
        .build()
        .unwrap();

    instance.dispatch(TestAction::Push("root".into()));

    let entries = sink.entries();
    assert_eq!(entries.len(), 3);
    let (root, child) = (&entries[1], &entries[2]);
    assert_eq!(root.action_type, "PUSH");
    assert!(root.caused_by.is_none());
    assert_eq!(child.caused_by, Some(root.seq));
    assert!(entries.iter().all(|e| e.instance == instance.id()));
}

#[test]
fn build_requires_a_runtime() {
    let result = builder().build();
    assert!(matches!(result, Err(FlowError::NoRuntime)));
}
