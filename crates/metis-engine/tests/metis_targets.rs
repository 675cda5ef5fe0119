//! Built-in `metis` targets against the in-memory session

use metis_core::{
    ActionLocator, ArgumentValidationError, EffectTrigger, ForceLocator, NodeLocator, OutputKind,
    SessionHandle, TargetEnvironmentRegistry, TargetError,
};
use metis_engine::{targets, EffectEngine, EffectOutcome, EngineConfig, InMemorySession};
use metis_test_utils::{effect, sample_session, TEST_SESSION_ID};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn engine() -> EffectEngine {
    let registry = Arc::new(TargetEnvironmentRegistry::new());
    targets::install_builtin(&registry).unwrap();
    EffectEngine::new(EngineConfig::new(), registry)
}

async fn run_one(
    engine: &EffectEngine,
    session: &Arc<InMemorySession>,
    effect: metis_core::Effect,
) -> metis_engine::ExecutionReport {
    let handle: Arc<dyn SessionHandle> = session.clone();
    engine
        .execute_trigger(&[effect], EffectTrigger::ExecutionSuccess, &handle)
        .await
}

#[tokio::test]
async fn resource_pool_migrates_then_awards() {
    let engine = engine();
    let session = sample_session();
    let stored = effect("e1", "resource-pool")
        .environment("metis")
        .version("0.1.0")
        .args(json!({ "modifier": 5, "forceMetadata": { "forceKey": "f1" } }))
        .build();

    let report = run_one(&engine, &session, stored).await;

    assert!(report.reports[0].outcome.is_success());
    assert_eq!(session.resource_pool(&ForceLocator::new("f1")), Some(15.0));
    let migration = report.reports[0].migration.as_ref().unwrap();
    assert_eq!(
        serde_json::Value::Object(migration.args.clone()),
        json!({
            "operation": "award",
            "amount": 5,
            "forceMetadata": { "forceKey": "f1" },
        })
    );
    assert_eq!(migration.version.to_string(), "0.2.0");
}

#[tokio::test]
async fn resource_pool_deducts_to_floor() {
    let engine = engine();
    let session = sample_session();
    let stored = effect("e1", "resource-pool")
        .version("0.2.0")
        .args(json!({ "operation": "deduct", "amount": 25, "forceMetadata": { "forceKey": "f1" } }))
        .build();

    let report = run_one(&engine, &session, stored).await;

    assert!(report.reports[0].outcome.is_success());
    assert_eq!(session.resource_pool(&ForceLocator::new("f1")), Some(0.0));
}

#[tokio::test]
async fn out_of_range_argument_fails_validation() {
    let engine = engine();
    let session = sample_session();
    let stored = effect("e1", "resource-pool")
        .version("0.2.0")
        .args(json!({ "amount": -1, "forceMetadata": { "forceKey": "f1" } }))
        .build();

    let report = run_one(&engine, &session, stored).await;

    match &report.reports[0].outcome {
        EffectOutcome::ScriptFailed(error) => assert!(matches!(
            error.source,
            TargetError::Argument(ArgumentValidationError::OutOfRange { .. })
        )),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(session.resource_pool(&ForceLocator::new("f1")), Some(10.0));
}

#[tokio::test]
async fn output_targets_one_force_or_all() {
    let engine = engine();
    let session = sample_session();
    let handle: Arc<dyn SessionHandle> = session.clone();
    let effects = vec![
        effect("direct", "output")
            .version("0.2.0")
            .order(1)
            .args(json!({
                "message": "for f1",
                "kind": "success",
                "forceMetadata": { "forceKey": "f1" }
            }))
            .build(),
        effect("broadcast", "output")
            .version("0.2.0")
            .order(2)
            .args(json!({ "message": "for everyone" }))
            .build(),
    ];

    let report = engine
        .execute_trigger(&effects, EffectTrigger::ExecutionSuccess, &handle)
        .await;
    assert_eq!(report.succeeded(), 2);

    let f1 = session.outputs(&ForceLocator::new("f1"));
    let f2 = session.outputs(&ForceLocator::new("f2"));
    assert_eq!(f1.len(), 2);
    assert_eq!(f1[0].kind, OutputKind::Success);
    assert_eq!(f1[0].effect_id.as_deref(), Some("direct"));
    assert_eq!(f2.len(), 1);
    assert_eq!(f2[0].message, "for everyone");
}

#[tokio::test]
async fn node_file_and_action_targets_mutate_session() {
    let engine = engine();
    let session = sample_session();
    let handle: Arc<dyn SessionHandle> = session.clone();
    let action = json!({ "forceKey": "f1", "nodeKey": "root", "actionKey": "a1" });
    let effects = vec![
        effect("close", "node")
            .version("0.2.0")
            .order(1)
            .args(json!({
                "nodeMetadata": { "forceKey": "f1", "nodeKey": "sibling" },
                "status": "closed"
            }))
            .build(),
        effect("grant", "file-access")
            .version("0.2.0")
            .order(2)
            .args(json!({
                "fileMetadata": { "fileId": "intel" },
                "forceMetadata": { "forceKey": "f2" }
            }))
            .build(),
        effect("chance", "success-chance")
            .version("0.2.0")
            .order(3)
            .args(json!({ "successChance": 25, "actionMetadata": action }))
            .build(),
        effect("time", "process-time")
            .version("0.2.0")
            .order(4)
            .args(json!({ "processTimeMinutes": 1, "actionMetadata": action }))
            .build(),
    ];

    let report = engine
        .execute_trigger(&effects, EffectTrigger::ExecutionSuccess, &handle)
        .await;

    assert_eq!(report.succeeded(), 4, "{:?}", report.summaries());
    assert_eq!(session.is_node_open(&NodeLocator::new("f1", "sibling")), Some(false));
    assert!(session.has_file_access("intel", &ForceLocator::new("f2")));
    let parameters = session
        .action_parameters(&ActionLocator::new("f1", "root", "a1"))
        .unwrap();
    assert!((parameters.success_chance - 0.75).abs() < f64::EPSILON);
    assert_eq!(parameters.process_time_ms, 61_000);
}

#[tokio::test]
async fn counter_persists_across_effects_and_announces() {
    let engine = engine();
    let session = sample_session();
    let handle: Arc<dyn SessionHandle> = session.clone();
    let effects = vec![
        effect("c1", "counter")
            .version("0.2.0")
            .order(1)
            .args(json!({ "counterKey": "hits", "increment": 2 }))
            .build(),
        effect("c2", "counter")
            .version("0.2.0")
            .order(2)
            .args(json!({
                "counterKey": "hits",
                "announce": true,
                "forceMetadata": { "forceKey": "f2" }
            }))
            .build(),
    ];

    engine.start_session(handle.as_ref()).await;
    let report = engine
        .execute_trigger(&effects, EffectTrigger::ExecutionSuccess, &handle)
        .await;

    assert_eq!(report.succeeded(), 2, "{:?}", report.summaries());
    let outputs = session.outputs(&ForceLocator::new("f2"));
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].message, "hits: 3");

    let store = engine.stores().find_store(TEST_SESSION_ID, Some("metis")).unwrap();
    assert_eq!(store.get("counters").unwrap().get(), json!({ "hits": 3.0 }));

    engine.end_session(handle.as_ref()).await;
    assert!(engine.stores().find_store(TEST_SESSION_ID, Some("metis")).is_none());
}

#[tokio::test]
async fn counter_announce_requires_force() {
    let engine = engine();
    let session = sample_session();
    let stored = effect("c1", "counter")
        .version("0.2.0")
        .args(json!({ "announce": true }))
        .build();

    let report = run_one(&engine, &session, stored).await;

    match &report.reports[0].outcome {
        EffectOutcome::ScriptFailed(error) => assert!(matches!(
            error.source,
            TargetError::Argument(ArgumentValidationError::Missing(_))
        )),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn delay_waits_for_configured_time() {
    let engine = engine();
    let session = sample_session();
    let stored = effect("wait", "delay")
        .version("0.2.0")
        .args(json!({ "delayTimeHours": 0, "delayTimeMinutes": 0, "delayTimeSeconds": 2 }))
        .build();

    let started = tokio::time::Instant::now();
    let report = run_one(&engine, &session, stored).await;
    let elapsed = started.elapsed();

    assert!(report.reports[0].outcome.is_success());
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_millis(2050));
}
