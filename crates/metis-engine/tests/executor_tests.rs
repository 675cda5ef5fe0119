//! Effect executor tests
//!
//! Ordering, failure isolation, resolution and migration failures, cancellation.

use metis_core::{
    CancellationToken, EffectTrigger, MigrationError, ResolutionError, SessionHandle, Target,
    TargetEnvironment, TargetEnvironmentRegistry, TargetError,
};
use metis_engine::{targets, EffectEngine, EffectOutcome, EngineConfig};
use metis_test_utils::{
    effect, sample_session, test_environment, InvocationLog, TEST_ENVIRONMENT_ID,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

fn engine(log: &InvocationLog) -> EffectEngine {
    let registry = Arc::new(TargetEnvironmentRegistry::new());
    registry.register(test_environment(log));
    EffectEngine::new(EngineConfig::new(), registry)
}

fn session() -> Arc<dyn SessionHandle> {
    sample_session()
}

#[tokio::test]
async fn failure_is_confined_to_its_effect() {
    let log = InvocationLog::new();
    let engine = engine(&log);
    let effects = vec![
        effect("e1", "record").environment(TEST_ENVIRONMENT_ID).order(1).build(),
        effect("e2", "fail").environment(TEST_ENVIRONMENT_ID).order(2).build(),
        effect("e3", "record").environment(TEST_ENVIRONMENT_ID).order(3).build(),
    ];

    let report = engine
        .execute_trigger(&effects, EffectTrigger::ExecutionSuccess, &session())
        .await;

    assert_eq!(report.len(), 3);
    let statuses: Vec<&str> = report.reports.iter().map(|r| r.outcome.status()).collect();
    assert_eq!(statuses, vec!["succeeded", "script-failed", "succeeded"]);
    assert_eq!(log.entries(), vec!["e1", "e2", "e3"]);
    match report.outcome("e2") {
        Some(EffectOutcome::ScriptFailed(error)) => {
            assert_eq!(error.effect_id, "e2");
            assert!(matches!(error.source, TargetError::Script(_)));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn panicking_script_is_reported_and_batch_continues() {
    let log = InvocationLog::new();
    let engine = engine(&log);
    let effects = vec![
        effect("boom", "panic").environment(TEST_ENVIRONMENT_ID).order(1).build(),
        effect("after", "record").environment(TEST_ENVIRONMENT_ID).order(2).build(),
    ];

    let report = engine
        .execute_trigger(&effects, EffectTrigger::ExecutionSuccess, &session())
        .await;

    match report.outcome("boom") {
        Some(EffectOutcome::ScriptFailed(error)) => {
            assert!(matches!(
                &error.source,
                TargetError::Panicked(message) if message == "target blew up"
            ));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(report.outcome("after").unwrap().is_success());
    assert_eq!(log.entries(), vec!["after"]);
}

#[tokio::test]
async fn unresolvable_targets_fail_only_themselves() {
    let log = InvocationLog::new();
    let engine = engine(&log);
    let effects = vec![
        effect("e1", "missing").environment(TEST_ENVIRONMENT_ID).order(1).build(),
        effect("e2", "record").environment("nowhere").order(2).build(),
        effect("e3", "record").order(3).build(),
    ];

    let report = engine
        .execute_trigger(&effects, EffectTrigger::ExecutionSuccess, &session())
        .await;

    assert!(matches!(
        report.outcome("e1"),
        Some(EffectOutcome::ResolutionFailed(ResolutionError::UnknownTarget { .. }))
    ));
    assert!(matches!(
        report.outcome("e2"),
        Some(EffectOutcome::ResolutionFailed(ResolutionError::UnknownEnvironment(_)))
    ));
    // Environment-less effects resolve by inference.
    assert!(report.outcome("e3").unwrap().is_success());
}

#[tokio::test]
async fn migration_failures_skip_the_script_and_spare_siblings() {
    let log = InvocationLog::new();
    let engine = engine(&log);
    let effects = vec![
        effect("first", "record").environment(TEST_ENVIRONMENT_ID).order(1).build(),
        effect("broken", "strict")
            .environment(TEST_ENVIRONMENT_ID)
            .version("0.0.1")
            .args(serde_json::json!({ "broken": true }))
            .order(2)
            .build(),
        effect("future", "record")
            .environment(TEST_ENVIRONMENT_ID)
            .version("9.0.0")
            .order(3)
            .build(),
        effect("upgraded", "strict")
            .environment(TEST_ENVIRONMENT_ID)
            .version("0.0.1")
            .order(4)
            .build(),
        effect("last", "record").environment(TEST_ENVIRONMENT_ID).order(5).build(),
    ];

    let report = engine
        .execute_trigger(&effects, EffectTrigger::ExecutionSuccess, &session())
        .await;

    match report.outcome("broken") {
        Some(EffectOutcome::MigrationFailed(MigrationError::TransformFailed { version, .. })) => {
            assert_eq!(version.to_string(), "0.1.0");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(
        report.outcome("future"),
        Some(EffectOutcome::MigrationFailed(MigrationError::AheadOfTarget { .. }))
    ));
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failed(), 2);
    assert_eq!(log.entries(), vec!["first", "upgraded", "last"]);

    let upgraded = report.reports.iter().find(|r| r.effect_id == "upgraded").unwrap();
    assert!(upgraded.migration.as_ref().is_some_and(|m| m.is_upgrade()));
}

#[tokio::test]
async fn ambiguous_inference_is_a_resolution_failure() {
    let registry = Arc::new(TargetEnvironmentRegistry::new());
    targets::install_builtin(&registry).unwrap();
    registry.register(
        TargetEnvironment::builder("other", "1.0.0")
            .unwrap()
            .target(Target::builder("output").sync_script(|_| Ok(())))
            .build()
            .unwrap(),
    );
    assert!(registry.infer_target("output").is_none());

    let engine = EffectEngine::new(EngineConfig::new(), registry);
    let effects = vec![effect("e1", "output")
        .args(serde_json::json!({ "message": "hello" }))
        .build()];
    let report = engine
        .execute_trigger(&effects, EffectTrigger::ExecutionSuccess, &session())
        .await;

    match report.outcome("e1") {
        Some(EffectOutcome::ResolutionFailed(ResolutionError::Ambiguous { environments, .. })) => {
            assert_eq!(environments, &vec!["metis".to_string(), "other".to_string()]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_batch_runs_nothing() {
    let log = InvocationLog::new();
    let engine = engine(&log);
    let effects = vec![
        effect("e1", "record").environment(TEST_ENVIRONMENT_ID).order(1).build(),
        effect("e2", "record").environment(TEST_ENVIRONMENT_ID).order(2).build(),
    ];
    let token = CancellationToken::new();
    token.cancel();

    let report = engine
        .executor()
        .execute_trigger(&effects, EffectTrigger::ExecutionSuccess, &session(), &token)
        .await;

    assert!(report.reports.iter().all(|r| r.outcome.is_aborted()));
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn only_the_fired_trigger_runs() {
    let log = InvocationLog::new();
    let engine = engine(&log);
    let effects = vec![
        effect("start", "record")
            .environment(TEST_ENVIRONMENT_ID)
            .trigger(EffectTrigger::ExecutionInitiation)
            .build(),
        effect("won", "record").environment(TEST_ENVIRONMENT_ID).build(),
        effect("lost", "record")
            .environment(TEST_ENVIRONMENT_ID)
            .trigger(EffectTrigger::ExecutionFailure)
            .build(),
    ];

    let report = engine
        .execute_trigger(&effects, EffectTrigger::ExecutionFailure, &session())
        .await;

    assert_eq!(report.len(), 1);
    assert_eq!(log.entries(), vec!["lost"]);
}

proptest! {
    #[test]
    fn effects_run_in_stable_order(orders in prop::collection::vec(1u32..5, 1..16)) {
        let log = InvocationLog::new();
        let engine = engine(&log);
        let effects: Vec<_> = orders
            .iter()
            .enumerate()
            .map(|(i, order)| {
                effect(&format!("e{i}"), "record")
                    .environment(TEST_ENVIRONMENT_ID)
                    .order(*order)
                    .build()
            })
            .collect();

        let report = tokio_test::block_on(engine.execute_trigger(
            &effects,
            EffectTrigger::ExecutionSuccess,
            &session(),
        ));

        let mut expected: Vec<(u32, usize)> = orders.iter().copied().zip(0..).collect();
        expected.sort_by_key(|(order, _)| *order);
        let expected: Vec<String> = expected.into_iter().map(|(_, i)| format!("e{i}")).collect();

        prop_assert_eq!(log.entries(), expected.clone());
        let reported: Vec<String> = report.reports.iter().map(|r| r.effect_id.clone()).collect();
        prop_assert_eq!(reported, expected);
    }
}
