//! Per-effect outcomes and batch reports

use metis_core::{
    Effect, EffectTrigger, MigratedArgs, MigrationError, ResolutionError, ScriptExecutionError,
};
use serde::Serialize;

/// What happened to one effect of a batch
#[derive(Debug)]
pub enum EffectOutcome {
    /// Script ran to completion
    Succeeded,
    /// No target could be found
    ResolutionFailed(ResolutionError),
    /// Stored arguments could not be migrated
    MigrationFailed(MigrationError),
    /// Script returned an error or panicked
    ScriptFailed(ScriptExecutionError),
    /// The surrounding execution was cancelled
    Aborted,
}

impl EffectOutcome {
    /// Whether the effect succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Whether the effect was aborted
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Short status label
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::ResolutionFailed(_) => "resolution-failed",
            Self::MigrationFailed(_) => "migration-failed",
            Self::ScriptFailed(_) => "script-failed",
            Self::Aborted => "aborted",
        }
    }

    /// Failure message, if any
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Succeeded | Self::Aborted => None,
            Self::ResolutionFailed(e) => Some(e.to_string()),
            Self::MigrationFailed(e) => Some(e.to_string()),
            Self::ScriptFailed(e) => Some(e.to_string()),
        }
    }
}

/// Outcome of one effect plus the migration it ran with
#[derive(Debug)]
pub struct EffectReport {
    /// Effect id
    pub effect_id: String,
    /// Effect local key
    pub local_key: String,
    /// Effect name
    pub name: String,
    /// Position in the batch
    pub order: u32,
    /// What happened
    pub outcome: EffectOutcome,
    /// Migrated arguments, when migration ran
    pub migration: Option<MigratedArgs>,
}

impl EffectReport {
    pub(crate) fn new(effect: &Effect, outcome: EffectOutcome) -> Self {
        Self {
            effect_id: effect.id.clone(),
            local_key: effect.local_key.clone(),
            name: effect.name.clone(),
            order: effect.order,
            outcome,
            migration: None,
        }
    }

    pub(crate) fn with_migration(mut self, migration: MigratedArgs) -> Self {
        self.migration = Some(migration);
        self
    }

    /// Serializable view
    #[must_use]
    pub fn summary(&self) -> EffectSummary {
        EffectSummary {
            effect_id: self.effect_id.clone(),
            name: self.name.clone(),
            order: self.order,
            status: self.outcome.status(),
            error: self.outcome.error_message(),
            migrated_to: self
                .migration
                .as_ref()
                .filter(|m| m.is_upgrade())
                .map(|m| m.version.to_string()),
        }
    }
}

/// Serializable summary of one effect report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectSummary {
    /// Effect id
    pub effect_id: String,
    /// Effect name
    pub name: String,
    /// Position in the batch
    pub order: u32,
    /// Status label
    pub status: &'static str,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Version the arguments were migrated to, if they were upgraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrated_to: Option<String>,
}

/// Outcomes of one trigger batch, in execution order
#[derive(Debug)]
pub struct ExecutionReport {
    /// Trigger that fired the batch
    pub trigger: EffectTrigger,
    /// One report per effect of the batch
    pub reports: Vec<EffectReport>,
}

impl ExecutionReport {
    pub(crate) fn new(trigger: EffectTrigger) -> Self {
        Self {
            trigger,
            reports: Vec::new(),
        }
    }

    /// Number of effects in the batch
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether the batch was empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Number of effects that succeeded
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Number of effects that did not succeed
    #[must_use]
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Outcome for an effect id
    #[must_use]
    pub fn outcome(&self, effect_id: &str) -> Option<&EffectOutcome> {
        self.reports
            .iter()
            .find(|r| r.effect_id == effect_id)
            .map(|r| &r.outcome)
    }

    /// Serializable view of every report
    #[must_use]
    pub fn summaries(&self) -> Vec<EffectSummary> {
        self.reports.iter().map(EffectReport::summary).collect()
    }

    /// Write upgraded arguments and versions back onto `effects`
    ///
    /// For hosts that persist migrations themselves. Returns how many
    /// effects changed.
    pub fn apply_migrations(&self, effects: &mut [Effect]) -> usize {
        let mut applied = 0;
        for report in &self.reports {
            let Some(migration) = report.migration.as_ref().filter(|m| m.is_upgrade()) else {
                continue;
            };
            if let Some(effect) = effects.iter_mut().find(|e| e.id == report.effect_id) {
                effect.args = migration.args.clone();
                effect.target_environment_version = migration.version.to_string();
                applied += 1;
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metis_core::{EffectArgs, TargetError};
    use semver::Version;
    use serde_json::json;

    fn effect(id: &str) -> Effect {
        Effect {
            id: id.into(),
            local_key: id.into(),
            name: format!("effect {id}"),
            description: String::new(),
            target_id: "t".into(),
            environment_id: None,
            target_environment_version: "0.1.0".into(),
            trigger: EffectTrigger::ExecutionSuccess,
            order: 1,
            args: EffectArgs::new(),
        }
    }

    #[test]
    fn summaries_label_each_outcome() {
        let mut report = ExecutionReport::new(EffectTrigger::ExecutionSuccess);
        report.reports.push(EffectReport::new(&effect("a"), EffectOutcome::Succeeded));
        report.reports.push(EffectReport::new(
            &effect("b"),
            EffectOutcome::ScriptFailed(ScriptExecutionError {
                effect_id: "b".into(),
                effect_name: "effect b".into(),
                source: TargetError::script("boom"),
            }),
        ));
        report.reports.push(EffectReport::new(&effect("c"), EffectOutcome::Aborted));

        let summaries = report.summaries();
        let statuses: Vec<&str> = summaries.iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec!["succeeded", "script-failed", "aborted"]);
        assert!(summaries[1].error.as_deref().unwrap().contains("boom"));
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
    }

    #[test]
    fn apply_migrations_only_touches_upgrades() {
        let mut report = ExecutionReport::new(EffectTrigger::ExecutionSuccess);
        let upgraded = MigratedArgs {
            args: json!({ "amount": 5 }).as_object().cloned().unwrap(),
            version: Version::new(0, 2, 0),
            applied: vec![Version::new(0, 2, 0)],
        };
        let unchanged = MigratedArgs {
            args: EffectArgs::new(),
            version: Version::new(0, 2, 0),
            applied: Vec::new(),
        };
        report
            .reports
            .push(
                EffectReport::new(&effect("a"), EffectOutcome::Succeeded).with_migration(upgraded),
            );
        report
            .reports
            .push(
                EffectReport::new(&effect("b"), EffectOutcome::Succeeded)
                    .with_migration(unchanged),
            );

        let mut effects = vec![effect("a"), effect("b")];
        assert_eq!(report.apply_migrations(&mut effects), 1);
        assert_eq!(effects[0].target_environment_version, "0.2.0");
        assert_eq!(effects[0].args["amount"], json!(5));
        assert_eq!(effects[1].target_environment_version, "0.1.0");
    }
}
