//! Persisted effect records
//!
//! Effects arrive as part of a mission action's JSON payload and are never
//! mutated by the engine unless migration persistence is requested.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Argument bag stored on an effect
pub type EffectArgs = Map<String, Value>;

/// Action-execution phase that fires a batch of effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EffectTrigger {
    /// Execution has started
    #[serde(rename = "execution-initiation")]
    ExecutionInitiation,
    /// Execution finished and succeeded
    #[serde(rename = "execution-success")]
    ExecutionSuccess,
    /// Execution finished and failed
    #[serde(rename = "execution-failure")]
    ExecutionFailure,
}

impl EffectTrigger {
    /// Every trigger, in the order they can fire
    pub const ALL: [EffectTrigger; 3] = [
        EffectTrigger::ExecutionInitiation,
        EffectTrigger::ExecutionSuccess,
        EffectTrigger::ExecutionFailure,
    ];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectTrigger::ExecutionInitiation => "execution-initiation",
            EffectTrigger::ExecutionSuccess => "execution-success",
            EffectTrigger::ExecutionFailure => "execution-failure",
        }
    }
}

impl fmt::Display for EffectTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EffectTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EffectTrigger::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown trigger `{s}`"))
    }
}

/// A configured invocation of one target, attached to a mission action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    /// Persistent id
    #[serde(rename = "_id")]
    pub id: String,
    /// Key unique within the owning action
    pub local_key: String,
    /// Author-facing name
    pub name: String,
    /// Author-facing description
    #[serde(default)]
    pub description: String,
    /// Target to run
    pub target_id: String,
    /// Environment owning the target; inferred when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    /// Version the stored `args` are known to be compatible with
    pub target_environment_version: String,
    /// Phase that fires this effect
    pub trigger: EffectTrigger,
    /// 1-based position within the trigger
    pub order: u32,
    /// Stored arguments
    #[serde(default)]
    pub args: EffectArgs,
}

impl Effect {
    /// Whether this effect belongs to the batch fired by `trigger`
    #[inline]
    #[must_use]
    pub fn fires_on(&self, trigger: EffectTrigger) -> bool {
        self.trigger == trigger
    }
}

/// Effects of one trigger, stable-sorted by `order`
///
/// Ties keep their original relative position.
#[must_use]
pub fn select_batch(effects: &[Effect], trigger: EffectTrigger) -> Vec<&Effect> {
    let mut batch: Vec<&Effect> = effects.iter().filter(|e| e.fires_on(trigger)).collect();
    batch.sort_by_key(|e| e.order);
    batch
}

/// Next free `order` for a new effect on `trigger`
///
/// Orders are never renumbered, so this is one past the current maximum
/// rather than the count of siblings. Saturates at `u32::MAX`, where the
/// new effect sorts after its equal-order siblings.
#[must_use]
pub fn next_order(effects: &[Effect], trigger: EffectTrigger) -> u32 {
    effects
        .iter()
        .filter(|e| e.fires_on(trigger))
        .map(|e| e.order)
        .max()
        .unwrap_or(0)
        .saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn effect(id: &str, trigger: EffectTrigger, order: u32) -> Effect {
        Effect {
            id: id.into(),
            local_key: id.into(),
            name: id.into(),
            description: String::new(),
            target_id: "output".into(),
            environment_id: None,
            target_environment_version: "0.1.0".into(),
            trigger,
            order,
            args: EffectArgs::new(),
        }
    }

    #[test]
    fn deserializes_persisted_shape() {
        let raw = json!({
            "_id": "e1",
            "localKey": "1",
            "name": "Award",
            "targetId": "resource-pool",
            "environmentId": "metis",
            "targetEnvironmentVersion": "0.1.0",
            "trigger": "execution-success",
            "order": 1,
            "args": { "modifier": 5 }
        });
        let effect: Effect = serde_json::from_value(raw).unwrap();
        assert_eq!(effect.id, "e1");
        assert_eq!(effect.trigger, EffectTrigger::ExecutionSuccess);
        assert_eq!(effect.environment_id.as_deref(), Some("metis"));
        assert_eq!(effect.args["modifier"], json!(5));
        assert!(effect.description.is_empty());
    }

    #[test]
    fn trigger_round_trips_through_str() {
        for trigger in EffectTrigger::ALL {
            assert_eq!(trigger.as_str().parse::<EffectTrigger>().unwrap(), trigger);
        }
        assert!("execution-maybe".parse::<EffectTrigger>().is_err());
    }

    #[test]
    fn select_batch_filters_and_sorts_stably() {
        let effects = vec![
            effect("s2", EffectTrigger::ExecutionSuccess, 2),
            effect("i1", EffectTrigger::ExecutionInitiation, 1),
            effect("s1", EffectTrigger::ExecutionSuccess, 1),
            effect("s2b", EffectTrigger::ExecutionSuccess, 2),
        ];
        let ids: Vec<&str> = select_batch(&effects, EffectTrigger::ExecutionSuccess)
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["s1", "s2", "s2b"]);
    }

    #[test]
    fn next_order_skips_gaps() {
        let effects = vec![
            effect("a", EffectTrigger::ExecutionSuccess, 1),
            effect("c", EffectTrigger::ExecutionSuccess, 3),
        ];
        assert_eq!(next_order(&effects, EffectTrigger::ExecutionSuccess), 4);
        assert_eq!(next_order(&effects, EffectTrigger::ExecutionFailure), 1);
    }

    #[test]
    fn next_order_saturates_at_max() {
        let effects = vec![effect("last", EffectTrigger::ExecutionSuccess, u32::MAX)];
        assert_eq!(next_order(&effects, EffectTrigger::ExecutionSuccess), u32::MAX);
    }
}
