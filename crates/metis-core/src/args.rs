//! Target argument schema
//!
//! Describes each configurable input of a target and resolves an effect's
//! stored arguments against it:
//! - [`ArgSpec`]: type, bounds, default and dependencies of one argument
//! - [`ArgDependency`]: "only meaningful when another argument matches"
//! - [`TargetArgs`]: resolved bag with typed, validating accessors
//!
//! Defaults are applied once, when [`TargetArgs::resolve`] runs, and only to
//! arguments whose dependencies are satisfied. Typed accessors raise
//! [`ArgumentValidationError`] so scripts can surface bad input with `?`.

use crate::effect::EffectArgs;
use crate::error::ArgumentValidationError;
use crate::metadata::{ActionLocator, FileLocator, ForceLocator, NodeLocator};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Argument value types understood by the editor and scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgType {
    /// Single-line text
    String,
    /// Multi-line text / rich text
    LargeString,
    /// Number, optionally bounded
    Number,
    /// Boolean toggle
    Boolean,
    /// One of a fixed list of options
    Dropdown,
    /// `{ forceKey }`
    Force,
    /// `{ forceKey, nodeKey }`
    Node,
    /// `{ forceKey, nodeKey, actionKey }`
    Action,
    /// `{ fileId }`
    File,
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::String => "string",
            ArgType::LargeString => "large-string",
            ArgType::Number => "number",
            ArgType::Boolean => "boolean",
            ArgType::Dropdown => "dropdown",
            ArgType::Force => "force",
            ArgType::Node => "node",
            ArgType::Action => "action",
            ArgType::File => "file",
        };
        f.write_str(name)
    }
}

/// Condition an [`ArgDependency`] checks on another argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum DependencyCondition {
    /// Other argument equals this value
    Equals(Value),
    /// Other argument is present and truthy
    Truthy,
    /// Other argument is present and not null
    Present,
}

/// "This argument only applies when `arg_id` satisfies `condition`"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgDependency {
    /// Argument the condition looks at
    pub arg_id: String,
    /// Condition on that argument
    pub condition: DependencyCondition,
}

impl ArgDependency {
    /// Depend on `arg_id == value`
    #[inline]
    pub fn equals(arg_id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            arg_id: arg_id.into(),
            condition: DependencyCondition::Equals(value.into()),
        }
    }

    /// Depend on `arg_id` being truthy
    #[inline]
    pub fn truthy(arg_id: impl Into<String>) -> Self {
        Self {
            arg_id: arg_id.into(),
            condition: DependencyCondition::Truthy,
        }
    }

    /// Depend on `arg_id` being present
    #[inline]
    pub fn present(arg_id: impl Into<String>) -> Self {
        Self {
            arg_id: arg_id.into(),
            condition: DependencyCondition::Present,
        }
    }

    /// Evaluate against an argument bag
    #[must_use]
    pub fn is_satisfied(&self, args: &EffectArgs) -> bool {
        let value = args.get(&self.arg_id).filter(|v| !v.is_null());
        match (&self.condition, value) {
            (DependencyCondition::Equals(expected), Some(actual)) => actual == expected,
            (DependencyCondition::Truthy, Some(actual)) => is_truthy(actual),
            (DependencyCondition::Present, Some(_)) => true,
            (_, None) => false,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Schema of one target argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgSpec {
    /// Key in the effect's argument bag
    pub id: String,
    /// Author-facing label
    pub name: String,
    /// Value type
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    /// Whether the script requires it whenever its dependencies hold
    pub required: bool,
    /// Value used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Inclusive lower bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values for dropdowns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// All must hold for the argument to apply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ArgDependency>,
}

impl ArgSpec {
    /// Create an optional argument of `arg_type`
    pub fn new(id: impl Into<String>, arg_type: ArgType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            arg_type,
            required: false,
            default: None,
            min: None,
            max: None,
            options: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set the label
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Mark as required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set the inclusive lower bound
    #[must_use]
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the inclusive upper bound
    #[must_use]
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Set dropdown options
    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Add a dependency
    #[must_use]
    pub fn depends_on(mut self, dependency: ArgDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Whether every dependency holds for `args`
    #[must_use]
    pub fn applies_to(&self, args: &EffectArgs) -> bool {
        self.dependencies.iter().all(|d| d.is_satisfied(args))
    }
}

/// Effect arguments resolved against a target's schema
#[derive(Debug, Clone, PartialEq)]
pub struct TargetArgs {
    values: EffectArgs,
    specs: Arc<[ArgSpec]>,
}

impl TargetArgs {
    /// Fill defaults for absent arguments whose dependencies hold
    ///
    /// Specs are visited in declaration order, so a default may satisfy the
    /// dependency of a later argument.
    #[must_use]
    pub fn resolve(specs: Arc<[ArgSpec]>, mut values: EffectArgs) -> Self {
        for spec in specs.iter() {
            let absent = values.get(&spec.id).map_or(true, Value::is_null);
            if absent && spec.applies_to(&values) {
                if let Some(default) = &spec.default {
                    values.insert(spec.id.clone(), default.clone());
                }
            }
        }
        Self { values, specs }
    }

    /// Raw argument bag
    #[inline]
    #[must_use]
    pub fn values(&self) -> &EffectArgs {
        &self.values
    }

    /// Raw value, `None` when absent or null
    #[inline]
    #[must_use]
    pub fn raw(&self, id: &str) -> Option<&Value> {
        self.values.get(id).filter(|v| !v.is_null())
    }

    /// Declared spec for `id`
    #[must_use]
    pub fn spec(&self, id: &str) -> Option<&ArgSpec> {
        self.specs.iter().find(|s| s.id == id)
    }

    /// Whether `id` currently applies (declared and dependencies hold)
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.spec(id).is_some_and(|s| s.applies_to(&self.values))
    }

    /// Bounded number
    ///
    /// # Errors
    /// Missing, undeclared, non-numeric or out of `[min, max]`
    pub fn number(&self, id: &str) -> Result<f64, ArgumentValidationError> {
        self.optional_number(id)?
            .ok_or_else(|| ArgumentValidationError::Missing(id.to_string()))
    }

    /// Bounded number that may be absent
    ///
    /// # Errors
    /// Undeclared, non-numeric or out of `[min, max]`
    pub fn optional_number(&self, id: &str) -> Result<Option<f64>, ArgumentValidationError> {
        let spec = self.declared(id)?;
        let Some(value) = self.raw(id) else {
            return Ok(None);
        };
        let number = value
            .as_f64()
            .ok_or_else(|| wrong_type(id, ArgType::Number, value))?;

        let below = spec.min.is_some_and(|min| number < min);
        let above = spec.max.is_some_and(|max| number > max);
        if below || above {
            return Err(ArgumentValidationError::OutOfRange {
                arg: id.to_string(),
                value: number,
                min: spec.min,
                max: spec.max,
            });
        }
        Ok(Some(number))
    }

    /// Text
    ///
    /// # Errors
    /// Missing, undeclared or not a string
    pub fn string(&self, id: &str) -> Result<&str, ArgumentValidationError> {
        self.optional_string(id)?
            .ok_or_else(|| ArgumentValidationError::Missing(id.to_string()))
    }

    /// Text that may be absent
    ///
    /// # Errors
    /// Undeclared or not a string
    pub fn optional_string(&self, id: &str) -> Result<Option<&str>, ArgumentValidationError> {
        let spec = self.declared(id)?;
        match self.raw(id) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(wrong_type(id, spec.arg_type, other)),
        }
    }

    /// Boolean; absent optional booleans read as `false`
    ///
    /// # Errors
    /// Undeclared, not a boolean, or absent while required
    pub fn boolean(&self, id: &str) -> Result<bool, ArgumentValidationError> {
        let spec = self.declared(id)?;
        match self.raw(id) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(wrong_type(id, ArgType::Boolean, other)),
            None if spec.required && spec.applies_to(&self.values) => {
                Err(ArgumentValidationError::Missing(id.to_string()))
            }
            None => Ok(false),
        }
    }

    /// Dropdown selection, checked against the declared options
    ///
    /// # Errors
    /// Missing, undeclared, not a string or not an option
    pub fn dropdown(&self, id: &str) -> Result<&str, ArgumentValidationError> {
        let spec = self.declared(id)?;
        let value = self.string(id)?;
        if !spec.options.is_empty() && !spec.options.iter().any(|o| o == value) {
            return Err(ArgumentValidationError::InvalidOption {
                arg: id.to_string(),
                value: value.to_string(),
            });
        }
        Ok(value)
    }

    /// Force reference
    ///
    /// # Errors
    /// Missing, undeclared or not `{ forceKey }`
    pub fn force(&self, id: &str) -> Result<ForceLocator, ArgumentValidationError> {
        self.structured(id, ArgType::Force)
    }

    /// Node reference
    ///
    /// # Errors
    /// Missing, undeclared or not `{ forceKey, nodeKey }`
    pub fn node(&self, id: &str) -> Result<NodeLocator, ArgumentValidationError> {
        self.structured(id, ArgType::Node)
    }

    /// Action reference
    ///
    /// # Errors
    /// Missing, undeclared or not `{ forceKey, nodeKey, actionKey }`
    pub fn action(&self, id: &str) -> Result<ActionLocator, ArgumentValidationError> {
        self.structured(id, ArgType::Action)
    }

    /// File reference; accepts `{ fileId }` or a bare id string
    ///
    /// # Errors
    /// Missing, undeclared or neither shape
    pub fn file(&self, id: &str) -> Result<FileLocator, ArgumentValidationError> {
        if let Some(Value::String(file_id)) = self.raw(id) {
            self.declared(id)?;
            return Ok(FileLocator {
                file_id: file_id.clone(),
            });
        }
        self.structured(id, ArgType::File)
    }

    fn structured<T: DeserializeOwned>(
        &self,
        id: &str,
        expected: ArgType,
    ) -> Result<T, ArgumentValidationError> {
        self.declared(id)?;
        let value = self
            .raw(id)
            .ok_or_else(|| ArgumentValidationError::Missing(id.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|_| wrong_type(id, expected, value))
    }

    fn declared(&self, id: &str) -> Result<&ArgSpec, ArgumentValidationError> {
        self.spec(id)
            .ok_or_else(|| ArgumentValidationError::Undeclared(id.to_string()))
    }
}

fn wrong_type(id: &str, expected: ArgType, found: &Value) -> ArgumentValidationError {
    ArgumentValidationError::WrongType {
        arg: id.to_string(),
        expected,
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn specs() -> Arc<[ArgSpec]> {
        vec![
            ArgSpec::new("operation", ArgType::Dropdown)
                .required()
                .with_options(["award", "deduct"])
                .with_default("award"),
            ArgSpec::new("amount", ArgType::Number)
                .required()
                .with_min(0.0)
                .with_max(100.0),
            ArgSpec::new("reason", ArgType::String)
                .depends_on(ArgDependency::equals("operation", "deduct"))
                .with_default("penalty"),
            ArgSpec::new("notify", ArgType::Boolean),
            ArgSpec::new("forceMetadata", ArgType::Force).required(),
            ArgSpec::new("attachment", ArgType::File),
        ]
        .into()
    }

    fn args(value: Value) -> EffectArgs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn defaults_fill_only_when_dependencies_hold() {
        let resolved = TargetArgs::resolve(specs(), args(json!({ "amount": 5 })));
        assert_eq!(resolved.raw("operation"), Some(&json!("award")));
        assert!(resolved.raw("reason").is_none());
        assert!(!resolved.is_active("reason"));

        let resolved = TargetArgs::resolve(
            specs(),
            args(json!({ "operation": "deduct", "amount": 5 })),
        );
        assert_eq!(resolved.raw("reason"), Some(&json!("penalty")));
        assert!(resolved.is_active("reason"));
    }

    #[test]
    fn number_checks_bounds() {
        let resolved = TargetArgs::resolve(specs(), args(json!({ "amount": 150 })));
        assert!(matches!(
            resolved.number("amount"),
            Err(ArgumentValidationError::OutOfRange { .. })
        ));

        let resolved = TargetArgs::resolve(specs(), args(json!({ "amount": 42.5 })));
        assert_eq!(resolved.number("amount").unwrap(), 42.5);
    }

    #[test]
    fn missing_and_undeclared() {
        let resolved = TargetArgs::resolve(specs(), EffectArgs::new());
        assert_eq!(
            resolved.number("amount"),
            Err(ArgumentValidationError::Missing("amount".into()))
        );
        assert_eq!(
            resolved.number("bogus"),
            Err(ArgumentValidationError::Undeclared("bogus".into()))
        );
        assert!(!resolved.boolean("notify").unwrap());
    }

    #[test]
    fn wrong_type_is_reported() {
        let resolved = TargetArgs::resolve(specs(), args(json!({ "amount": "five" })));
        assert!(matches!(
            resolved.number("amount"),
            Err(ArgumentValidationError::WrongType { expected: ArgType::Number, .. })
        ));
    }

    #[test]
    fn dropdown_rejects_unknown_option() {
        let resolved = TargetArgs::resolve(specs(), args(json!({ "operation": "steal" })));
        assert!(matches!(
            resolved.dropdown("operation"),
            Err(ArgumentValidationError::InvalidOption { .. })
        ));
    }

    #[test]
    fn structured_locators() {
        let resolved = TargetArgs::resolve(
            specs(),
            args(json!({
                "forceMetadata": { "forceKey": "f1" },
                "attachment": "file-7"
            })),
        );
        assert_eq!(resolved.force("forceMetadata").unwrap(), ForceLocator::new("f1"));
        assert_eq!(resolved.file("attachment").unwrap().file_id, "file-7");

        let resolved = TargetArgs::resolve(specs(), args(json!({ "forceMetadata": 3 })));
        assert!(matches!(
            resolved.force("forceMetadata"),
            Err(ArgumentValidationError::WrongType { expected: ArgType::Force, .. })
        ));
    }

    #[test]
    fn truthy_dependency() {
        let dep = ArgDependency::truthy("notify");
        assert!(dep.is_satisfied(&args(json!({ "notify": true }))));
        assert!(!dep.is_satisfied(&args(json!({ "notify": false }))));
        assert!(!dep.is_satisfied(&args(json!({ "notify": null }))));
        assert!(ArgDependency::present("x").is_satisfied(&args(json!({ "x": 0 }))));
    }

    #[test]
    fn spec_serializes_type_field() {
        let spec = ArgSpec::new("amount", ArgType::LargeString);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], json!("large-string"));
        assert!(value.get("default").is_none());
    }
}
