use metis_core::{
    ArgSpec, ArgType, DefinitionError, EffectArgs, EffectExecutionContext, Target, TargetError,
    TargetMigrationRegistry,
};
use serde_json::{json, Value};

pub(super) fn target() -> Result<Target, DefinitionError> {
    let migrations = TargetMigrationRegistry::new().register("0.2.0", modifier_to_operation)?;

    Ok(Target::builder("resource-pool")
        .name("Resource Pool")
        .description("Awards resources to or deducts them from a force")
        .arg(
            ArgSpec::new("operation", ArgType::Dropdown)
                .named("Operation")
                .required()
                .with_options(["award", "deduct"])
                .with_default("award"),
        )
        .arg(
            ArgSpec::new("amount", ArgType::Number)
                .named("Amount")
                .required()
                .with_min(0.0),
        )
        .arg(
            ArgSpec::new("forceMetadata", ArgType::Force)
                .named("Force")
                .required(),
        )
        .migrations(migrations)
        .sync_script(execute))
}

/// `0.2.0`: the signed `modifier` became an unsigned `amount` plus an operation
fn modifier_to_operation(mut args: EffectArgs) -> Result<EffectArgs, String> {
    let Some(modifier) = args.remove("modifier") else {
        args.entry("operation").or_insert_with(|| json!("award"));
        return Ok(args);
    };
    let number = modifier
        .as_f64()
        .ok_or_else(|| format!("modifier `{modifier}` is not a number"))?;

    let (operation, amount) = if number < 0.0 {
        let magnitude = match modifier.as_i64() {
            Some(whole) => json!(whole.unsigned_abs()),
            None => json!(-number),
        };
        ("deduct", magnitude)
    } else {
        ("award", modifier)
    };
    args.insert("operation".into(), Value::from(operation));
    args.insert("amount".into(), amount);
    Ok(args)
}

fn execute(ctx: &EffectExecutionContext) -> Result<(), TargetError> {
    let args = ctx.args();
    let amount = args.number("amount")?;
    let force = args.force("forceMetadata")?;
    let signed = match args.dropdown("operation")? {
        "deduct" => -amount,
        _ => amount,
    };
    ctx.modify_resource_pool(signed, &force)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(value: Value) -> EffectArgs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn positive_modifier_becomes_award() {
        let migrated = modifier_to_operation(bag(json!({
            "modifier": 5,
            "forceMetadata": { "forceKey": "f1" }
        })))
        .unwrap();
        assert_eq!(
            migrated,
            bag(json!({
                "operation": "award",
                "amount": 5,
                "forceMetadata": { "forceKey": "f1" }
            }))
        );
    }

    #[test]
    fn negative_modifier_becomes_deduct() {
        let migrated = modifier_to_operation(bag(json!({ "modifier": -3 }))).unwrap();
        assert_eq!(migrated["operation"], json!("deduct"));
        assert_eq!(migrated["amount"], json!(3));
    }

    #[test]
    fn current_shape_is_left_alone() {
        let input = bag(json!({ "operation": "deduct", "amount": 2 }));
        assert_eq!(modifier_to_operation(input.clone()).unwrap(), input);
    }

    #[test]
    fn non_numeric_modifier_fails() {
        assert!(modifier_to_operation(bag(json!({ "modifier": "lots" }))).is_err());
    }
}
