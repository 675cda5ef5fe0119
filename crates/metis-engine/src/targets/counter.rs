use super::COUNTERS_KEY;
use metis_core::{ArgDependency, ArgSpec, ArgType, EffectExecutionContext, Target, TargetError};
use serde_json::{json, Value};

pub(super) fn target() -> Target {
    Target::builder("counter")
        .name("Counter")
        .description("Counts occurrences across a session and optionally announces the total")
        .arg(
            ArgSpec::new("counterKey", ArgType::String)
                .named("Counter")
                .with_default("default"),
        )
        .arg(
            ArgSpec::new("increment", ArgType::Number)
                .named("Increment")
                .with_default(1),
        )
        .arg(ArgSpec::new("announce", ArgType::Boolean).named("Announce"))
        .arg(
            ArgSpec::new("forceMetadata", ArgType::Force)
                .named("Announce To")
                .required()
                .depends_on(ArgDependency::truthy("announce")),
        )
        .sync_script(execute)
}

fn execute(ctx: &EffectExecutionContext) -> Result<(), TargetError> {
    let args = ctx.args();
    let key = args.optional_string("counterKey")?.unwrap_or("default");
    let increment = args.optional_number("increment")?.unwrap_or(1.0);

    let mut total = 0.0;
    ctx.store()
        .use_state(COUNTERS_KEY, json!({}))
        .update(|counters| {
            if !counters.is_object() {
                *counters = json!({});
            }
            if let Value::Object(map) = counters {
                let entry = map.entry(key).or_insert(json!(0));
                total = entry.as_f64().unwrap_or(0.0) + increment;
                *entry = json!(total);
            }
        });
    tracing::debug!(effect_id = %ctx.effect().id, counter = key, total, "counter advanced");

    if args.boolean("announce")? {
        let force = args.force("forceMetadata")?;
        ctx.send_output(format!("{key}: {total}"), Some(&force))?;
    }
    Ok(())
}
