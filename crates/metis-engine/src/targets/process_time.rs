use metis_core::{ArgSpec, ArgType, EffectExecutionContext, Target, TargetArgs, TargetError};

pub(super) fn target() -> Target {
    Target::builder("process-time")
        .name("Process Time")
        .description("Lengthens or shortens the time an action takes to process")
        .arg(
            ArgSpec::new("processTimeHours", ArgType::Number)
                .named("Hours")
                .with_min(-24.0)
                .with_max(24.0)
                .with_default(0),
        )
        .arg(
            ArgSpec::new("processTimeMinutes", ArgType::Number)
                .named("Minutes")
                .with_min(-59.0)
                .with_max(59.0)
                .with_default(0),
        )
        .arg(
            ArgSpec::new("processTimeSeconds", ArgType::Number)
                .named("Seconds")
                .with_min(-59.0)
                .with_max(59.0)
                .with_default(0),
        )
        .arg(
            ArgSpec::new("actionMetadata", ArgType::Action)
                .named("Action")
                .required(),
        )
        .sync_script(execute)
}

#[allow(clippy::cast_possible_truncation)]
fn delta_ms(args: &TargetArgs) -> Result<i64, TargetError> {
    let hours = args.optional_number("processTimeHours")?.unwrap_or(0.0);
    let minutes = args.optional_number("processTimeMinutes")?.unwrap_or(0.0);
    let seconds = args.optional_number("processTimeSeconds")?.unwrap_or(0.0);
    // Bounds above keep this far inside i64.
    Ok(((hours * 3600.0 + minutes * 60.0 + seconds) * 1000.0).round() as i64)
}

fn execute(ctx: &EffectExecutionContext) -> Result<(), TargetError> {
    let delta = delta_ms(ctx.args())?;
    let action = ctx.args().action("actionMetadata")?;
    ctx.modify_process_time(delta, &action)
}
