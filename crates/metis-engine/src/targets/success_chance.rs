use metis_core::{ArgSpec, ArgType, EffectExecutionContext, Target, TargetError};

pub(super) fn target() -> Target {
    Target::builder("success-chance")
        .name("Success Chance")
        .description("Raises or lowers an action's chance of success, in percentage points")
        .arg(
            ArgSpec::new("successChance", ArgType::Number)
                .named("Success Chance (%)")
                .required()
                .with_min(-100.0)
                .with_max(100.0),
        )
        .arg(
            ArgSpec::new("actionMetadata", ArgType::Action)
                .named("Action")
                .required(),
        )
        .sync_script(execute)
}

fn execute(ctx: &EffectExecutionContext) -> Result<(), TargetError> {
    let percent = ctx.args().number("successChance")?;
    let action = ctx.args().action("actionMetadata")?;
    ctx.modify_success_chance(percent / 100.0, &action)
}
