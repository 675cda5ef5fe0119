use metis_core::{ArgSpec, ArgType, EffectExecutionContext, Target, TargetError};

pub(super) fn target() -> Target {
    Target::builder("node")
        .name("Node Status")
        .description("Opens or closes a node; closing aborts executions below it")
        .arg(
            ArgSpec::new("nodeMetadata", ArgType::Node)
                .named("Node")
                .required(),
        )
        .arg(
            ArgSpec::new("status", ArgType::Dropdown)
                .named("Status")
                .required()
                .with_options(["open", "closed"])
                .with_default("open"),
        )
        .sync_script(execute)
}

fn execute(ctx: &EffectExecutionContext) -> Result<(), TargetError> {
    let node = ctx.args().node("nodeMetadata")?;
    match ctx.args().dropdown("status")? {
        "closed" => ctx.close_node(&node)?,
        _ => ctx.open_node(&node)?,
    };
    Ok(())
}
