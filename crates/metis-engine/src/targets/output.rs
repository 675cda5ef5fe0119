use metis_core::{ArgSpec, ArgType, EffectExecutionContext, OutputKind, Target, TargetError};

pub(super) fn target() -> Target {
    Target::builder("output")
        .name("Output Message")
        .description("Sends a message to a force's output panel, or to every force")
        .arg(
            ArgSpec::new("message", ArgType::LargeString)
                .named("Message")
                .required(),
        )
        .arg(
            ArgSpec::new("kind", ArgType::Dropdown)
                .named("Kind")
                .with_options(["info", "success", "failure"])
                .with_default("info"),
        )
        .arg(ArgSpec::new("forceMetadata", ArgType::Force).named("Force"))
        .sync_script(execute)
}

fn execute(ctx: &EffectExecutionContext) -> Result<(), TargetError> {
    let args = ctx.args();
    let message = args.string("message")?;
    let kind = match args.dropdown("kind")? {
        "success" => OutputKind::Success,
        "failure" => OutputKind::Failure,
        _ => OutputKind::Info,
    };
    let force = match args.raw("forceMetadata") {
        Some(_) => Some(args.force("forceMetadata")?),
        None => None,
    };
    ctx.send_output_kind(kind, message, force.as_ref())
}
