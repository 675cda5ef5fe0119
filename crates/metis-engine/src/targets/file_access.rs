use metis_core::{ArgSpec, ArgType, EffectExecutionContext, Target, TargetError};

pub(super) fn target() -> Target {
    Target::builder("file-access")
        .name("File Access")
        .description("Grants a force access to a mission file, or revokes it")
        .arg(
            ArgSpec::new("fileMetadata", ArgType::File)
                .named("File")
                .required(),
        )
        .arg(
            ArgSpec::new("forceMetadata", ArgType::Force)
                .named("Force")
                .required(),
        )
        .arg(
            ArgSpec::new("access", ArgType::Dropdown)
                .named("Access")
                .required()
                .with_options(["grant", "revoke"])
                .with_default("grant"),
        )
        .sync_script(execute)
}

fn execute(ctx: &EffectExecutionContext) -> Result<(), TargetError> {
    let file = ctx.args().file("fileMetadata")?;
    let force = ctx.args().force("forceMetadata")?;
    match ctx.args().dropdown("access")? {
        "revoke" => ctx.revoke_file_access(&file.file_id, &force)?,
        _ => ctx.grant_file_access(&file.file_id, &force)?,
    };
    Ok(())
}
