use metis_core::{ArgSpec, ArgType, EffectExecutionContext, Target, TargetError, TargetScript};
use std::time::Duration;

pub(super) fn target() -> Target {
    Target::builder("delay")
        .name("Delay")
        .description("Holds the batch for a fixed time before later effects run")
        .arg(time_arg("delayTimeHours", "Hours", 24.0))
        .arg(time_arg("delayTimeMinutes", "Minutes", 59.0))
        .arg(time_arg("delayTimeSeconds", "Seconds", 59.0))
        .script(DelayScript)
}

fn time_arg(id: &str, name: &str, max: f64) -> ArgSpec {
    ArgSpec::new(id, ArgType::Number)
        .named(name)
        .with_min(0.0)
        .with_max(max)
        .with_default(0)
}

struct DelayScript;

#[async_trait::async_trait]
impl TargetScript for DelayScript {
    async fn execute(&self, ctx: &EffectExecutionContext) -> Result<(), TargetError> {
        let args = ctx.args();
        let hours = args.optional_number("delayTimeHours")?.unwrap_or(0.0);
        let minutes = args.optional_number("delayTimeMinutes")?.unwrap_or(0.0);
        let seconds = args.optional_number("delayTimeSeconds")?.unwrap_or(0.0);
        let total = Duration::from_secs_f64(hours * 3600.0 + minutes * 60.0 + seconds);

        tracing::debug!(
            effect_id = %ctx.effect().id,
            delay_ms = total.as_millis(),
            "delaying batch"
        );
        ctx.sleep(total).await
    }
}
