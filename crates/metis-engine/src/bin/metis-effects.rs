//! `metis-effects`: run effect batches from the command line

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use metis_core::{EffectTrigger, SessionHandle, TargetEnvironmentRegistry};
use metis_engine::{
    logging, targets, EffectEngine, EngineConfig, InMemorySession, Scenario, ScenarioPersistence,
};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("metis-effects")
        .version(metis_engine::VERSION)
        .about("Run METIS effect batches against an in-memory session")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration (TOML)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(Command::new("targets").about("List installed environments and targets"))
        .subcommand(
            Command::new("run")
                .about("Execute one trigger batch of a scenario")
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Scenario file: {\"session\": ..., \"effects\": [...]}"),
                )
                .arg(
                    Arg::new("trigger")
                        .long("trigger")
                        .default_value("execution-success")
                        .value_parser(value_parser!(EffectTrigger))
                        .help("execution-initiation, execution-success or execution-failure"),
                )
                .arg(
                    Arg::new("write-back")
                        .long("write-back")
                        .action(ArgAction::SetTrue)
                        .help("Save migrated effect arguments into the scenario file"),
                ),
        );

    let matches = cli.get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    logging::init(&config.log_filter, matches.get_flag("json-logs"));

    let registry = Arc::new(TargetEnvironmentRegistry::new());
    targets::install_builtin(&registry)?;

    match matches.subcommand() {
        Some(("targets", _)) => {
            for environment in registry.environments() {
                println!("{} {} ({})", environment.id(), environment.version(), environment.name());
                for target in environment.targets() {
                    let args: Vec<&str> = target.args().iter().map(|a| a.id.as_str()).collect();
                    println!(
                        "  {:<16} v{:<8} [{}]",
                        target.id(),
                        target.current_version(),
                        args.join(", ")
                    );
                }
            }
        }
        Some(("run", args)) => {
            let path = args
                .get_one::<PathBuf>("scenario")
                .context("--scenario is required")?;
            let trigger = args
                .get_one::<EffectTrigger>("trigger")
                .copied()
                .unwrap_or(EffectTrigger::ExecutionSuccess);

            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read scenario `{}`", path.display()))?;
            let mut scenario = Scenario::from_json_str(&text)
                .with_context(|| format!("invalid scenario `{}`", path.display()))?;

            let write_back = args.get_flag("write-back");
            let persistence = Arc::new(ScenarioPersistence::new(scenario.effects.clone()));
            let config = if write_back {
                config.with_persist_migrations(true)
            } else {
                config
            };
            let engine = EffectEngine::with_persistence(config, registry, persistence.clone());
            let in_memory = Arc::new(
                InMemorySession::new(scenario.session.clone())
                    .with_tracker(Arc::clone(engine.tracker())),
            );
            let session: Arc<dyn SessionHandle> = in_memory.clone();

            engine.start_session(session.as_ref()).await;
            let report = engine.execute_trigger(&scenario.effects, trigger, &session).await;
            engine.end_session(session.as_ref()).await;

            let output = serde_json::json!({
                "trigger": trigger,
                "outcomes": report.summaries(),
                "session": in_memory.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);

            if write_back {
                let migrated = persistence.persisted();
                if migrated > 0 {
                    scenario.effects = persistence.effects();
                    std::fs::write(path, scenario.to_json_string()?).with_context(|| {
                        format!("failed to write scenario `{}`", path.display())
                    })?;
                }
                tracing::info!(migrated, "scenario effects written back");
            }

            if report.failed() > 0 {
                std::process::exit(1);
            }
        }
        _ => {}
    }
    Ok(())
}

