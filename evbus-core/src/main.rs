//! src/main.rs
//! Runs the demo scene twice (load, reload) against one registry

use std::{
    panic::PanicHookInfo,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use tracing::{error, info};

use evbus_core::{
    EventRegistry, LoggerBuilder, Singletons,
    config::Config,
    demo::{EventLog, Scene},
};

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    log_level: Option<String>,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut cli = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config requires a path")?;
                    cli.config = Some(PathBuf::from(path));
                }

                "--log-level" => {
                    cli.log_level = Some(args.next().context("--log-level requires a level")?);
                }

                other => bail!("Unknown argument: {other}"),
            }
        }

        Ok(cli)
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = CliArgs::parse(std::env::args().skip(1))?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            // No subscriber yet: config.rs log lines are dropped until `build`
            let path = Config::config_path()?;
            if let Some(notice) = first_run_notice(&path) {
                eprintln!("{notice}");
            }
            Config::load().await.context("Failed to load config")?
        }
    };

    let mut logger = LoggerBuilder::new().with_config(config.logging.clone());
    if let Some(level) = &cli.log_level {
        logger = logger.with_level(level);
    }
    let _guard = logger.build().await.context("Failed to initialize logging")?;

    setup_panic_handler();
    info!("Starting evbus demo");

    let registry = Arc::new(EventRegistry::new());
    let singletons = Arc::new(Singletons::new());
    let scene = Scene::new(
        Arc::clone(&registry),
        Arc::clone(&singletons),
        config.demo.clone(),
    );

    for pass in ["load", "reload"] {
        let report = scene
            .run()
            .with_context(|| format!("Demo scene {pass} failed"))?;

        info!(
            pass,
            activated = ?report.activated,
            received = report.received.len(),
            invocations = report.stats.invocations,
            "Scene pass complete"
        );
    }

    let total = singletons.instance::<EventLog>().len();
    info!(events = total, registry = ?registry, "Demo finished");

    registry.clear();
    singletons.teardown_all();

    tokio::time::sleep(config.demo.flush_delay).await;
    info!("Application exited cleanly");
    Ok(())
}

fn first_run_notice(path: &Path) -> Option<String> {
    (!path.exists()).then(|| format!("evbus: writing default config to {}", path.display()))
}

fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        error!("Application panicked: {}", panic_info);
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_cli_parsing() {
        let cli = parse(&["--config", "demo.toml", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("demo.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));

        let cli = parse(&[]).unwrap();
        assert!(cli.config.is_none());

        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn test_first_run_notice_only_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let notice = first_run_notice(&path).unwrap();
        assert!(notice.contains("config.toml"));

        std::fs::write(&path, "").unwrap();
        assert!(first_run_notice(&path).is_none());
    }
}
