// src/lib.rs

pub mod archive;
pub mod classify;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod fire;
pub mod fs;
pub mod layout;
pub mod logging;
pub mod oracle;
pub mod plan;
pub mod template;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveReport, OutputArchiver};
use crate::classify::FailureClassifier;
use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate};
use crate::dispatch::{CancelToken, DispatchSummary, Dispatcher, ProcessLauncher, StepLauncher};
use crate::fire::{FireQuery, load_fires, write_fires};
use crate::fs::{FileSystem, RealFileSystem};
use crate::layout::Layout;
use crate::oracle::CompletionOracle;
use crate::plan::RunPlan;
use crate::template::{ArtifactRegistry, Materializer};

/// What to do with the selected fires.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub query: FireQuery,
    /// Build and print the plan, launch nothing.
    pub plan_only: bool,
    pub archive: bool,
    pub cleanup: bool,
}

impl RunOptions {
    pub fn from_args(args: &CliArgs, cfg: &ConfigFile) -> Self {
        Self {
            query: FireQuery {
                states: args.states.clone(),
                fire_ids: args.fireids.clone(),
                max_fires: Some(cfg.limits.max_fires),
            },
            plan_only: args.plan,
            archive: !args.no_archive,
            cleanup: args.cleanup,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub plan: RunPlan,
    /// `None` when only the plan was requested.
    pub dispatch: Option<DispatchSummary>,
    pub archive: Option<ArchiveReport>,
}

/// High-level entry point used by `main.rs`.
///
/// This wires together config loading, CLI overrides, the process launcher
/// and Ctrl-C handling, then hands over to [`execute`].
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;
    apply_overrides(&mut cfg, &args);

    let options = RunOptions::from_args(&args, &cfg);

    let script = if args.dry_run {
        cfg.scripts.test.clone()
    } else {
        cfg.scripts.run.clone()
    };
    let launcher = ProcessLauncher::new(&cfg.scripts.shell, &script)
        .with_working_dir(&cfg.paths.home_dir);

    // Ctrl-C -> stop handing out slots and kill running steps.
    let (cancel_tx, cancel) = CancelToken::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        eprintln!("interrupt received; stopping after running steps are killed");
        let _ = cancel_tx.send(true);
    });

    let report = execute(&cfg, &options, launcher, cancel).await?;

    if options.plan_only {
        print_plan(&report.plan, &cfg.scripts.shell, &script);
        return Ok(());
    }
    if let Some(summary) = &report.dispatch {
        summary.print();
    }
    if let Some(archive) = &report.archive {
        archive.print();
    }
    println!("Done!");
    Ok(())
}

/// CLI limits win over the config file.
pub fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(n) = args.threads {
        cfg.limits.max_workers = n.max(1);
    }
    if let Some(n) = args.max_fires {
        cfg.limits.max_fires = n;
    }
    if let Some(n) = args.num_days {
        cfg.limits.max_days = n;
    }
    debug!(limits = ?cfg.limits, "effective limits");
}

/// Select fires, materialize their configs, dispatch every step, then
/// archive the output.
///
/// Only configuration problems (missing fire table, missing master
/// template, unreadable config) are returned as errors; step failures end
/// up in the [`DispatchSummary`].
pub async fn execute<L>(
    cfg: &ConfigFile,
    options: &RunOptions,
    launcher: L,
    cancel: CancelToken,
) -> Result<RunReport>
where
    L: StepLauncher + 'static,
{
    let fires = load_fires(&cfg.paths.fires_csv, &options.query)?;
    info!(fires = fires.len(), "selected fires");
    if let Err(err) = write_fires(&cfg.paths.filtered_csv, &fires) {
        warn!(path = ?cfg.paths.filtered_csv, error = %err, "could not write filtered fire table");
    }

    let layout = Layout::from_config(cfg);
    let materializer = Materializer::new(layout);
    materializer.check_masters()?;

    let mut registry = ArtifactRegistry::new();
    let plan = RunPlan::build(&fires, &materializer, cfg.limits.max_days, &mut registry)?;

    if options.plan_only {
        if options.cleanup {
            registry.cleanup()?;
        }
        return Ok(RunReport {
            plan,
            dispatch: None,
            archive: None,
        });
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let oracle = Arc::new(CompletionOracle::from_config(cfg, Arc::clone(&fs))?);
    let classifier = Arc::new(FailureClassifier::from_config(&cfg.diagnostics, fs)?);

    let dispatcher = Dispatcher::new(launcher, oracle, classifier, cfg.limits.max_workers)
        .with_step_timeout(cfg.dispatch.step_timeout);
    let summary = dispatcher.run(plan.clone(), cancel).await;

    let archive = if options.archive && !summary.interrupted {
        let archiver = OutputArchiver::new(
            &cfg.paths.scratch_dir,
            &cfg.paths.archive_dir,
            &cfg.archive.prefix,
        );
        Some(archiver.archive()?)
    } else {
        debug!(interrupted = summary.interrupted, "archive skipped");
        None
    };

    if options.cleanup {
        registry.cleanup()?;
    }

    Ok(RunReport {
        plan,
        dispatch: Some(summary),
        archive,
    })
}

/// Print fires, steps and the command line each step would run.
fn print_plan(plan: &RunPlan, shell: &str, script: &std::path::Path) {
    println!("wildfire-wrf plan");
    println!("fires ({}), steps ({}):", plan.len(), plan.total_steps());
    for fire in plan.fires() {
        println!("  - {}", fire.fire_id());
        for step in fire.steps() {
            println!("      {:<12} {} {}", step.display_name(), shell, step.launch_args(script).join(" "));
            println!("      {:<12} log: {}", "", step.log_path.display());
        }
    }
}
