//! Command-line front end: the presentation surface for the pipeline.
//!
//! `analyze` plays the interactive UI's role headlessly: it issues the
//! compound analyze-all dispatch, polls run-state snapshots at the tick
//! cadence, reports transitions as they land, and prints the final report.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use dealscout_core::cache::ResultCache;
use dealscout_core::clients::ResearchClients;
use dealscout_core::config::{self, ModelConfig, load_workflow_file};
use dealscout_core::pipeline::{Coordinator, RunStatus};
use dealscout_core::workflow::{WorkflowStep, default_workflow};

#[derive(Parser)]
#[command(name = "dealscout", version, about = "Company research assistant")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Research a company and draft an outreach email
    Analyze {
        /// Company URL to research
        url: String,
        /// Use canned offline clients instead of real backends
        #[arg(long)]
        mock: bool,
        /// TOML file overriding the built-in workflow steps
        #[arg(long, value_name = "FILE")]
        workflow: Option<PathBuf>,
        /// Stop after the summary; skip the draft email stage
        #[arg(long)]
        skip_email: bool,
    },
    /// List the workflow steps that would run
    Steps {
        #[arg(long, value_name = "FILE")]
        workflow: Option<PathBuf>,
    },
    /// Inspect or clear the persistent result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Delete every cached result
    Clear,
    /// Print the cache directory and entry count
    Path,
}

pub async fn run(args: Cli) -> Result<()> {
    match args.command {
        Command::Analyze {
            url,
            mock,
            workflow,
            skip_email,
        } => analyze(url, mock, workflow, skip_email).await,
        Command::Steps { workflow } => {
            for (index, step) in load_steps(workflow.as_deref())?.iter().enumerate() {
                println!("{}. {}", index + 1, step.name);
                println!("   query: {}", step.search_query);
                if !step.include_domains.is_empty() {
                    println!("   domains: {}", step.include_domains.join(", "));
                }
            }
            Ok(())
        }
        Command::Cache { command } => cache_command(command),
    }
}

fn load_steps(workflow: Option<&std::path::Path>) -> Result<Vec<WorkflowStep>> {
    match workflow {
        Some(path) => load_workflow_file(path)
            .with_context(|| format!("load workflow from {}", path.display())),
        None => Ok(default_workflow()),
    }
}

fn cache_command(command: CacheCommand) -> Result<()> {
    let cache = ResultCache::open_default().context("open result cache")?;
    match command {
        CacheCommand::Clear => {
            let removed = cache.clear().context("clear result cache")?;
            println!("removed {removed} cached result(s)");
        }
        CacheCommand::Path => {
            println!("{}", cache.location().display());
            println!("{} entrie(s)", cache.entry_count().unwrap_or(0));
        }
    }
    Ok(())
}

async fn analyze(
    url: String,
    mock: bool,
    workflow: Option<PathBuf>,
    skip_email: bool,
) -> Result<()> {
    let steps = load_steps(workflow.as_deref())?;
    let clients = if mock {
        ResearchClients::mock()
    } else {
        let model_config = ModelConfig::from_env();
        ResearchClients::from_env(&model_config).context("construct research clients")?
    };
    let cache = Arc::new(ResultCache::open_default().context("open result cache")?);
    debug!(cache = %config::cache_dir().display(), "cache ready");

    let mut builder = Coordinator::builder(clients, cache, steps);
    if skip_email {
        builder = builder.without_draft_email();
    }
    let coordinator = builder.build();
    coordinator.set_subject(url.trim());

    println!("analyzing {} ...", coordinator.subject());
    coordinator
        .analyze_all()
        .await
        .context("start analysis")?;

    watch_until_settled(&coordinator).await;
    coordinator.reconcile().await;
    print_report(&coordinator, skip_email).await;
    Ok(())
}

/// Poll snapshots and echo every status transition until the pipeline is
/// fully idle.
async fn watch_until_settled(coordinator: &Coordinator) {
    let mut seen: HashMap<String, RunStatus> = HashMap::new();
    loop {
        let snapshot = coordinator.snapshot().await;
        for unit in &snapshot {
            let previous = seen.insert(unit.name.clone(), unit.status);
            if previous != Some(unit.status) && unit.status != RunStatus::Idle {
                println!("  [{}] {:?}", unit.name, unit.status);
            }
        }
        let settled = coordinator.is_settled().await
            && snapshot
                .iter()
                .all(|unit| unit.status != RunStatus::Running && unit.status != RunStatus::Queued);
        if settled {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

async fn print_report(coordinator: &Coordinator, skip_email: bool) {
    println!();
    for unit in coordinator.snapshot().await {
        if skip_email && unit.name == "Draft Email" {
            continue;
        }
        println!("==== {} ====", unit.name);
        match unit.status {
            RunStatus::Done => println!("{}\n", unit.result),
            RunStatus::Failed => println!(
                "(failed: {})\n",
                unit.error.unwrap_or_else(|| "unknown error".to_string())
            ),
            _ => println!("(not run)\n"),
        }
    }
}
