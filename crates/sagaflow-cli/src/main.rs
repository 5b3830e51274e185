//! sagaflow - run the app deletion / transfer workflows against a seeded
//! in-memory store, with optional fault and latency injection.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sagaflow_core::app::{Console, ConsoleBuilder, ConsoleError};
use sagaflow_core::config::WorkflowConfig;
use sagaflow_core::domain::{
    App, AppRef, AssociationOptions, BranchConfiguration, BranchStatus, MUST_BE_ORG_ADMIN,
    Permission, StoreError, TeamAppAssociation, TeamKey, WorkflowRun,
};
use sagaflow_core::impls::{CallKind, Fault, InMemoryResourceStore, TracingEventSink};
use sagaflow_core::saga::CancelToken;

#[derive(Parser)]
#[command(name = "sagaflow")]
#[command(about = "Compensable app deletion and transfer workflows", long_about = None)]
#[command(version)]
struct Cli {
    /// Workflow configuration (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Owner of the seeded app
    #[arg(long, default_value = "alice", global = true)]
    owner: String,

    /// Name of the seeded app
    #[arg(long, default_value = "mobile", global = true)]
    app: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Disassociate every team, then delete the app
    Delete {
        /// Number of teams associated with the app
        #[arg(short, long, default_value = "3")]
        teams: usize,

        /// Fail the delete call with this status
        #[arg(long, value_name = "STATUS")]
        fail_delete: Option<u16>,

        /// Fail the disassociation of team N (1-based)
        #[arg(long, value_name = "N")]
        fail_team: Option<usize>,

        /// Latency of every disassociation call
        #[arg(long, default_value = "0")]
        latency_ms: u64,
    },
    /// Transfer the app to another owner and rebuild its CI state
    Transfer {
        /// Destination owner name
        #[arg(short, long)]
        to: String,

        /// Number of configured branches
        #[arg(short, long, default_value = "2")]
        branches: usize,

        /// Seed the app without any build setup
        #[arg(long, conflicts_with = "branches")]
        unconfigured: bool,

        /// Reject the transfer because the caller is not an org admin
        #[arg(long)]
        require_admin: bool,

        /// Fail the transfer call with this status
        #[arg(long, value_name = "STATUS", conflicts_with = "require_admin")]
        fail_transfer: Option<u16>,

        /// Leave this branch configured but without stored configuration
        #[arg(long, value_name = "BRANCH", conflicts_with = "unconfigured")]
        fail_branch: Option<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn team(n: usize) -> TeamKey {
    TeamKey::new("acme", format!("team-{n}"))
}

fn log_cache(console: &Console<InMemoryResourceStore>) {
    let apps: Vec<String> = console
        .cached_apps()
        .iter()
        .map(|app| app.app_ref().to_string())
        .collect();
    info!(?apps, "console cache");
}

fn print_run(run: &WorkflowRun) -> Result<()> {
    let rendered = serde_json::to_string_pretty(run).context("failed to render run record")?;
    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = match &cli.config {
        Some(path) => WorkflowConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => WorkflowConfig::default(),
    };
    info!(?config, "configuration loaded");

    let app = App::new("app-1", cli.owner.as_str(), cli.app.as_str());
    let app_ref = app.app_ref();
    let mut store = InMemoryResourceStore::new().with_app(app.clone());

    let result = match cli.command {
        Commands::Delete {
            teams,
            fail_delete,
            fail_team,
            latency_ms,
        } => {
            let associations: Vec<_> = (1..=teams)
                .map(|n| {
                    TeamAppAssociation::new(
                        team(n),
                        app_ref.clone(),
                        AssociationOptions::new(Permission::Developer),
                    )
                })
                .collect();
            for association in &associations {
                store = store.with_association(
                    association.team.clone(),
                    &app_ref,
                    association.options.clone(),
                );
            }
            if latency_ms > 0 {
                store = store.with_latency(
                    CallKind::Disassociate,
                    None,
                    Duration::from_millis(latency_ms),
                );
            }
            if let Some(status) = fail_delete {
                store = store.with_fault(Fault::on(
                    CallKind::DeleteApp,
                    StoreError::new(status, "injected delete failure"),
                ));
            }
            if let Some(n) = fail_team {
                store = store.with_fault(
                    Fault::on(
                        CallKind::Disassociate,
                        StoreError::new(500, "injected disassociation failure"),
                    )
                    .for_team(team(n)),
                );
            }

            let console = ConsoleBuilder::new()
                .store(Arc::new(store))
                .event_sink(Arc::new(TracingEventSink))
                .config(config)
                .build()?;
            console.load_app(app);
            let result = console
                .delete_app(&app_ref, &associations, CancelToken::new())
                .await;
            log_cache(&console);
            result
        }
        Commands::Transfer {
            to,
            branches,
            unconfigured,
            require_admin,
            fail_transfer,
            fail_branch,
        } => {
            if !unconfigured {
                let mut names: Vec<_> = (1..=branches).map(|n| format!("branch-{n}")).collect();
                if let Some(branch) = &fail_branch {
                    if !names.contains(branch) {
                        names.push(branch.clone());
                    }
                }
                let mut statuses: Vec<_> = names
                    .iter()
                    .map(|name| BranchStatus::new(name.as_str(), true))
                    .collect();
                statuses.push(BranchStatus::new("scratch", false));
                store = store.with_branches(&app_ref, statuses);
                // A configured branch without stored configuration fails with 404.
                for name in names.iter().filter(|n| Some(*n) != fail_branch.as_ref()) {
                    store = store
                        .with_branch_configuration(&app_ref, BranchConfiguration::new(name.as_str()));
                }
            }
            if require_admin {
                store = store.with_fault(Fault::on(
                    CallKind::TransferOwnership,
                    StoreError::forbidden("organization admin required")
                        .with_code(MUST_BE_ORG_ADMIN),
                ));
            } else if let Some(status) = fail_transfer {
                store = store.with_fault(Fault::on(
                    CallKind::TransferOwnership,
                    StoreError::new(status, "injected transfer failure"),
                ));
            }
            let console = ConsoleBuilder::new()
                .store(Arc::new(store))
                .event_sink(Arc::new(TracingEventSink))
                .config(config)
                .build()?;
            console.load_app(app);
            let result = console
                .transfer_app(&app_ref, &to, CancelToken::new())
                .await;
            let moved = AppRef::new(to.as_str(), app_ref.app_name.as_str());
            if let Some(state) = console.ci_state(&moved) {
                info!(app = %moved, branches = state.branches.len(), "ci state rehydrated");
            }
            log_cache(&console);
            result
        }
    };

    match result {
        Ok(run) => {
            print_run(&run)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(ConsoleError::Workflow { run, source }) => {
            print_run(&run)?;
            eprintln!("error: {source}");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}
