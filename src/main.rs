use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use backoffice::app::App;
use backoffice::backend::{Backend, HttpBackend};
use backoffice::config::Config;
use backoffice::context::{AppContext, Session};
use backoffice::logging;
use backoffice::process::payload::payload_from_pairs;
use backoffice::process::{ActionDispatcher, ProcessAction, ProcessKey, QueueFilter, QueueService};
use backoffice::rest;

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Workflow console for the coworking back office")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Only show workflows of this branch
    #[arg(short, long, global = true)]
    branch: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the workflow queues
    Queue {
        /// Only this process (renewal, payment, invoice, termination, commission, signing)
        #[arg(short, long)]
        process: Option<String>,

        /// Include completed workflows and list every item
        #[arg(short, long)]
        all: bool,
    },

    /// Show one workflow instance with its decision and timeline
    Show {
        process: String,
        entity_id: i64,
    },

    /// Execute an action against one entity
    Exec {
        process: String,
        /// Action code, e.g. RECORD_PAYMENT
        action: String,
        entity_id: i64,

        /// Payload field as key=value (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        param: Vec<String>,
    },

    /// List every available action per process
    Actions,

    /// Start the REST API server
    Api {
        /// Port to listen on (default: 7018)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    // File logging for the TUI, stderr for one-shot commands
    let is_tui_mode = cli.command.is_none();
    let logging_handle = logging::init_logging(&config, is_tui_mode, cli.debug)?;

    match cli.command {
        Some(Commands::Queue { process, all }) => {
            cmd_queue(&config, cli.branch, process, all).await?;
        }
        Some(Commands::Show { process, entity_id }) => {
            cmd_show(&config, &process, entity_id).await?;
        }
        Some(Commands::Exec {
            process,
            action,
            entity_id,
            param,
        }) => {
            cmd_exec(&config, &process, &action, entity_id, &param).await?;
        }
        Some(Commands::Actions) => cmd_actions(),
        Some(Commands::Api { port }) => {
            cmd_api(config, port).await?;
        }
        None => {
            run_tui(config, cli.branch, logging_handle.log_file_path).await?;
        }
    }

    Ok(())
}

fn backend(config: &Config) -> Result<Arc<dyn Backend>> {
    let backend =
        HttpBackend::from_config(&config.backend).context("Failed to create backend client")?;
    Ok(Arc::new(backend))
}

fn parse_process(process: &str) -> Result<ProcessKey> {
    process.parse::<ProcessKey>().map_err(anyhow::Error::msg)
}

async fn run_tui(config: Config, branch: Option<i64>, log_file_path: Option<PathBuf>) -> Result<()> {
    let backend = backend(&config)?;

    let context = AppContext::from_config(&config.ui);
    context.set_selected_branch(branch);
    if let Ok(user) = std::env::var("USER") {
        context.set_session(Some(Session { user, role: None }));
    }

    let filter = QueueFilter::for_branch(branch);
    let mut app = App::new(config, backend, context, filter);
    let result = app.run().await;

    // Print log file path on exit if logs were written
    if let Some(log_path) = log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }

    result
}

async fn cmd_queue(
    config: &Config,
    branch: Option<i64>,
    process: Option<String>,
    all: bool,
) -> Result<()> {
    let processes = match process {
        Some(p) => vec![parse_process(&p)?],
        None => config.kanban.processes.clone(),
    };
    let filter = QueueFilter {
        include_completed: all,
        ..QueueFilter::for_branch(branch)
    };

    let queue = QueueService::new(backend(config)?, &config.kanban);
    let board = queue.fetch_board(&processes, &filter).await;

    for column in &board.columns {
        println!(
            "{} ({} 件, 逾期 {}, 緊急 {})",
            column.title(),
            column.items.len(),
            column.overdue_count(),
            column.urgent_count()
        );
        println!("{}", "─".repeat(60));

        if let Some(ref err) = column.error {
            println!("  載入失敗: {}", err);
            println!();
            continue;
        }
        if column.items.is_empty() {
            println!("  (無待辦)");
        }

        let display_count = if all {
            column.items.len()
        } else {
            10.min(column.items.len())
        };
        for item in column.items.iter().take(display_count) {
            let decision = &item.decision;
            let overdue = decision
                .overdue_warning()
                .map(|w| format!("  {}", w))
                .unwrap_or_default();
            println!(
                "  #{:<6} [{}] {} · {}{}",
                item.entity_id,
                decision.priority.label(),
                item.title,
                decision.blocked_label(item.process),
                overdue
            );
        }
        if !all && column.items.len() > 10 {
            println!(
                "  ... and {} more (use --all to see all)",
                column.items.len() - 10
            );
        }
        println!();
    }

    Ok(())
}

async fn cmd_show(config: &Config, process: &str, entity_id: i64) -> Result<()> {
    let process = parse_process(process)?;
    let queue = QueueService::new(backend(config)?, &config.kanban);

    let Some(item) = queue.fetch_one(process, entity_id).await? else {
        bail!("找不到{} #{}", process.display_name(), entity_id);
    };
    let decision = &item.decision;

    println!("{} #{} {}", process.display_name(), item.entity_id, item.title);
    println!("{}", "─".repeat(60));
    println!("  卡點:     {}", decision.blocked_label(process));
    if let Some(ref next) = decision.next_action {
        println!("  下一步:   {}", next);
    }
    if let Some(ref owner) = decision.owner {
        println!("  負責:     {}", owner.label());
    }
    println!("  優先級:   {}", decision.priority.label());
    if let Some(warning) = decision.overdue_warning() {
        println!("  {}", warning);
    }
    if let Some(primary) = decision.primary_action(process) {
        println!("  主要行動: {} ({})", primary.label, primary.code);
    }

    if !item.timeline.is_empty() {
        println!();
        for step in &item.timeline {
            let details = step
                .details
                .as_deref()
                .map(|d| format!("  {}", d))
                .unwrap_or_default();
            println!("  {} {}{}", step.status.icon(), step.display_label(), details);
        }
    }

    Ok(())
}

async fn cmd_exec(
    config: &Config,
    process: &str,
    action: &str,
    entity_id: i64,
    params: &[String],
) -> Result<()> {
    let pairs = params
        .iter()
        .map(|p| {
            p.split_once('=')
                .with_context(|| format!("Invalid parameter '{}', expected KEY=VALUE", p))
        })
        .collect::<Result<Vec<_>>>()?;
    let payload = payload_from_pairs(pairs);

    let dispatcher = ActionDispatcher::new(backend(config)?);
    let result = dispatcher
        .execute_keys(process, action, entity_id, &payload)
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if let Some(ref nav) = result.navigate {
        println!("Open: {}", config.web_link(&nav.url));
    }
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_actions() {
    for process in ProcessKey::all() {
        println!("{} ({})", process.display_name(), process.as_str());
        for action in ProcessAction::for_process(*process) {
            println!("  {:<22} {}", action.code(), action.label());
        }
        println!();
    }
}

async fn cmd_api(config: Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.api.port);

    println!("Starting REST API server...");
    println!("  Port: {}", port);
    println!("  Endpoints:");
    println!("    GET  /api/v1/health                              Health check");
    println!("    GET  /api/v1/openapi.json                        OpenAPI document");
    println!("    GET  /api/v1/processes                           Action availability map");
    println!("    GET  /api/v1/processes/:process/:id              Workspace");
    println!("    POST /api/v1/processes/:process/actions/:action  Execute action");
    println!("    GET  /api/v1/queue/kanban                        Kanban board");
    println!("    GET  /api/v1/queue/stats                         Header counts");
    println!();

    let state = rest::ApiState::from_config(config)?;
    rest::serve(state, port).await?;

    Ok(())
}
