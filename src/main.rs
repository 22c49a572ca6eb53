use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use testpulse_core::assistant::runner::ask;
use testpulse_core::assistant::PollTiming;
use testpulse_core::{ApiClient, AssistantSession, Config, DateRange, TaskRunner};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const DEFAULT_LOG_DIRECTIVE: &str = "testpulse=info,testpulse_core=info";

#[derive(Parser)]
#[command(name = "testpulse")]
#[command(version, about = "Test execution dashboard with an AI assistant")]
struct Cli {
    /// Backend base URL (overrides config and TESTPULSE_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Project to open first
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Days of history to show
    #[arg(short, long, global = true)]
    days: Option<u32>,

    /// Log filter directive, e.g. "testpulse=debug"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the assistant a question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// List known projects
    Projects,
    /// Per-project execution rollup for the date range
    Summary {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn env_filter(log_level: Option<&str>) -> EnvFilter {
    let filter = match log_level {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    };
    filter.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

/// The TUI owns the terminal, so logs go to a file next to the config.
fn init_file_logging(log_level: Option<&str>) -> Result<()> {
    let dir = Config::config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("testpulse.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_logging(log_level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        let mut config = Config::default();
        config.apply_env();
        config
    });

    if let Some(api_base) = &cli.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(project) = &cli.project {
        config.default_project = Some(project.clone());
    }
    if let Some(days) = cli.days {
        config.range_days = days;
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        None => {
            init_file_logging(cli.log_level.as_deref())?;
            let config = load_config(&cli);
            tracing::info!("testpulse v{} starting (api {})", env!("CARGO_PKG_VERSION"), config.api_base);
            run_tui(config).await
        }
        Some(command) => {
            init_stderr_logging(cli.log_level.as_deref());
            let config = load_config(&cli);
            match command {
                Commands::Ask { question } => ask_question(&config, question).await,
                Commands::Projects => list_projects(&config).await,
                Commands::Summary { json } => print_summary(&config, *json).await,
            }
        }
    }
}

async fn run_tui(config: Config) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let (mut app, assistant_rx) = App::new(config, events.sender());
    events.spawn_readers(assistant_rx);
    app.request_projects();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    app.shutdown();
    tui::restore()?;
    tracing::info!("testpulse exiting");
    result
}

async fn ask_question(config: &Config, question: &str) -> Result<()> {
    let api = ApiClient::new(&config.api_base);
    let (mut runner, mut events) = TaskRunner::channel(Arc::new(api));
    let mut session = AssistantSession::new().with_timing(PollTiming {
        initial_delay: config.initial_poll_delay(),
        interval: config.poll_interval(),
    });

    if ask(&mut session, &mut runner, &mut events, question).await.is_none() {
        bail!("Question is empty");
    }
    println!("{}", final_answer(&session)?);
    Ok(())
}

/// The last bot message, or an error when the session ended on a failure so
/// the process exits non-zero.
fn final_answer(session: &AssistantSession) -> Result<String> {
    match session.messages().last() {
        Some(message) if message.is_failure() => bail!("{}", message.text),
        Some(message) => Ok(message.text.clone()),
        None => bail!("No answer received"),
    }
}

async fn list_projects(config: &Config) -> Result<()> {
    let api = ApiClient::new(&config.api_base);
    let projects = api
        .projects()
        .await
        .with_context(|| format!("Could not reach {}", api.base_url()))?;

    if projects.is_empty() {
        println!("No projects found");
    }
    for project in projects {
        let marker = if config.default_project.as_ref() == Some(&project) { "*" } else { " " };
        println!("{marker} {project}");
    }
    Ok(())
}

async fn print_summary(config: &Config, json: bool) -> Result<()> {
    let api = ApiClient::new(&config.api_base);
    let range = DateRange::last_days(config.range_days);
    let stats = api
        .summary(&range)
        .await
        .with_context(|| format!("Could not reach {}", api.base_url()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", range.label());
    println!("{:<30} {:>10} {:>12} {:>10}", "PROJECT", "RUNS", "AVG (s)", "PASS %");
    for row in stats {
        println!(
            "{:<30} {:>10} {:>12.2} {:>10.1}",
            row.project, row.executions, row.avg_duration, row.pass_rate
        );
    }
    Ok(())
}
