//! db-agent - natural-language questions answered from a read-only database.

use db_agent::agent::Agent;
use db_agent::cli::{Cli, Command};
use db_agent::config::Config;
use db_agent::error::{AgentError, Result};
use db_agent::logging;
use db_agent::server::{self, models::ChatResponse};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[actix_web::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Could not load .env: {e}");
        }
    }

    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match &cli.command {
        Command::Serve { .. } => {
            let state = server::initialize_state(&config).await;
            server::run_server(&config, state).await
        }
        Command::Ask { json, .. } => {
            let question = cli.command.question().unwrap_or_default();
            ask(&config, &question, *json).await
        }
        Command::Schema { table: None } => {
            print!("{}", config.schema_descriptor()?.format_for_llm());
            Ok(())
        }
        Command::Schema { table: Some(name) } => {
            let schema = config.schema_descriptor()?;
            let table = schema
                .table(name)
                .ok_or_else(|| AgentError::validation(format!("Unknown table: {name}")))?;
            println!("{} ({})", table.name, table.columns.join(", "));
            Ok(())
        }
    }
}

/// Loads configuration with precedence: CLI > environment > file > defaults.
fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());

    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env();
    cli.apply_to(&mut config);
    Ok(config)
}

async fn ask(config: &Config, question: &str, json: bool) -> Result<()> {
    let agent = Agent::from_config(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling request");
            on_interrupt.cancel();
        }
    });

    let response = agent.ask_with_cancel(question, &cancel).await?;

    if json {
        let body = serde_json::to_string_pretty(&ChatResponse::from(response))
            .map_err(|e| AgentError::internal(format!("Failed to encode response: {e}")))?;
        println!("{body}");
        return Ok(());
    }

    println!("{}", response.answer);
    if let Some(sql) = &response.sql {
        println!("\nSQL: {sql}");
    }
    println!("\n{} row(s)", response.data.len());
    let columns = response.data.columns();
    if !columns.is_empty() {
        println!("{}", columns.join(" | "));
    }
    for row in response.data.rows() {
        println!("{row}");
    }
    Ok(())
}
