//! Command-line argument parsing for db-agent.
//!
//! Uses clap derive. CLI values override the environment and the config file.

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Answer natural-language questions over a read-only SQL channel.
#[derive(Parser, Debug)]
#[command(name = "db-agent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, global = true, env = "DB_AGENT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use the in-process mock LLM and database (no credentials needed)
    #[arg(long, global = true)]
    pub mock: bool,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Completion model (overrides config and GROQ_MODEL)
    #[arg(long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Disable the read-only guard (the database procedure still enforces read-only access)
    #[arg(long, global = true)]
    pub no_guard: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP chat server
    Serve {
        /// Address to bind
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short = 'p', long, value_name = "PORT")]
        port: Option<u16>,

        /// Run `SELECT 1` through the database before accepting requests
        #[arg(long)]
        verify: bool,
    },

    /// Answer one question and exit
    Ask {
        /// The question, in plain language
        #[arg(required = true, value_name = "QUESTION")]
        question: Vec<String>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the schema descriptor sent to the model
    Schema {
        /// Only print this table's columns
        #[arg(value_name = "TABLE")]
        table: Option<String>,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies CLI overrides on top of a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if self.mock {
            config.use_mocks();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if self.no_guard {
            config.agent.read_only_guard = false;
        }
        if let Command::Serve { host, port, verify } = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            if *verify {
                config.server.verify_on_startup = true;
            }
        }
    }
}

impl Command {
    /// Returns the question of an `ask` invocation, words joined by spaces.
    pub fn question(&self) -> Option<String> {
        match self {
            Self::Ask { question, .. } => Some(question.join(" ")),
            _ => None,
        }
    }
}
