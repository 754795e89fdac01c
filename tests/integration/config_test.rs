//! Configuration loading integration tests.
//!
//! Checks precedence (CLI > environment > file > defaults) through the
//! public API the binary uses.

use std::collections::HashMap;

use clap::Parser;
use db_agent::agent::Agent;
use db_agent::cli::Cli;
use db_agent::config::Config;
use db_agent::db::DatabaseBackend;
use pretty_assertions::assert_eq;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn test_cli_beats_env_beats_file() {
    let (_dir, path) = write_config(
        r#"
[llm]
model = "from-file"

[server]
port = 5000
"#,
    );
    let env: HashMap<&str, &str> = [("GROQ_MODEL", "from-env"), ("SERVER_PORT", "6000")]
        .into_iter()
        .collect();

    let mut config = Config::load_from_file(&path).unwrap();
    assert_eq!(config.llm.model, "from-file");

    config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));
    assert_eq!(config.llm.model, "from-env");
    assert_eq!(config.server.port, 6000);

    let cli = Cli::parse_from(["db-agent", "serve", "--port", "7000", "--model", "from-cli"]);
    cli.apply_to(&mut config);
    assert_eq!(config.llm.model, "from-cli");
    assert_eq!(config.server.port, 7000);
}

#[test]
fn test_file_only_keeps_defaults_for_missing_sections() {
    let (_dir, path) = write_config("[agent]\nrequest_timeout_secs = 15\n");

    let config = Config::load_from_file(&path).unwrap();

    assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
    assert_eq!(config.database.rpc_function, "execute_sql");
    assert!(config.agent.read_only_guard);
    assert_eq!(config.server.port, 3001);
}

#[test]
fn test_schema_path_in_config() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("schema.toml");
    std::fs::write(
        &schema_path,
        "[[tables]]\nname = \"orders\"\ncolumns = [\"id\"]\n",
    )
    .unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!("[schema]\npath = {:?}\n", schema_path.display().to_string()),
    )
    .unwrap();

    let config = Config::load_from_file(&config_path).unwrap();
    let schema = config.schema_descriptor().unwrap();

    assert_eq!(schema.tables.len(), 1);
    assert!(schema.table("orders").is_some());
}

#[test]
fn test_empty_schema_file_is_config_error() {
    let (_dir, path) = write_config("currency = \"USD\"\n");
    let mut config = Config::default();
    config.schema.path = Some(path);

    let err = config.schema_descriptor().unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
}

#[test]
fn test_agent_from_config_requires_credentials() {
    let mut config = Config::default();
    config.database.backend = DatabaseBackend::Mock;

    let err = Agent::from_config(&config).err().unwrap();
    assert!(err.to_string().contains("GROQ_API_KEY"));
    assert_eq!(err.category(), "Initialization Error");

    config.llm.api_key = Some("gsk-test".to_string());
    config.database.backend = DatabaseBackend::Supabase;
    let err = Agent::from_config(&config).err().unwrap();
    assert!(err.to_string().contains("SUPABASE_URL"));

    config.database.url = Some("https://xyz.supabase.co".to_string());
    config.database.key = Some("service-role".to_string());
    assert!(Agent::from_config(&config).is_ok());
}
