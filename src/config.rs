//! Configuration management for db-agent.
//!
//! Handles loading configuration from a TOML file and environment variables.
//! Precedence, highest first: CLI flags, environment, config file, defaults.

use crate::db::DatabaseBackend;
use crate::error::{AgentError, Result};
use crate::llm::groq::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::llm::LlmProvider;
use crate::retry::RetryPolicy;
use crate::schema::SchemaDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Database RPC settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Pipeline settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Retry policy for transport failures of outbound calls.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Schema descriptor override.
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// Completion service configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "groq" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name used for both completion calls.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL override (any OpenAI-compatible endpoint).
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key. Usually supplied through `GROQ_API_KEY` instead.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Token budget for the SQL synthesis call.
    #[serde(default = "default_sql_max_tokens")]
    pub sql_max_tokens: u32,

    /// Token budget for the summary call.
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_sql_max_tokens() -> u32 {
    500
}

fn default_summary_max_tokens() -> u32 {
    200
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            sql_max_tokens: default_sql_max_tokens(),
            summary_max_tokens: default_summary_max_tokens(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("sql_max_tokens", &self.sql_max_tokens)
            .field("summary_max_tokens", &self.summary_max_tokens)
            .finish()
    }
}

impl LlmConfig {
    /// Parses the configured provider.
    pub fn provider(&self) -> Result<LlmProvider> {
        self.provider.parse().map_err(AgentError::config)
    }

    /// Returns the API key or a fail-fast configuration error.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AgentError::config("GROQ_API_KEY is not set"))
    }
}

/// Database RPC configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database backend: "supabase" or "mock".
    #[serde(default)]
    pub backend: DatabaseBackend,

    /// Project endpoint URL (e.g., https://xyz.supabase.co).
    #[serde(default)]
    pub url: Option<String>,

    /// Access key sent as `apikey` and bearer token.
    #[serde(default)]
    pub key: Option<String>,

    /// Name of the stored function that executes read-only SQL.
    #[serde(default = "default_rpc_function")]
    pub rpc_function: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rpc_function() -> String {
    "execute_sql".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            url: None,
            key: None,
            rpc_function: default_rpc_function(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("rpc_function", &self.rpc_function)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    /// Returns the validated endpoint URL or a fail-fast configuration error.
    pub fn require_url(&self) -> Result<Url> {
        let raw = self
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AgentError::config("SUPABASE_URL is not set"))?;

        let url = Url::parse(raw.trim())
            .map_err(|e| AgentError::config(format!("Invalid database URL '{}': {e}", raw)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AgentError::config(format!(
                "Invalid scheme '{}' in database URL. Expected 'http' or 'https'",
                url.scheme()
            )));
        }

        Ok(url)
    }

    /// Returns the access key or a fail-fast configuration error.
    pub fn require_key(&self) -> Result<&str> {
        self.key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AgentError::config("SUPABASE_SERVICE_ROLE_KEY is not set"))
    }

    /// Returns the stored function name, rejecting anything that is not a plain identifier.
    pub fn require_rpc_function(&self) -> Result<&str> {
        let name = self.rpc_function.as_str();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(name)
        } else {
            Err(AgentError::config(format!(
                "Invalid rpc_function '{}': expected a plain identifier",
                name
            )))
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Run the syntactic read-only guard before executing SQL.
    #[serde(default = "default_true")]
    pub read_only_guard: bool,

    /// Deadline for a whole request (all three stages), in seconds.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            read_only_guard: true,
            request_timeout_secs: None,
        }
    }
}

impl AgentConfig {
    /// Returns the request deadline, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Run a `SELECT 1` through the RPC channel before accepting requests.
    #[serde(default)]
    pub verify_on_startup: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            verify_on_startup: false,
        }
    }
}

/// Schema descriptor source.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchemaConfig {
    /// TOML file replacing the built-in descriptor.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db-agent")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AgentError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            AgentError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies process environment variables over the file values.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies environment values from the given lookup over the file values.
    ///
    /// Recognized: `GROQ_API_KEY`, `GROQ_MODEL`, `SUPABASE_URL`
    /// (or `NEXT_PUBLIC_SUPABASE_URL`), `SUPABASE_SERVICE_ROLE_KEY`
    /// (or `NEXT_PUBLIC_SUPABASE_PUBLISHABLE_KEY`), `SERVER_PORT`, `DB_AGENT_BACKEND`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_set = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
        };

        if let Some(key) = first_set(&["GROQ_API_KEY"]) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = first_set(&["GROQ_MODEL"]) {
            self.llm.model = model;
        }
        if let Some(url) = first_set(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]) {
            self.database.url = Some(url);
        }
        if let Some(key) = first_set(&[
            "SUPABASE_SERVICE_ROLE_KEY",
            "NEXT_PUBLIC_SUPABASE_PUBLISHABLE_KEY",
        ]) {
            self.database.key = Some(key);
        }
        if let Some(port) = first_set(&["SERVER_PORT"]).and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(name) = first_set(&["DB_AGENT_BACKEND"]) {
            match DatabaseBackend::parse(&name) {
                Some(backend) => self.database.backend = backend,
                None => warn!(backend = %name, "Ignoring unknown DB_AGENT_BACKEND"),
            }
        }
    }

    /// Switches both collaborators to the in-process mocks.
    pub fn use_mocks(&mut self) {
        self.llm.provider = LlmProvider::Mock.as_str().to_string();
        self.database.backend = DatabaseBackend::Mock;
    }

    /// Returns the schema descriptor: the configured file, or the built-in one.
    pub fn schema_descriptor(&self) -> Result<SchemaDescriptor> {
        match &self.schema.path {
            Some(path) => SchemaDescriptor::load_from_file(path),
            None => Ok(SchemaDescriptor::builtin().clone()),
        }
    }
}
