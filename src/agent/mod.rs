//! Agent orchestration for db-agent.
//!
//! Coordinates the three stages of a request: synthesis, execution and
//! summarization. Stages run strictly in order and any failure ends the
//! request; there is no partial success.

pub mod summarizer;
pub mod synthesizer;

pub use summarizer::{ResultSummarizer, FALLBACK_SUMMARY};
pub use synthesizer::{SqlSynthesizer, NO_SQL_GENERATED};

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::config::Config;
use crate::db::{self, DatabaseClient};
use crate::error::{AgentError, Result};
use crate::llm::{self, LlmClient};
use crate::query::{QueryExecutor, ResultSet};
use crate::schema::SchemaDescriptor;

/// Default token budget for the synthesis call.
pub const DEFAULT_SQL_MAX_TOKENS: u32 = 500;

/// Default token budget for the summary call.
pub const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 200;

/// Outcome of a successful request.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    /// Natural-language answer.
    pub answer: String,
    /// Rows returned by the database.
    pub data: ResultSet,
    /// The SQL that produced `data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// Reclassifies configuration problems found while building the agent.
fn startup_error(err: AgentError) -> AgentError {
    match err {
        AgentError::Config(msg) => AgentError::Initialization(msg),
        other => other,
    }
}

/// The natural-language query agent.
///
/// Holds only immutable, shareable clients; one instance serves any number of
/// concurrent requests.
#[derive(Clone)]
pub struct Agent {
    schema: Arc<SchemaDescriptor>,
    synthesizer: SqlSynthesizer,
    executor: QueryExecutor,
    summarizer: ResultSummarizer,
    request_timeout: Option<Duration>,
}

impl Agent {
    /// Creates an agent with default settings around the given clients.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        db: Arc<dyn DatabaseClient>,
        schema: SchemaDescriptor,
    ) -> Self {
        AgentBuilder::new(llm, db).schema(schema).build()
    }

    /// Starts a builder around the given clients.
    pub fn builder(llm: Arc<dyn LlmClient>, db: Arc<dyn DatabaseClient>) -> AgentBuilder {
        AgentBuilder::new(llm, db)
    }

    /// Builds the production clients described by `config`.
    ///
    /// Missing credentials or an unreadable schema file fail here as
    /// initialization errors.
    pub fn from_config(config: &Config) -> Result<Self> {
        let schema = config.schema_descriptor().map_err(startup_error)?;
        let llm = llm::create_client(&config.llm, config.retry).map_err(startup_error)?;
        let db = db::connect(&config.database, config.retry).map_err(startup_error)?;
        let model = llm.model().to_string();

        let agent = AgentBuilder::new(llm, db)
            .schema(schema)
            .sql_max_tokens(config.llm.sql_max_tokens)
            .summary_max_tokens(config.llm.summary_max_tokens)
            .read_only_guard(config.agent.read_only_guard)
            .request_timeout(config.agent.request_timeout())
            .build();

        info!(
            model = %model,
            backend = config.database.backend.as_str(),
            tables = agent.schema.tables.len(),
            read_only_guard = agent.executor.guard_enabled(),
            "Agent initialized"
        );
        Ok(agent)
    }

    /// Returns the schema descriptor used for synthesis.
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Answers a question.
    ///
    /// An empty or whitespace-only question fails with a validation error
    /// before any outbound call. Dropping the returned future aborts the
    /// in-flight stage.
    pub async fn ask(&self, question: &str) -> Result<AgentResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AgentError::validation("Question must be a non-empty string"));
        }

        let span = info_span!("ask", question_len = question.len());
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(question))
                .instrument(span)
                .await
                .map_err(|_| {
                    warn!(?limit, "Request deadline exceeded");
                    AgentError::Timeout(limit)
                })?,
            None => self.run(question).instrument(span).await,
        }
    }

    /// Answers a question, aborting every stage when `cancel` fires.
    pub async fn ask_with_cancel(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Request cancelled");
                Err(AgentError::Cancelled)
            }
            result = self.ask(question) => result,
        }
    }

    /// Runs `SELECT 1` through the database channel.
    pub async fn verify(&self) -> Result<()> {
        self.executor.probe().await
    }

    async fn run(&self, question: &str) -> Result<AgentResponse> {
        let start = Instant::now();

        let sql = self.synthesizer.build_sql(question, &self.schema).await?;
        let data = self.executor.run(&sql).await?;
        let answer = self.summarizer.summarize(question, &data).await?;

        info!(rows = data.len(), elapsed = ?start.elapsed(), "Request completed");
        Ok(AgentResponse {
            answer,
            data,
            sql: Some(sql),
        })
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    llm: Arc<dyn LlmClient>,
    db: Arc<dyn DatabaseClient>,
    schema: Option<SchemaDescriptor>,
    sql_max_tokens: u32,
    summary_max_tokens: u32,
    read_only_guard: bool,
    request_timeout: Option<Duration>,
}

impl AgentBuilder {
    /// Creates a builder with default settings.
    pub fn new(llm: Arc<dyn LlmClient>, db: Arc<dyn DatabaseClient>) -> Self {
        Self {
            llm,
            db,
            schema: None,
            sql_max_tokens: DEFAULT_SQL_MAX_TOKENS,
            summary_max_tokens: DEFAULT_SUMMARY_MAX_TOKENS,
            read_only_guard: true,
            request_timeout: None,
        }
    }

    /// Sets the schema descriptor. Defaults to the built-in one.
    pub fn schema(mut self, schema: SchemaDescriptor) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the synthesis token budget.
    pub fn sql_max_tokens(mut self, max_tokens: u32) -> Self {
        self.sql_max_tokens = max_tokens;
        self
    }

    /// Sets the summary token budget.
    pub fn summary_max_tokens(mut self, max_tokens: u32) -> Self {
        self.summary_max_tokens = max_tokens;
        self
    }

    /// Enables or disables the read-only guard.
    pub fn read_only_guard(mut self, enabled: bool) -> Self {
        self.read_only_guard = enabled;
        self
    }

    /// Bounds each request by a deadline.
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let schema = self
            .schema
            .unwrap_or_else(|| SchemaDescriptor::builtin().clone());

        Agent {
            schema: Arc::new(schema),
            synthesizer: SqlSynthesizer::new(self.llm.clone(), self.sql_max_tokens),
            executor: QueryExecutor::new(self.db).with_guard(self.read_only_guard),
            summarizer: ResultSummarizer::new(self.llm, self.summary_max_tokens),
            request_timeout: self.request_timeout,
        }
    }
}
