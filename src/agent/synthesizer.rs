//! SQL synthesis: question plus schema in, one normalized statement out.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{AgentError, Result};
use crate::llm::{build_sql_prompt, normalize_sql, CompletionRequest, LlmClient};
use crate::schema::SchemaDescriptor;

/// Message of the synthesis failure returned to callers.
pub const NO_SQL_GENERATED: &str = "No SQL generated";

/// Turns a question into a single SQL statement.
#[derive(Clone)]
pub struct SqlSynthesizer {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl SqlSynthesizer {
    /// Creates a synthesizer with the given token budget.
    pub fn new(llm: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// Issues one completion request and normalizes the reply.
    ///
    /// Empty content, before or after normalization, is a synthesis error.
    /// The prompt is never re-issued.
    pub async fn build_sql(&self, question: &str, schema: &SchemaDescriptor) -> Result<String> {
        let prompt = build_sql_prompt(question, schema);
        let request = CompletionRequest::deterministic(prompt, self.max_tokens);

        let start = Instant::now();
        let raw = self.llm.complete(&request).await?;
        let elapsed = start.elapsed();

        let Some(raw) = raw else {
            debug!(?elapsed, "Completion returned no content");
            return Err(AgentError::synthesis(NO_SQL_GENERATED));
        };

        let sql = normalize_sql(&raw).ok_or_else(|| AgentError::synthesis(NO_SQL_GENERATED))?;
        info!(
            model = self.llm.model(),
            ?elapsed,
            raw_len = raw.len(),
            sql_len = sql.len(),
            "SQL synthesized"
        );
        debug!(%sql, "Synthesized SQL");
        Ok(sql)
    }
}
