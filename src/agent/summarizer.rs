//! Result summarization: a short answer built from the question and row count.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::llm::{build_summary_prompt, CompletionRequest, LlmClient};
use crate::query::ResultSet;

/// Answer used when the completion service returns no summary text.
pub const FALLBACK_SUMMARY: &str = "No summary generated.";

/// Produces the natural-language answer for a result set.
#[derive(Clone)]
pub struct ResultSummarizer {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl ResultSummarizer {
    /// Creates a summarizer with the given token budget.
    pub fn new(llm: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// Summarizes `rows` for `question`. Row data never leaves the process.
    ///
    /// Empty content degrades to [`FALLBACK_SUMMARY`]; transport failures are errors.
    pub async fn summarize(&self, question: &str, rows: &ResultSet) -> Result<String> {
        let prompt = build_summary_prompt(question, rows.len());
        let request = CompletionRequest::deterministic(prompt, self.max_tokens);

        let answer = self
            .llm
            .complete(&request)
            .await?
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        match answer {
            Some(answer) => {
                info!(rows = rows.len(), answer_len = answer.len(), "Result summarized");
                Ok(answer)
            }
            None => {
                debug!("Completion returned no summary; using fallback");
                Ok(FALLBACK_SUMMARY.to_string())
            }
        }
    }
}
