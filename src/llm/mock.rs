//! Mock LLM client for testing and `--mock` runs.
//!
//! Replies come from a script when one is queued, otherwise from canned
//! responses keyed on the prompt: SQL prompts get a fenced SQL statement,
//! summary prompts get a sentence built from the reported row count.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{AgentError, Result};
use crate::llm::prompt::{QUESTION_MARKER, ROW_COUNT_MARKER};
use crate::llm::types::CompletionRequest;
use crate::llm::LlmClient;

/// Shared, ordered record of outbound calls made by mock clients.
///
/// Handing the same log to the mock LLM and the mock database lets tests
/// assert the order of pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// Returns a snapshot of all entries in call order.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

/// Entry recorded for every mock completion call.
pub const LLM_CALL: &str = "llm.complete";

/// A scripted reply for the next completion call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// The service returns this content.
    Content(String),
    /// The service answers without content.
    Empty,
    /// The call fails with an LLM error carrying this message.
    Fail(String),
}

/// Mock LLM client with scripted and canned responses.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    call_log: CallLog,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into the given shared log.
    pub fn with_call_log(mut self, call_log: CallLog) -> Self {
        self.call_log = call_log;
        self
    }

    /// Queues a reply; queued replies are consumed in order before canned ones.
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Queues a content reply.
    pub fn with_content(self, content: impl Into<String>) -> Self {
        self.with_reply(MockReply::Content(content.into()))
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_scripted(&self) -> Option<MockReply> {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Generates a canned response based on the prompt.
    fn canned_response(prompt: &str) -> Option<String> {
        if let Some((_, question)) = prompt.rsplit_once(QUESTION_MARKER) {
            return Some(Self::canned_sql(&question.to_lowercase()));
        }

        if let Some((_, rest)) = prompt.split_once(ROW_COUNT_MARKER) {
            let rows = rest
                .split_whitespace()
                .next()
                .and_then(|n| n.parse::<usize>().ok())?;
            return Some(if rows == 0 {
                "No data was found for that question.".to_string()
            } else {
                format!("The query returned {} row(s) matching your question.", rows)
            });
        }

        None
    }

    fn canned_sql(question: &str) -> String {
        let sql = if question.contains("unpaid") {
            "SELECT COUNT(*) FROM invoices WHERE status = 'unpaid';"
        } else if question.contains("customer") {
            "SELECT name, email FROM customers ORDER BY created_at DESC LIMIT 50;"
        } else if question.contains("stock") || question.contains("product") {
            "SELECT p.name, SUM(s.qty_change) AS on_hand\nFROM products p\nJOIN stock_ledger s ON s.product_id = p.id\nGROUP BY p.name\nLIMIT 50;"
        } else if question.contains("invoice") {
            "SELECT invoice_number, status, total_amount FROM invoices ORDER BY invoice_date DESC LIMIT 50;"
        } else {
            "SELECT COUNT(*) FROM organizations;"
        };
        format!("```sql\n{}\n```", sql)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>> {
        self.call_log.record(LLM_CALL);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match self.next_scripted() {
            Some(MockReply::Content(content)) => Ok(Some(content)),
            Some(MockReply::Empty) => Ok(None),
            Some(MockReply::Fail(message)) => Err(AgentError::llm(message)),
            None => Ok(Self::canned_response(request.last_user_content())),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}
