//! Prompt construction for the two completion calls.
//!
//! The synthesis prompt embeds the schema descriptor; the summary prompt only
//! ever carries the question and the row count, never row data.

use crate::schema::SchemaDescriptor;

/// Text preceding the question in the synthesis prompt.
pub const QUESTION_MARKER: &str = "User question: ";

/// Text preceding the row count in the summary prompt.
pub const ROW_COUNT_MARKER: &str = "The query returned ";

const SQL_PROMPT_TEMPLATE: &str = r#"You are a SQL expert. Given the following schema, write a single PostgreSQL SELECT query for the user question. Return ONLY the SQL, no markdown, no explanation.

{schema}
{question_marker}{question}"#;

/// Builds the synthesis prompt for a question.
pub fn build_sql_prompt(question: &str, schema: &SchemaDescriptor) -> String {
    SQL_PROMPT_TEMPLATE
        .replace("{schema}", &schema.format_for_llm())
        .replace("{question_marker}", QUESTION_MARKER)
        .replace("{question}", question)
}

/// Builds the summary prompt from the question and the result's row count.
pub fn build_summary_prompt(question: &str, row_count: usize) -> String {
    format!(
        "The user asked: \"{question}\"\n\n{ROW_COUNT_MARKER}{row_count} row(s). Summarize the result in 1-3 short sentences. If empty, say no data was found."
    )
}
