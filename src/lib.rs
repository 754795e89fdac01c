//! db-agent - answers natural-language questions about a business database.
//!
//! A request flows through three stages: the completion service writes one
//! SELECT statement for the question, a single read-only database procedure
//! runs it, and the completion service summarizes the row count. The HTTP
//! server and the CLI are thin shells over [`agent::Agent`].

pub mod agent;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod query;
pub mod retry;
pub mod safety;
pub mod schema;
pub mod server;
