//! Integration tests for db-agent.

pub mod agent_test;
pub mod config_test;
pub mod server_test;
pub mod supabase_test;
