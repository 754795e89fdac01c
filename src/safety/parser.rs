//! SQL parsing and read-only classification.
//!
//! Uses sqlparser-rs with the PostgreSQL dialect and walks the AST for
//! anything that writes: non-query statements, data-modifying CTEs,
//! `SELECT ... INTO` and row locking clauses.

use sqlparser::ast::{Query, Select, SetExpr, TableFactor, TableWithJoins};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use super::Verdict;

/// Parses and classifies a SQL string.
pub fn classify_sql(sql: &str) -> Verdict {
    let statements = match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(statements) => statements,
        Err(e) => return Verdict::Unparsed(e.to_string()),
    };

    match statements.as_slice() {
        [] => Verdict::Rejected("empty statement".to_string()),
        [sqlparser::ast::Statement::Query(query)] => match inspect_query(query) {
            None => Verdict::ReadOnly,
            Some(reason) => Verdict::Rejected(reason),
        },
        [statement] => Verdict::Rejected(format!(
            "{} statement",
            leading_keyword(&statement.to_string())
        )),
        many => Verdict::Rejected(format!(
            "expected a single statement, found {}",
            many.len()
        )),
    }
}

/// First keyword of rendered SQL, upper-cased.
fn leading_keyword(rendered: &str) -> String {
    rendered
        .split_whitespace()
        .next()
        .unwrap_or("UNKNOWN")
        .to_uppercase()
}

/// Returns a rejection reason if the query writes or locks anything.
fn inspect_query(query: &Query) -> Option<String> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            if let Some(reason) = inspect_query(&cte.query) {
                return Some(reason);
            }
        }
    }

    if !query.locks.is_empty() {
        return Some("row locking clause (FOR UPDATE/SHARE)".to_string());
    }

    inspect_set_expr(&query.body)
}

fn inspect_set_expr(set_expr: &SetExpr) -> Option<String> {
    match set_expr {
        SetExpr::Select(select) => inspect_select(select),
        SetExpr::Query(query) => inspect_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            inspect_set_expr(left).or_else(|| inspect_set_expr(right))
        }
        SetExpr::Values(_) | SetExpr::Table(_) => None,
        // INSERT/UPDATE (and newer DML variants) nested inside a query.
        #[allow(unreachable_patterns)]
        other => Some(format!(
            "data-modifying {} inside query",
            leading_keyword(&other.to_string())
        )),
    }
}

fn inspect_select(select: &Select) -> Option<String> {
    if select.into.is_some() {
        return Some("SELECT ... INTO creates a table".to_string());
    }

    select.from.iter().find_map(inspect_table_with_joins)
}

fn inspect_table_with_joins(twj: &TableWithJoins) -> Option<String> {
    inspect_table_factor(&twj.relation)
        .or_else(|| twj.joins.iter().find_map(|join| inspect_table_factor(&join.relation)))
}

fn inspect_table_factor(factor: &TableFactor) -> Option<String> {
    match factor {
        TableFactor::Derived { subquery, .. } => inspect_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => inspect_table_with_joins(table_with_joins),
        _ => None,
    }
}
