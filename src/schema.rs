//! Schema descriptor for the query agent.
//!
//! A hand-maintained summary of the queryable tables and the global query
//! rules. It is not derived from the live catalog, so it can drift from the
//! real database; execution errors caused by drift are surfaced to callers.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{AgentError, Result};

/// Version of the built-in descriptor. Bump when the table list changes.
pub const BUILTIN_SCHEMA_VERSION: u32 = 1;

const BUILTIN_TABLES: &[(&str, &[&str])] = &[
    (
        "organizations",
        &["id", "name", "gstin", "country", "address", "settings", "created_at"],
    ),
    (
        "organization_users",
        &["id", "organization_id", "user_id", "role", "status", "created_at"],
    ),
    (
        "customers",
        &[
            "id",
            "organization_id",
            "name",
            "email",
            "phone",
            "billing_address",
            "gstin",
            "created_at",
        ],
    ),
    (
        "vendors",
        &[
            "id",
            "organization_id",
            "name",
            "email",
            "phone",
            "address",
            "gstin",
            "created_at",
        ],
    ),
    (
        "product_categories",
        &["id", "organization_id", "name", "parent_id", "created_at"],
    ),
    (
        "products",
        &[
            "id",
            "organization_id",
            "name",
            "sku",
            "sales_price",
            "purchase_price",
            "tax_rate",
            "uom",
            "category_id",
            "reorder_level",
            "created_at",
        ],
    ),
    (
        "warehouses",
        &["id", "organization_id", "name", "code", "is_default", "created_at"],
    ),
    (
        "invoices",
        &[
            "id",
            "organization_id",
            "invoice_number",
            "customer_id",
            "invoice_date",
            "status",
            "subtotal",
            "total_tax",
            "total_amount",
            "created_by",
            "created_at",
        ],
    ),
    (
        "invoice_items",
        &[
            "id",
            "invoice_id",
            "product_id",
            "quantity",
            "unit_price",
            "tax_rate",
            "line_total",
        ],
    ),
    (
        "bills",
        &[
            "id",
            "organization_id",
            "bill_number",
            "vendor_id",
            "bill_date",
            "status",
            "subtotal",
            "total_tax",
            "total_amount",
            "created_by",
            "created_at",
        ],
    ),
    (
        "bill_items",
        &[
            "id",
            "bill_id",
            "product_id",
            "quantity",
            "unit_price",
            "line_total",
        ],
    ),
    (
        "stock_ledger",
        &[
            "id",
            "organization_id",
            "product_id",
            "warehouse_id",
            "qty_change",
            "unit_cost",
            "reference_type",
            "created_at",
        ],
    ),
];

/// Static description of the queryable tables and query rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Descriptor version, for tracking edits alongside migrations.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Database schema namespace the tables live in.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Currency every monetary column is expressed in.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Row cap applied when the question does not ask for a specific limit.
    #[serde(default = "default_row_limit")]
    pub default_row_limit: u32,

    /// Queryable tables.
    #[serde(default)]
    pub tables: Vec<TableSpec>,
}

/// One queryable table and its key columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl TableSpec {
    /// Creates a table description.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

fn default_version() -> u32 {
    BUILTIN_SCHEMA_VERSION
}

fn default_namespace() -> String {
    "public".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_row_limit() -> u32 {
    50
}

impl SchemaDescriptor {
    /// Returns the process-wide built-in descriptor for the invoicing database.
    pub fn builtin() -> &'static SchemaDescriptor {
        static BUILTIN: OnceLock<SchemaDescriptor> = OnceLock::new();
        BUILTIN.get_or_init(|| SchemaDescriptor {
            version: BUILTIN_SCHEMA_VERSION,
            namespace: default_namespace(),
            currency: default_currency(),
            default_row_limit: default_row_limit(),
            tables: BUILTIN_TABLES
                .iter()
                .map(|(name, columns)| TableSpec::new(*name, columns.iter().copied()))
                .collect(),
        })
    }

    /// Loads a descriptor from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::config(format!(
                "Failed to read schema file {}: {e}",
                path.display()
            ))
        })?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let descriptor: Self = toml::from_str(content).map_err(|e| {
            AgentError::config(format!("Schema error in {}:\n  {}", path.display(), e))
        })?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Checks that the descriptor is usable in a prompt.
    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(AgentError::config("Schema descriptor lists no tables"));
        }
        if let Some(table) = self.tables.iter().find(|t| t.name.trim().is_empty()) {
            return Err(AgentError::config(format!(
                "Schema descriptor has a table with an empty name (columns: {})",
                table.columns.join(", ")
            )));
        }
        if self.default_row_limit == 0 {
            return Err(AgentError::config("default_row_limit must be at least 1"));
        }
        Ok(())
    }

    /// Returns the table with the given name, if described.
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Renders the descriptor as the text block embedded in prompts.
    pub fn format_for_llm(&self) -> String {
        let table_lines = self
            .tables
            .iter()
            .map(|table| format!("- {} ({})\n", table.name, table.columns.join(", ")))
            .collect::<String>();

        format!(
            "PostgreSQL schema ({}):\n{}All monetary amounts are in {} (numeric). Use only SELECT. Limit to {} rows if not specified.\n",
            self.namespace, table_lines, self.currency, self.default_row_limit
        )
    }
}
