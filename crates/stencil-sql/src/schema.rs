//! Database schema snapshots.
//!
//! GUI queries may only name tables and columns that appear in a snapshot
//! produced by schema introspection. Snapshots are stored as JSON, one file
//! per resource.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use stencil_policy::TypedValue;

/// Schema information for a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Tables keyed by qualified name (`schema.table`, or `table`).
    pub tables: BTreeMap<String, TableSchema>,
}

impl DatabaseSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the schema.
    pub fn add_table(&mut self, table: TableSchema) {
        self.tables.insert(table.qualified_name(), table);
    }

    /// Look up a table by qualified or bare name.
    ///
    /// A bare name matches when exactly one schema holds a table of that name.
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        if let Some(table) = self.tables.get(name) {
            return Some(table);
        }
        let mut matches = self.tables.values().filter(|t| t.name == name);
        match (matches.next(), matches.next()) {
            (Some(table), None) => Some(table),
            _ => None,
        }
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Schema information for a database table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,

    /// Schema name (e.g., "public").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    pub columns: Vec<ColumnSchema>,

    #[serde(default)]
    pub primary_key: Vec<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    pub fn add_column(&mut self, column: ColumnSchema) {
        self.columns.push(column);
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Quoted SQL reference, e.g. `"public"."users"`.
    pub fn sql_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }
}

/// Schema information for a database column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,

    /// SQL data type as reported by the database.
    pub data_type: String,

    #[serde(default = "default_nullable")]
    pub nullable: bool,

    #[serde(default)]
    pub is_primary_key: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            is_primary_key: false,
        }
    }

    /// Value kind used to coerce filter values bound to this column.
    pub fn kind(&self) -> ColumnKind {
        let dt = self.data_type.to_lowercase();

        if dt.contains("[]") || dt.contains("array") {
            ColumnKind::Text
        } else if matches!(
            dt.as_str(),
            "smallint" | "integer" | "bigint" | "int" | "int2" | "int4" | "int8"
        ) || dt.contains("serial")
        {
            ColumnKind::Integer
        } else if dt.contains("numeric")
            || dt.contains("decimal")
            || dt.contains("float")
            || dt.contains("double")
            || dt.contains("real")
            || dt.contains("money")
        {
            ColumnKind::Numeric
        } else if dt.contains("bool") {
            ColumnKind::Boolean
        } else if dt == "date" {
            ColumnKind::Date
        } else {
            // text, varchar, uuid, timestamp, json, etc. are bound as text
            ColumnKind::Text
        }
    }

    pub fn sql_name(&self) -> String {
        quote_ident(&self.name)
    }
}

/// Coarse column type used for parameter coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Numeric,
    Boolean,
    Date,
    Text,
}

impl ColumnKind {
    /// Coerce resolved text into a value of this kind.
    pub fn coerce(&self, raw: &str) -> Result<TypedValue, String> {
        let trimmed = raw.trim();
        match self {
            ColumnKind::Integer => match trimmed.parse::<i64>() {
                Ok(_) => Ok(TypedValue::Integer(trimmed.to_string())),
                Err(_) => Err(format!("'{}' is not an integer", raw)),
            },
            ColumnKind::Numeric => BigDecimal::from_str(trimmed)
                .map(TypedValue::Decimal)
                .map_err(|_| format!("'{}' is not a number", raw)),
            ColumnKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "t" => Ok(TypedValue::Boolean(true)),
                "false" | "f" => Ok(TypedValue::Boolean(false)),
                _ => Err(format!("'{}' is not a boolean", raw)),
            },
            ColumnKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(TypedValue::Date)
                .map_err(|_| format!("'{}' is not a date (YYYY-MM-DD)", raw)),
            ColumnKind::Text => Ok(TypedValue::Text(raw.to_string())),
        }
    }
}

/// Quote an identifier for PostgreSQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
