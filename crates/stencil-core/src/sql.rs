//! SQL query configuration of an App.

use serde::{Deserialize, Serialize};

use crate::app::TemplatedCollection;

/// A query either assembled from table/column picks or written as raw SQL
/// with `@name` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SqlQueryConfig {
    Gui(GuiQuery),
    Raw(RawQuery),
}

impl SqlQueryConfig {
    pub fn mode(&self) -> &'static str {
        match self {
            SqlQueryConfig::Gui(_) => "gui",
            SqlQueryConfig::Raw(_) => "raw",
        }
    }
}

/// Named table/column query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuiQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Empty selects every column.
    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default)]
    pub filters: Vec<SqlFilter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitValue>,

    #[serde(default)]
    pub order_by: Vec<SqlOrderBy>,
}

/// Raw SQL text with `@name` parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuery {
    #[serde(default)]
    pub raw_sql: String,

    /// Keys name the `@name` tokens; values are templates.
    #[serde(default)]
    pub raw_sql_params: TemplatedCollection,
}

/// A single WHERE predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlFilter {
    pub column: String,
    pub operator: SqlOperator,
    /// Templated value. Ignored by `IS NULL` / `IS NOT NULL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "ILIKE")]
    ILike,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
}

impl SqlOperator {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlOperator::Eq => "=",
            SqlOperator::NotEq => "!=",
            SqlOperator::Gt => ">",
            SqlOperator::GtEq => ">=",
            SqlOperator::Lt => "<",
            SqlOperator::LtEq => "<=",
            SqlOperator::In => "IN",
            SqlOperator::NotIn => "NOT IN",
            SqlOperator::Like => "LIKE",
            SqlOperator::ILike => "ILIKE",
            SqlOperator::IsNull => "IS NULL",
            SqlOperator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Whether the operator takes a value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, SqlOperator::IsNull | SqlOperator::IsNotNull)
    }

    /// Whether the value is a comma-separated list.
    pub fn is_list(&self) -> bool {
        matches!(self, SqlOperator::In | SqlOperator::NotIn)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlOrderBy {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Row limit as authored: a number, or text that must hold one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimitValue {
    Number(i64),
    Text(String),
}
