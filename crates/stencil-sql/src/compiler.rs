//! SQL statement compilation.
//!
//! Both modes produce statement text with PostgreSQL positional parameters
//! (`$1`, `$2`, ...) and an ordered list of typed values to bind. No value
//! supplied at run time ever becomes part of the statement text.
//!
//! - **GUI mode** builds `SELECT ... FROM ... [WHERE] [ORDER BY] [LIMIT]`
//!   from a table and columns that must exist in the schema snapshot.
//! - **Raw mode** keeps the authored SQL verbatim and rewrites its `@name`
//!   tokens into positional parameters.

use serde::Serialize;
use std::collections::BTreeMap;

use stencil_core::{
    CurrentUser, GuiQuery, InputField, LimitValue, RawQuery, SqlOperator, SqlQueryConfig,
};
use stencil_policy::{FieldValidator, TypedValue, ValidatedFields};
use stencil_template::{BatchResolver, PlaceholderValues, Template};

use crate::error::SqlCompileError;
use crate::scanner::scan;
use crate::schema::{ColumnSchema, DatabaseSchema, TableSchema};

/// Everything needed to compile one SQL App run.
#[derive(Debug, Clone, Copy)]
pub struct SqlCompileRequest<'a> {
    pub query: &'a SqlQueryConfig,
    /// The App's declared inputs.
    pub inputs: &'a [InputField],
    /// Raw values keyed by input label.
    pub values: &'a BTreeMap<String, String>,
    pub current_user: &'a CurrentUser,
    /// Schema snapshot of the target database. Required by GUI mode.
    pub schema: Option<&'a DatabaseSchema>,
}

/// A named value bound to one positional parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParameter {
    pub name: String,
    pub value: TypedValue,
}

/// Parameterized statement ready for a driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledStatement {
    pub statement_text: String,
    /// `parameters[i]` binds to `$i+1`.
    pub parameters: Vec<BoundParameter>,
}

impl CompiledStatement {
    pub fn values(&self) -> impl Iterator<Item = &TypedValue> {
        self.parameters.iter().map(|p| &p.value)
    }
}

/// Compiles SQL Apps into [`CompiledStatement`]s.
#[derive(Debug, Clone, Default)]
pub struct SqlCompiler {
    validator: FieldValidator,
}

impl SqlCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(
        &self,
        request: SqlCompileRequest<'_>,
    ) -> Result<CompiledStatement, SqlCompileError> {
        let validated = self
            .validator
            .validate_by_label(request.inputs, request.values)?;

        let mut values = PlaceholderValues::new().with_current_user(request.current_user);
        values.extend(validated.rendered_by_label());

        let compiled = match request.query {
            SqlQueryConfig::Gui(query) => compile_gui(query, &values, request.schema)?,
            SqlQueryConfig::Raw(query) => compile_raw(query, &values, &validated)?,
        };

        tracing::debug!(
            mode = request.query.mode(),
            statement = %compiled.statement_text,
            params = compiled.parameters.len(),
            "Compiled SQL statement"
        );

        Ok(compiled)
    }
}

/// A filter with its identifiers checked and its value still templated.
struct CheckedFilter<'q> {
    column: &'q ColumnSchema,
    operator: SqlOperator,
    value: Option<&'q str>,
}

fn compile_gui(
    query: &GuiQuery,
    values: &PlaceholderValues,
    schema: Option<&DatabaseSchema>,
) -> Result<CompiledStatement, SqlCompileError> {
    let schema = schema.ok_or(SqlCompileError::SchemaUnavailable)?;
    let table_name = query
        .table
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(SqlCompileError::MissingTable)?;
    let table = schema
        .get_table(table_name)
        .ok_or_else(|| SqlCompileError::UnknownTable(table_name.to_string()))?;

    let select_list = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query
            .columns
            .iter()
            .map(|c| column(table, c).map(ColumnSchema::sql_name))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ")
    };

    let mut filters = Vec::with_capacity(query.filters.len());
    for filter in &query.filters {
        let value = if filter.operator.takes_value() {
            let value = filter.value.as_deref().ok_or_else(|| {
                SqlCompileError::MissingFilterValue {
                    column: filter.column.clone(),
                }
            })?;
            Some(value)
        } else {
            None
        };
        filters.push(CheckedFilter {
            column: column(table, &filter.column)?,
            operator: filter.operator,
            value,
        });
    }

    let mut order_by = Vec::with_capacity(query.order_by.len());
    for order in &query.order_by {
        let col = column(table, &order.column)?;
        order_by.push(format!("{} {}", col.sql_name(), order.direction.as_sql()));
    }

    let limit = query.limit.as_ref().map(parse_limit).transpose()?;

    // Resolve every filter value before reporting, so all missing
    // placeholders surface together.
    let mut resolver = BatchResolver::new(values);
    let resolved: Vec<Option<String>> = filters
        .iter()
        .map(|f| f.value.map(|v| resolver.resolve(v)))
        .collect();
    resolver.finish()?;

    let mut parameters = Vec::new();
    let mut predicates = Vec::with_capacity(filters.len());
    for (filter, value) in filters.iter().zip(resolved) {
        let col_sql = filter.column.sql_name();
        let Some(value) = value else {
            predicates.push(format!("{} {}", col_sql, filter.operator.as_sql()));
            continue;
        };

        if filter.operator.is_list() {
            let items: Vec<&str> = value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .collect();
            if items.is_empty() {
                return Err(SqlCompileError::EmptyList {
                    column: filter.column.name.clone(),
                });
            }
            let mut slots = Vec::with_capacity(items.len());
            for item in items {
                parameters.push(filter_parameter(filter, item)?);
                slots.push(format!("${}", parameters.len()));
            }
            predicates.push(format!(
                "{} {} ({})",
                col_sql,
                filter.operator.as_sql(),
                slots.join(", ")
            ));
        } else {
            parameters.push(filter_parameter(filter, &value)?);
            predicates.push(format!(
                "{} {} ${}",
                col_sql,
                filter.operator.as_sql(),
                parameters.len()
            ));
        }
    }

    let mut statement_text = format!("SELECT {} FROM {}", select_list, table.sql_name());
    if !predicates.is_empty() {
        statement_text.push_str(" WHERE ");
        statement_text.push_str(&predicates.join(" AND "));
    }
    if !order_by.is_empty() {
        statement_text.push_str(" ORDER BY ");
        statement_text.push_str(&order_by.join(", "));
    }
    if let Some(limit) = limit {
        statement_text.push_str(&format!(" LIMIT {}", limit));
    }

    Ok(CompiledStatement {
        statement_text,
        parameters,
    })
}

fn column<'t>(table: &'t TableSchema, name: &str) -> Result<&'t ColumnSchema, SqlCompileError> {
    table
        .get_column(name)
        .ok_or_else(|| SqlCompileError::UnknownColumn {
            table: table.qualified_name(),
            column: name.to_string(),
        })
}

fn filter_parameter(
    filter: &CheckedFilter<'_>,
    raw: &str,
) -> Result<BoundParameter, SqlCompileError> {
    let value = match filter.operator {
        // Patterns are text whatever the column type.
        SqlOperator::Like | SqlOperator::ILike => TypedValue::Text(raw.to_string()),
        _ => filter.column.kind().coerce(raw).map_err(|message| {
            SqlCompileError::InvalidParameter {
                name: filter.column.name.clone(),
                message,
            }
        })?,
    };
    Ok(BoundParameter {
        name: filter.column.name.clone(),
        value,
    })
}

fn parse_limit(limit: &LimitValue) -> Result<u64, SqlCompileError> {
    match limit {
        LimitValue::Number(n) => {
            u64::try_from(*n).map_err(|_| SqlCompileError::InvalidLimit(n.to_string()))
        }
        LimitValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Err(SqlCompileError::InvalidLimit(text.clone()));
            }
            trimmed
                .parse::<u64>()
                .map_err(|_| SqlCompileError::InvalidLimit(text.clone()))
        }
    }
}

fn compile_raw(
    query: &RawQuery,
    values: &PlaceholderValues,
    validated: &ValidatedFields,
) -> Result<CompiledStatement, SqlCompileError> {
    if query.raw_sql.trim().is_empty() {
        return Err(SqlCompileError::EmptyStatement);
    }

    let scanned = scan(&query.raw_sql);

    let mut declared: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for param in &query.raw_sql_params {
        let name = param.key.trim().trim_start_matches('@');
        declared.entry(name).or_default().push(param.value.as_str());
    }

    for name in declared.keys() {
        if !scanned.names.iter().any(|n| n == name) {
            tracing::debug!(param = %name, "Dropping parameter not referenced by the statement");
        }
    }

    let unbound: Vec<String> = scanned
        .names
        .iter()
        .filter(|n| !declared.contains_key(n.as_str()))
        .cloned()
        .collect();

    let mut resolver = BatchResolver::new(values);
    let mut pending = Vec::with_capacity(scanned.names.len());
    for name in &scanned.names {
        let Some(templates) = declared.get(name.as_str()) else {
            continue;
        };
        let parsed: Vec<Template> = templates.iter().map(|t| Template::parse(t)).collect();
        let rendered: Vec<String> = parsed.iter().map(|t| resolver.render(t)).collect();
        pending.push((name, parsed, rendered));
    }
    resolver.finish()?;

    if !unbound.is_empty() {
        return Err(SqlCompileError::UnboundParameter(unbound));
    }

    let mut parameters = Vec::with_capacity(pending.len());
    for (name, parsed, rendered) in pending {
        if rendered.windows(2).any(|w| w[0] != w[1]) {
            return Err(SqlCompileError::AmbiguousParameter(name.clone()));
        }
        let value = parsed[0]
            .single_placeholder()
            .and_then(|label| validated.get_by_label(label))
            .cloned()
            .unwrap_or_else(|| TypedValue::Text(rendered[0].clone()));
        parameters.push(BoundParameter {
            name: name.clone(),
            value,
        });
    }

    Ok(CompiledStatement {
        statement_text: scanned.text,
        parameters,
    })
}
