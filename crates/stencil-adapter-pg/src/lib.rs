//! PostgreSQL executor for compiled SQL statements.
//!
//! Statements arrive with `$n` placeholders and typed values; every value is
//! bound through the driver. Row-returning statements are wrapped so the
//! database renders each row with `to_jsonb`, and the response is a JSON
//! array of row objects.

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::types::BigDecimal;
use sqlx::{Arguments, Row};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use stencil_core::{Resource, ResourceConnection};
use stencil_policy::TypedValue;
use stencil_runtime::{CompiledArtifact, ExecutionResponse, Executor};
use stencil_sql::CompiledStatement;

pub mod introspect;

pub use introspect::{introspect_schema, introspect_url};

fn args_add<T>(args: &mut PgArguments, v: T) -> anyhow::Result<()>
where
    T: Send + Sync + 'static,
    for<'q> T: sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    args.add(v).map_err(|e| anyhow::anyhow!(e))
}

/// Bind one typed value to the next positional parameter.
fn bind_value(args: &mut PgArguments, value: &TypedValue) -> anyhow::Result<()> {
    match value {
        TypedValue::Null => args_add(args, Option::<String>::None),
        TypedValue::Text(s) | TypedValue::Email(s) | TypedValue::Choice(s) => {
            args_add(args, s.clone())
        }
        TypedValue::Date(d) => args_add(args, *d),
        TypedValue::Integer(digits) => match value.as_i64() {
            Some(i) => args_add(args, i),
            None => args_add(args, BigDecimal::from_str(digits)?),
        },
        TypedValue::Currency(n) | TypedValue::Decimal(n) => args_add(args, n.clone()),
        TypedValue::Boolean(b) => args_add(args, *b),
    }
}

fn bind_all(statement: &CompiledStatement) -> anyhow::Result<PgArguments> {
    let mut args = PgArguments::default();
    for value in statement.values() {
        bind_value(&mut args, value)?;
    }
    Ok(args)
}

/// Whether a statement produces rows that can be wrapped in a subquery.
fn returns_rows(sql: &str) -> bool {
    let mut text = sql.trim_start();
    while let Some(rest) = text.strip_prefix("--") {
        text = rest.split_once('\n').map(|(_, r)| r).unwrap_or("").trim_start();
    }
    let keyword: String = text
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(keyword.as_str(), "select" | "with" | "values" | "table")
}

/// Wrap a query so its rows come back as one JSON array.
fn rows_as_json(sql: &str) -> String {
    let inner = sql.trim().trim_end_matches(';').trim_end();
    format!(
        "SELECT COALESCE(jsonb_agg(to_jsonb(t)), '[]'::jsonb) AS rows FROM ({}\n) AS t",
        inner
    )
}

#[derive(Debug, Clone, Copy)]
pub struct PostgresExecutorOptions {
    pub max_connections: u32,
}

impl Default for PostgresExecutorOptions {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

/// Runs compiled statements against Postgres resources.
///
/// One pool is kept per resource id and connects on first use.
pub struct PostgresExecutor {
    options: PostgresExecutorOptions,
    pools: Mutex<HashMap<String, PgPool>>,
}

impl PostgresExecutor {
    pub fn new(options: PostgresExecutorOptions) -> Self {
        Self {
            options,
            pools: Mutex::new(HashMap::new()),
        }
    }

    fn pool(&self, resource: &Resource) -> anyhow::Result<PgPool> {
        let ResourceConnection::Postgres(pg) = &resource.connection else {
            anyhow::bail!(
                "resource '{}' is a {} resource, not postgres",
                resource.id,
                resource.connection.kind()
            );
        };

        let mut pools = self.pools.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pool) = pools.get(&resource.id) {
            return Ok(pool.clone());
        }

        let url = pg.connection_url().ok_or_else(|| {
            anyhow::anyhow!("resource '{}' has no connection url", resource.id)
        })?;
        let pool = PgPoolOptions::new()
            .max_connections(self.options.max_connections)
            .connect_lazy(&url)?;
        tracing::debug!(resource = %resource.id, "Created connection pool");
        pools.insert(resource.id.clone(), pool.clone());
        Ok(pool)
    }

    async fn run(
        &self,
        pool: &PgPool,
        statement: &CompiledStatement,
        args: PgArguments,
    ) -> Result<String, sqlx::Error> {
        if returns_rows(&statement.statement_text) {
            let sql = rows_as_json(&statement.statement_text);
            let row = sqlx::query_with(&sql, args).fetch_one(pool).await?;
            let rows: serde_json::Value = row.try_get("rows")?;
            Ok(rows.to_string())
        } else {
            let result = sqlx::query_with(&statement.statement_text, args)
                .execute(pool)
                .await?;
            Ok(serde_json::json!({ "rowsAffected": result.rows_affected() }).to_string())
        }
    }
}

impl Default for PostgresExecutor {
    fn default() -> Self {
        Self::new(PostgresExecutorOptions::default())
    }
}

#[async_trait]
impl Executor for PostgresExecutor {
    async fn execute(
        &self,
        resource: &Resource,
        artifact: &CompiledArtifact,
    ) -> anyhow::Result<ExecutionResponse> {
        let CompiledArtifact::Sql(statement) = artifact else {
            anyhow::bail!("postgres executor cannot run {} artifacts", artifact.kind());
        };
        let pool = self.pool(resource)?;
        let args = bind_all(statement)?;

        tracing::debug!(
            resource = %resource.id,
            params = statement.parameters.len(),
            "Executing statement"
        );

        match self.run(&pool, statement, args).await {
            Ok(body) => Ok(ExecutionResponse::success(body)),
            Err(sqlx::Error::Database(e)) => {
                tracing::warn!(resource = %resource.id, error = %e, "Statement failed");
                Ok(ExecutionResponse::error(e.message().to_string()))
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("failed to execute on resource '{}'", resource.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;
    use stencil_sql::BoundParameter;

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("SELECT 1"));
        assert!(returns_rows("  with x as (select 1) select * from x"));
        assert!(returns_rows("-- lookup\nSELECT * FROM users"));
        assert!(!returns_rows("UPDATE users SET name = $1"));
        assert!(!returns_rows("delete from users"));
        assert!(!returns_rows(""));
    }

    #[test]
    fn test_rows_as_json_strips_terminator() {
        assert_eq!(
            rows_as_json("SELECT * FROM users WHERE id = $1;  "),
            "SELECT COALESCE(jsonb_agg(to_jsonb(t)), '[]'::jsonb) AS rows FROM (SELECT * FROM users WHERE id = $1\n) AS t"
        );
    }

    #[test]
    fn test_rows_as_json_survives_trailing_comment() {
        let sql = rows_as_json("SELECT 1 -- done");
        assert!(sql.contains("-- done\n) AS t"));
    }

    #[test]
    fn test_bind_every_value_kind() {
        let statement = CompiledStatement {
            statement_text: "SELECT $1, $2, $3, $4, $5, $6".to_string(),
            parameters: vec![
                TypedValue::Null,
                TypedValue::Text("a".to_string()),
                TypedValue::Integer("4".to_string()),
                TypedValue::Decimal(BigDecimal::from_str("1.50").unwrap()),
                TypedValue::Boolean(true),
                TypedValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            ]
            .into_iter()
            .enumerate()
            .map(|(i, value)| BoundParameter {
                name: format!("p{}", i),
                value,
            })
            .collect(),
        };

        let args = bind_all(&statement).unwrap();
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn test_bind_integer_wider_than_i64() {
        let mut args = PgArguments::default();
        bind_value(&mut args, &TypedValue::Integer("12345678901234567890".to_string())).unwrap();
        bind_value(&mut args, &TypedValue::Integer("007".to_string())).unwrap();
        assert_eq!(args.len(), 2);
    }
}
