use sqlx::{PgPool, Row};

use stencil_sql::{ColumnSchema, DatabaseSchema, TableSchema};

/// Introspect a Postgres database into a schema snapshot.
/// Excludes system schemas (pg_catalog, information_schema).
pub async fn introspect_schema(pool: &PgPool) -> anyhow::Result<DatabaseSchema> {
    let table_rows = sqlx::query(
        r#"
        select table_schema::text as table_schema, table_name::text as table_name
        from information_schema.tables
        where table_type in ('BASE TABLE', 'VIEW')
          and table_schema not in ('pg_catalog', 'information_schema')
        order by table_schema, table_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut schema = DatabaseSchema::new();

    for row in table_rows {
        let table_schema: String = row.try_get("table_schema")?;
        let table_name: String = row.try_get("table_name")?;

        // Primary key columns
        let pk_rows = sqlx::query(
            r#"
            select kcu.column_name::text as column_name
            from information_schema.table_constraints tc
            join information_schema.key_column_usage kcu
              on tc.constraint_name = kcu.constraint_name
             and tc.table_schema = kcu.table_schema
            where tc.constraint_type = 'PRIMARY KEY'
              and tc.table_schema = $1
              and tc.table_name = $2
            order by kcu.ordinal_position
            "#,
        )
        .bind(&table_schema)
        .bind(&table_name)
        .fetch_all(pool)
        .await?;

        let primary_key = pk_rows
            .iter()
            .map(|r| r.try_get::<String, _>("column_name"))
            .collect::<Result<Vec<_>, _>>()?;

        let col_rows = sqlx::query(
            r#"
            select column_name::text as column_name,
                   data_type::text as data_type,
                   is_nullable::text as is_nullable
            from information_schema.columns
            where table_schema = $1 and table_name = $2
            order by ordinal_position
            "#,
        )
        .bind(&table_schema)
        .bind(&table_name)
        .fetch_all(pool)
        .await?;

        let mut table = TableSchema::new(&table_name).in_schema(&table_schema);
        for c in col_rows {
            let column_name: String = c.try_get("column_name")?;
            let data_type: String = c.try_get("data_type")?;
            let is_nullable: String = c.try_get("is_nullable")?;

            let mut column = ColumnSchema::new(&column_name, data_type);
            column.nullable = is_nullable == "YES";
            column.is_primary_key = primary_key.contains(&column_name);
            table.add_column(column);
        }
        table.primary_key = primary_key;

        tracing::debug!(
            table = %table.qualified_name(),
            columns = table.columns.len(),
            "Introspected table"
        );
        schema.add_table(table);
    }

    Ok(schema)
}

/// Connect to `database_url` and introspect it.
pub async fn introspect_url(database_url: &str) -> anyhow::Result<DatabaseSchema> {
    let pool = PgPool::connect(database_url).await?;
    let schema = introspect_schema(&pool).await;
    pool.close().await;
    schema
}
