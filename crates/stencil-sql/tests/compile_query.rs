//! SQL Apps loaded from project YAML and compiled against a schema snapshot.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use stencil_core::{AppOperation, CurrentUser, ProjectConfig};
use stencil_policy::TypedValue;
use stencil_sql::{DatabaseSchema, SqlCompileError, SqlCompileRequest, SqlCompiler};

const PROJECT: &str = r#"
resources:
  - id: warehouse
    connection:
      postgres:
        urlEnv: WAREHOUSE_URL
apps:
  - id: orders-by-status
    resourceId: warehouse
    inputs:
      - id: f1
        label: statuses
        type: text
        required: true
    operation:
      sql:
        mode: gui
        table: orders
        columns: [id, total]
        filters:
          - column: status
            operator: IN
            value: "{statuses}"
          - column: customer_email
            operator: "="
            value: "{current_user.email}"
        limit: "100"
        orderBy:
          - column: total
            direction: DESC
  - id: search
    resourceId: warehouse
    inputs:
      - id: f1
        label: term
        type: text
    operation:
      sql:
        mode: raw
        rawSql: "SELECT id FROM orders WHERE note ILIKE @term OR ref = @term -- @ignored"
        rawSqlParams:
          - key: term
            value: "%{term}%"
"#;

const SNAPSHOT: &str = r#"{
  "tables": {
    "public.orders": {
      "name": "orders",
      "schema": "public",
      "columns": [
        { "name": "id", "data_type": "bigint", "nullable": false, "is_primary_key": true },
        { "name": "total", "data_type": "numeric", "nullable": false },
        { "name": "status", "data_type": "text", "nullable": false },
        { "name": "customer_email", "data_type": "text", "nullable": true }
      ],
      "primary_key": ["id"]
    }
  }
}"#;

fn compile(app_id: &str, values: &[(&str, &str)]) -> Result<stencil_sql::CompiledStatement, SqlCompileError> {
    let config = ProjectConfig::from_yaml(PROJECT).unwrap();
    let schema = DatabaseSchema::from_json(SNAPSHOT).unwrap();
    let app = config.get_app(app_id).unwrap();
    let AppOperation::Sql(query) = &app.operation else {
        panic!("expected a sql app");
    };
    let values: BTreeMap<String, String> = values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let user = CurrentUser {
        id: "u1".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    };

    SqlCompiler::new().compile(SqlCompileRequest {
        query,
        inputs: &app.inputs,
        values: &values,
        current_user: &user,
        schema: Some(&schema),
    })
}

#[test]
fn test_gui_query_binds_list_and_current_user() {
    let compiled = compile("orders-by-status", &[("statuses", "paid, shipped")]).unwrap();

    assert_eq!(
        compiled.statement_text,
        "SELECT \"id\", \"total\" FROM \"public\".\"orders\" \
         WHERE \"status\" IN ($1, $2) AND \"customer_email\" = $3 \
         ORDER BY \"total\" DESC LIMIT 100"
    );
    assert_eq!(
        compiled.values().cloned().collect::<Vec<_>>(),
        vec![
            TypedValue::Text("paid".to_string()),
            TypedValue::Text("shipped".to_string()),
            TypedValue::Text("ada@example.com".to_string()),
        ]
    );
}

#[test]
fn test_gui_query_reports_missing_required_input() {
    let err = compile("orders-by-status", &[]).unwrap_err();
    let SqlCompileError::Validation(errors) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert_eq!(errors.get("f1").unwrap().message, "required");
}

#[test]
fn test_raw_query_reuses_positions_and_skips_comments() {
    let compiled = compile("search", &[("term", "x' OR 1=1")]).unwrap();

    assert_eq!(
        compiled.statement_text,
        "SELECT id FROM orders WHERE note ILIKE $1 OR ref = $1 -- @ignored"
    );
    assert_eq!(compiled.parameters.len(), 1);
    assert_eq!(
        compiled.parameters[0].value,
        TypedValue::Text("%x' OR 1=1%".to_string())
    );
}
