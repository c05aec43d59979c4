//! `stencil compile` and `stencil run`.

use anyhow::Result;
use std::path::Path;

use stencil_core::{KeyValue, RunInput};

use super::{KeyValueArg, build_runner, current_user, load_project, print_json};

fn run_inputs(inputs: &[KeyValueArg]) -> Vec<RunInput> {
    inputs
        .iter()
        .map(|arg| RunInput::new(&arg.key, &arg.value))
        .collect()
}

/// `None` when no pairs were given, so apps without a dynamic body compile normally.
fn dynamic_body(body: &[KeyValueArg]) -> Option<Vec<KeyValue>> {
    if body.is_empty() {
        None
    } else {
        Some(body.iter().map(KeyValue::from).collect())
    }
}

pub async fn compile(
    config_path: &Path,
    app_id: &str,
    inputs: &[KeyValueArg],
    body: &[KeyValueArg],
) -> Result<()> {
    let config = load_project(config_path)?;
    let runner = build_runner(&config)?;
    let body = dynamic_body(body);

    let artifact = runner
        .compile_app(app_id, &run_inputs(inputs), &current_user(&config), body.as_deref())
        .await?;

    print_json(&artifact)
}

pub async fn run(
    config_path: &Path,
    app_id: &str,
    inputs: &[KeyValueArg],
    body: &[KeyValueArg],
) -> Result<()> {
    let config = load_project(config_path)?;
    let runner = build_runner(&config)?;
    let body = dynamic_body(body);

    let response = runner
        .run_app(app_id, &run_inputs(inputs), &current_user(&config), body.as_deref())
        .await?;

    print_json(&response)?;
    if !stencil_core::is_success_status(Some(&response.status)) {
        anyhow::bail!("App '{}' finished with status '{}'", app_id, response.status);
    }
    Ok(())
}
