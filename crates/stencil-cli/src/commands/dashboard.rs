//! `stencil dashboard`: load a dashboard and optionally run one action.

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use stencil_runtime::{ActionRunOutcome, DashboardSession, PendingConfirmation, Phase};

use super::{KeyValueArg, build_runner, current_user, load_project, print_json};

fn prompt_confirmation(pending: &PendingConfirmation) -> Result<bool> {
    eprintln!("⚠️  {}", pending.title);
    eprintln!("   {}", pending.message);
    eprint!("Continue? [y/N] ");
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub async fn run(
    config_path: &Path,
    dashboard_id: &str,
    load: &[KeyValueArg],
    action: Option<&str>,
    action_inputs: &[KeyValueArg],
    yes: bool,
) -> Result<()> {
    let config = load_project(config_path)?;
    let dashboard = config
        .get_dashboard(dashboard_id)
        .with_context(|| format!("Dashboard '{}' not found", dashboard_id))?
        .clone();
    let runner = Arc::new(build_runner(&config)?);
    let session = DashboardSession::new(dashboard, runner, current_user(&config));

    for arg in load {
        session.set_load_value(&arg.key, &arg.value)?;
    }

    if let Some(prepare) = session.load().await? {
        print_json(&prepare)?;
    }
    if session.phase() != Phase::PostLoad {
        anyhow::bail!("Dashboard '{}' did not finish loading", dashboard_id);
    }

    if let Some(action_id) = action {
        for arg in action_inputs {
            session.set_action_value(&arg.key, &arg.value)?;
        }

        let response = match session.run_action(action_id).await? {
            ActionRunOutcome::Completed(response) => Some(response),
            ActionRunOutcome::ConfirmationRequired(pending) => {
                if yes || prompt_confirmation(&pending)? {
                    Some(session.confirm(&pending.id).await?)
                } else {
                    session.cancel_confirmation();
                    eprintln!("Cancelled.");
                    None
                }
            }
        };

        if let Some(response) = response {
            print_json(&response)?;
        }
    }

    print_json(&session.snapshot())
}
