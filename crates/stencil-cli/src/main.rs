use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::KeyValueArg;

#[derive(Parser, Debug)]
#[command(name = "stencil", version, about = "Run Stencil apps and dashboards")]
struct Cli {
    /// Project configuration file.
    #[arg(long, global = true, default_value = "stencil.yaml", env = "STENCIL_CONFIG")]
    config: PathBuf,

    /// Log filter, e.g. "debug" or "stencil_runtime=debug". Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the project configuration for consistency.
    Check,

    /// Compile an app and print the request or statement without running it.
    Compile {
        app_id: String,

        /// Input value as `title=value`, where title is the input label.
        #[arg(long = "input", value_name = "TITLE=VALUE")]
        inputs: Vec<KeyValueArg>,

        /// Dynamic body pair as `key=value`.
        #[arg(long = "body", value_name = "KEY=VALUE")]
        body: Vec<KeyValueArg>,
    },

    /// Compile and execute an app.
    Run {
        app_id: String,

        /// Input value as `title=value`, where title is the input label.
        #[arg(long = "input", value_name = "TITLE=VALUE")]
        inputs: Vec<KeyValueArg>,

        /// Dynamic body pair as `key=value`.
        #[arg(long = "body", value_name = "KEY=VALUE")]
        body: Vec<KeyValueArg>,
    },

    /// Load a dashboard and optionally run one of its actions.
    Dashboard {
        dashboard_id: String,

        /// Load input as `fieldId=value`.
        #[arg(long = "load", value_name = "ID=VALUE")]
        load: Vec<KeyValueArg>,

        /// Action to run after loading.
        #[arg(long)]
        action: Option<String>,

        /// Action input as `fieldId=value`.
        #[arg(long = "action-input", value_name = "ID=VALUE")]
        action_inputs: Vec<KeyValueArg>,

        /// Confirm actions that ask for confirmation without prompting.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Schema snapshots for database resources.
    Schema {
        #[command(subcommand)]
        cmd: SchemaCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Introspect a database resource into `<schema_dir>/<resource>.json`.
    Snapshot {
        #[arg(long)]
        resource: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Check => commands::check::run(&cli.config)?,

        Command::Compile {
            app_id,
            inputs,
            body,
        } => commands::app::compile(&cli.config, &app_id, &inputs, &body).await?,

        Command::Run {
            app_id,
            inputs,
            body,
        } => commands::app::run(&cli.config, &app_id, &inputs, &body).await?,

        Command::Dashboard {
            dashboard_id,
            load,
            action,
            action_inputs,
            yes,
        } => {
            commands::dashboard::run(
                &cli.config,
                &dashboard_id,
                &load,
                action.as_deref(),
                &action_inputs,
                yes,
            )
            .await?
        }

        Command::Schema { cmd } => match cmd {
            SchemaCommand::Snapshot { resource } => {
                commands::schema::snapshot(&cli.config, &resource).await?
            }
        },
    }

    Ok(())
}
