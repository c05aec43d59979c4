//! Project configuration.
//!
//! A project is described by a `stencil.yaml` file. Resources, Apps and
//! Dashboards can be declared inline or as one YAML document per file in
//! `resources_dir`, `apps_dir` and `dashboards_dir`; relative paths are
//! resolved against the directory holding `stencil.yaml`.

pub mod limits;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use limits::LimitsConfig;

use crate::app::{AppDefinition, AppOperation, Resource, ResourceConnection};
use crate::check::{CheckFinding, Severity};
use crate::dashboard::DashboardDefinition;
use crate::field::check_fields;
use crate::wire::CurrentUser;

/// Complete project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name.
    #[serde(default)]
    pub project: Option<String>,

    /// Inline resource definitions.
    #[serde(default)]
    pub resources: Vec<Resource>,

    /// Inline app definitions.
    #[serde(default)]
    pub apps: Vec<AppDefinition>,

    /// Inline dashboard definitions.
    #[serde(default)]
    pub dashboards: Vec<DashboardDefinition>,

    /// Directory containing one resource per YAML file.
    #[serde(default)]
    pub resources_dir: Option<PathBuf>,

    /// Directory containing one app per YAML file.
    #[serde(default)]
    pub apps_dir: Option<PathBuf>,

    /// Directory containing one dashboard per YAML file.
    #[serde(default)]
    pub dashboards_dir: Option<PathBuf>,

    /// Directory holding `<resource id>.json` schema snapshots.
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,

    /// Identity used for `current_user.*` placeholders in local runs.
    #[serde(default)]
    pub current_user: Option<CurrentUser>,

    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProjectConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        parse_yaml(&content, path)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        parse_yaml(content, Path::new("<inline>"))
    }

    /// Load configuration and everything its directories reference.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(dir) = &config.resources_dir {
            let resources: Vec<Resource> = load_dir(&resolve(&base_dir, dir))?;
            config.resources.extend(resources);
        }
        if let Some(dir) = &config.apps_dir {
            let apps: Vec<AppDefinition> = load_dir(&resolve(&base_dir, dir))?;
            config.apps.extend(apps);
        }
        if let Some(dir) = &config.dashboards_dir {
            let dashboards: Vec<DashboardDefinition> = load_dir(&resolve(&base_dir, dir))?;
            config.dashboards.extend(dashboards);
        }
        if let Some(dir) = &config.schema_dir {
            config.schema_dir = Some(resolve(&base_dir, dir));
        }

        for dashboard in &mut config.dashboards {
            dashboard.config.normalize();
        }

        Ok(config)
    }

    pub fn get_resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn get_app(&self, id: &str) -> Option<&AppDefinition> {
        self.apps.iter().find(|a| a.id == id)
    }

    pub fn get_dashboard(&self, id: &str) -> Option<&DashboardDefinition> {
        self.dashboards.iter().find(|d| d.id == id)
    }

    /// Path of the schema snapshot for a resource, if a schema dir is set.
    pub fn schema_path(&self, resource_id: &str) -> Option<PathBuf> {
        self.schema_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", resource_id)))
    }

    /// Cross-entity consistency checks.
    pub fn check(&self) -> Vec<CheckFinding> {
        let mut findings = Vec::new();

        findings.extend(duplicate_ids(
            "resources",
            self.resources.iter().map(|r| r.id.as_str()),
        ));
        findings.extend(duplicate_ids("apps", self.apps.iter().map(|a| a.id.as_str())));
        findings.extend(duplicate_ids(
            "dashboards",
            self.dashboards.iter().map(|d| d.id.as_str()),
        ));

        for app in &self.apps {
            let at = format!("apps.{}", app.id);
            findings.extend(check_fields(&format!("{}.inputs", at), &app.inputs));

            let Some(resource) = self.get_resource(&app.resource_id) else {
                findings.push(CheckFinding::new(
                    Severity::Error,
                    "apps",
                    format!("App references unknown resource '{}'", app.resource_id),
                    at,
                ));
                continue;
            };

            let compatible = matches!(
                (&app.operation, &resource.connection),
                (AppOperation::Http(_), ResourceConnection::Http(_))
                    | (AppOperation::Sql(_), ResourceConnection::Postgres(_))
            );
            if !compatible {
                findings.push(CheckFinding::new(
                    Severity::Error,
                    "apps",
                    format!(
                        "App operation does not match {} resource '{}'",
                        resource.connection.kind(),
                        resource.id
                    ),
                    at.clone(),
                ));
            }

            if let AppOperation::Http(http) = &app.operation
                && http.method.is_none()
            {
                findings.push(CheckFinding::new(
                    Severity::Error,
                    "apps",
                    "HTTP app has no method",
                    at,
                ));
            }
        }

        for dashboard in &self.dashboards {
            let at = format!("dashboards.{}", dashboard.id);
            findings.extend(dashboard.config.check(&at));

            if let Some(prepare) = &dashboard.config.prepare_app_id
                && self.get_app(prepare).is_none()
            {
                findings.push(CheckFinding::new(
                    Severity::Error,
                    "dashboards",
                    format!("Prepare app '{}' does not exist", prepare),
                    at.clone(),
                ));
            }

            for action in &dashboard.config.actions {
                if self.get_app(&action.app_id).is_none() {
                    findings.push(CheckFinding::new(
                        Severity::Error,
                        "dashboards",
                        format!(
                            "Action '{}' targets unknown app '{}'",
                            action.id, action.app_id
                        ),
                        format!("{}.actions.{}", at, action.id),
                    ));
                }
            }
        }

        findings
    }
}

fn parse_yaml<T: DeserializeOwned>(content: &str, path: &Path) -> Result<T, ConfigError> {
    serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Load every `.yaml`/`.yml` file of a directory, sorted by file name.
fn load_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::Config(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(&path)?;
        items.push(parse_yaml(&content, &path)?);
    }
    Ok(items)
}

fn duplicate_ids<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Vec<CheckFinding> {
    let mut seen = HashSet::new();
    ids.filter(|id| !seen.insert(*id))
        .map(|id| {
            CheckFinding::new(
                Severity::Error,
                kind,
                format!("Duplicate id '{}'", id),
                format!("{}.{}", kind, id),
            )
        })
        .collect()
}
