//! # stencil-core
//!
//! Shared data model for Stencil: input fields, Apps and Resources, SQL
//! query configuration, Dashboards, wire shapes and project configuration.
//!
//! The engine treats everything here as read-only definitions produced by
//! an authoring surface.

pub mod app;
pub mod check;
pub mod config;
pub mod dashboard;
pub mod field;
pub mod sql;
pub mod wire;

pub use app::{
    AppDefinition, AppOperation, HttpAppConfig, HttpMethod, HttpResource, KeyValue,
    PostgresResource, Resource, ResourceConnection, TemplatedCollection,
};
pub use check::{CheckFinding, Severity};
pub use config::{ConfigError, LimitsConfig, ProjectConfig};
pub use dashboard::{
    BindingSource, DashboardAction, DashboardBinding, DashboardConfig, DashboardDefinition,
    DashboardLayout, LayoutSection,
};
pub use field::{FieldType, InputField, RadioOption};
pub use sql::{
    GuiQuery, LimitValue, RawQuery, SortDirection, SqlFilter, SqlOperator, SqlOrderBy,
    SqlQueryConfig,
};
pub use wire::{
    AppRunResponse, CurrentUser, DashboardActionResponse, DashboardPrepareResponse,
    ExecutableHttpRequest, RunInput, RunInputError, RunInputLimits, is_success_status,
};
