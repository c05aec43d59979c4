//! `stencil check` command implementation.
//!
//! Validates the project configuration:
//! - Dashboard documents against the embedded JSON Schema
//! - Cross-entity consistency (apps, resources, dashboards, bindings)

use anyhow::{Context, Result};
use std::path::Path;

use stencil_core::{CheckFinding, ProjectConfig, Severity};

use super::load_project;

/// Embedded so validation works without the schemas directory.
const DASHBOARD_DOCUMENT_SCHEMA: &str =
    include_str!("../../../../schemas/DashboardDocument.schema.json");

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn extend(&mut self, findings: impl IntoIterator<Item = CheckFinding>) {
        self.findings.extend(findings);
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(CheckFinding::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.findings.iter().filter(|f| f.is_error()).count()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        let mut errors: Vec<_> = self.findings.iter().filter(|f| f.is_error()).collect();
        let mut warnings: Vec<_> = self
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .collect();

        errors.sort_by(|a, b| a.category.cmp(&b.category));
        warnings.sort_by(|a, b| a.category.cmp(&b.category));

        if !errors.is_empty() {
            println!("\n❌ Errors ({}):", errors.len());
            println!("{}", "─".repeat(60));
            for finding in &errors {
                print_finding(finding);
            }
        }

        if !warnings.is_empty() {
            println!("\n⚠️  Warnings ({}):", warnings.len());
            println!("{}", "─".repeat(60));
            for finding in &warnings {
                print_finding(finding);
            }
        }

        println!();
        println!("{}", "═".repeat(60));
        if errors.is_empty() && warnings.is_empty() {
            println!("✅ All checks passed!");
        } else {
            println!(
                "Summary: {} error(s), {} warning(s)",
                errors.len(),
                warnings.len()
            );
        }
    }
}

fn print_finding(finding: &CheckFinding) {
    let icon = match finding.severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
    };
    println!(
        "  {} [{}] [{}]: {}",
        icon, finding.category, finding.location, finding.message
    );
}

/// Validate every dashboard document against the JSON Schema.
fn validate_dashboard_documents(config: &ProjectConfig) -> Result<Vec<CheckFinding>> {
    let schema: serde_json::Value = serde_json::from_str(DASHBOARD_DOCUMENT_SCHEMA)
        .context("Embedded dashboard schema is not valid JSON")?;
    let validator = jsonschema::draft202012::options()
        .build(&schema)
        .map_err(|e| anyhow::anyhow!("Embedded dashboard schema does not compile: {}", e))?;

    let mut findings = Vec::new();
    for dashboard in &config.dashboards {
        let mut document = dashboard.config.clone();
        document.normalize();
        let instance = serde_json::to_value(&document)?;

        for error in validator.iter_errors(&instance) {
            findings.push(CheckFinding::new(
                Severity::Error,
                "schema",
                error.to_string(),
                format!("dashboards.{}{}", dashboard.id, error.instance_path()),
            ));
        }
    }
    Ok(findings)
}

/// Run all checks without printing.
pub fn run_quiet(config_path: &Path) -> Result<CheckResults> {
    let config = load_project(config_path)?;

    let mut results = CheckResults::default();
    results.extend(validate_dashboard_documents(&config)?);
    results.extend(config.check());
    Ok(results)
}

pub fn run(config_path: &Path) -> Result<()> {
    println!("🔍 Checking {}...", config_path.display());

    let results = run_quiet(config_path)?;
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!(
            "Configuration has {} error(s) that must be fixed.",
            results.error_count()
        );
    }
    Ok(())
}
