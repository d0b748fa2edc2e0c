use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use codeclarity_core::ApiError;

use super::{Context, PageArgs};
use crate::output::{self, print_json, severity_color, severity_style, truncate_string, Table};

/// Which analysis the results belong to.
#[derive(Debug, Clone, Args)]
pub struct Target {
    /// Project ID
    pub project: String,
    /// Analysis ID
    pub analysis: String,

    /// Restrict results to one workspace of the repository
    #[arg(long)]
    pub workspace: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ResultCommand {
    /// Vulnerability and dependency totals
    Summary {
        #[command(flatten)]
        target: Target,
    },
    /// List vulnerabilities
    Vulnerabilities {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        page: PageArgs,
    },
    /// License usage totals
    Licenses {
        #[command(flatten)]
        target: Target,
    },
}

pub async fn run(ctx: &Context, command: ResultCommand) -> Result<()> {
    let org_id = ctx.org_id()?;
    let client = ctx.client()?;

    match command {
        ResultCommand::Summary { target } => {
            let workspace = target.workspace.as_deref();
            let vulns = client
                .vulnerability_stats(org_id, &target.project, &target.analysis, workspace)
                .await;
            let sbom = client
                .sbom_stats(org_id, &target.project, &target.analysis, workspace)
                .await;

            if ctx.format.is_json() || summary_unavailable(&vulns, &sbom) {
                // Reaching here in table mode means one of the two failed.
                let vulns = vulns.context("Failed to get vulnerability stats")?;
                let sbom = sbom.context("Failed to get SBOM stats")?;
                return print_json(&json!({
                    "vulnerabilities": vulns,
                    "dependencies": sbom,
                }));
            }

            println!("{}", output::bold("Analysis Summary"));
            println!();
            println!("{}", output::bold("Vulnerabilities:"));
            match vulns {
                Ok(stats) => {
                    println!("  Total:    {}", stats.total);
                    println!("  Critical: {}", severity_color_count("critical", stats.critical));
                    println!("  High:     {}", severity_color_count("high", stats.high));
                    println!("  Medium:   {}", severity_color_count("medium", stats.medium));
                    println!("  Low:      {}", severity_color_count("low", stats.low));
                }
                Err(e) => output::warning(format!("  Could not retrieve vulnerability stats: {}", e)),
            }
            println!();
            println!("{}", output::bold("Dependencies:"));
            match sbom {
                Ok(stats) => {
                    println!("  Total:      {}", stats.total_dependencies);
                    println!("  Direct:     {}", stats.direct_dependencies);
                    println!("  Transitive: {}", stats.transitive_dependencies);
                }
                Err(e) => output::warning(format!("  Could not retrieve SBOM stats: {}", e)),
            }
        }
        ResultCommand::Vulnerabilities { target, page } => {
            let vulns = client
                .vulnerabilities(
                    org_id,
                    &target.project,
                    &target.analysis,
                    page.page,
                    page.per_page,
                    target.workspace.as_deref(),
                )
                .await
                .context("Failed to get vulnerabilities")?;

            if ctx.format.is_json() {
                return print_json(&vulns);
            }
            if vulns.is_empty() {
                output::success("No vulnerabilities found");
                return Ok(());
            }

            println!("Found {} vulnerabilities\n", vulns.total_entries);
            let mut table = Table::new(&["id", "severity", "cvss", "package", "version", "description"]);
            for vuln in &vulns.data {
                let (package, version) = vuln.primary_dependency().unwrap_or(("-", "-"));
                table.add_row(vec![
                    vuln.id.clone(),
                    severity_color(&vuln.severity.severity_class),
                    format!("{:.1}", vuln.severity.severity),
                    package.to_string(),
                    version.to_string(),
                    truncate_string(&vuln.description, 60),
                ]);
            }
            table.print();
            if vulns.has_multiple_pages() {
                println!("\n{}", vulns.page_summary());
            }
        }
        ResultCommand::Licenses { target } => {
            let stats = client
                .license_stats(
                    org_id,
                    &target.project,
                    &target.analysis,
                    target.workspace.as_deref(),
                )
                .await
                .context("Failed to get license stats")?;

            if ctx.format.is_json() {
                return print_json(&stats);
            }

            println!("{} {}", output::bold("Licenses:"), stats.total);
            if !stats.by_license.is_empty() {
                println!();
                let mut counts: Vec<(&String, &u64)> = stats.by_license.iter().collect();
                counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
                let mut table = Table::new(&["license", "dependencies"]);
                for (license, count) in counts {
                    table.add_row(vec![license.clone(), count.to_string()]);
                }
                table.print();
            }
            if !stats.by_compliance.is_empty() {
                println!();
                println!("{}", output::bold("Compliance:"));
                for (class, count) in &stats.by_compliance {
                    println!("  {}: {}", class, count);
                }
            }
        }
    }
    Ok(())
}

/// Whether a summary would be misleading: both halves failed, or the
/// session itself was rejected.
fn summary_unavailable<V, S>(vulns: &Result<V, ApiError>, sbom: &Result<S, ApiError>) -> bool {
    let rejected = |e: &ApiError| match e {
        ApiError::Auth(auth) => auth.needs_login(),
        other => other.is_unauthorized(),
    };
    match (vulns, sbom) {
        (Err(_), Err(_)) => true,
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => rejected(e),
        (Ok(_), Ok(_)) => false,
    }
}

/// Color a count by severity, leaving zero uncolored.
fn severity_color_count(severity: &str, count: u64) -> String {
    if count == 0 {
        return count.to_string();
    }
    severity_style(severity).apply_to(count).to_string()
}
