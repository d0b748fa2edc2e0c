use anyhow::{bail, Context as _, Result};
use chrono::Local;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use codeclarity_core::models::{Analysis, AnalysisCreateRequest};
use codeclarity_core::poller::{self, Outcome, PollError, DEFAULT_POLL_INTERVAL};
use codeclarity_core::ApiClient;

use super::{Context, InterruptGuard, PageArgs};
use crate::output::{self, print_fields, print_json, status_color, Table};

#[derive(Debug, Clone, Subcommand)]
pub enum AnalysisCommand {
    /// List analyses of a project
    List {
        /// Project ID
        project: String,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Show an analysis
    Get {
        /// Project ID
        project: String,
        /// Analysis ID
        analysis: String,
    },
    /// Start a new analysis
    Start {
        /// Project ID
        project: String,

        /// Analyzer ID
        #[arg(short, long = "analyzer")]
        analyzer: String,

        /// Branch to analyze
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Specific commit to analyze
        #[arg(long)]
        commit: Option<String>,

        /// Git tag to analyze
        #[arg(long)]
        tag: Option<String>,

        /// Follow progress until the analysis finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// Show the status of an analysis
    Status {
        /// Project ID
        project: String,
        /// Analysis ID
        analysis: String,

        /// Poll until the analysis finishes
        #[arg(short, long)]
        watch: bool,
    },
}

pub async fn run(ctx: &Context, command: AnalysisCommand) -> Result<()> {
    let org_id = ctx.org_id()?;
    let client = ctx.client()?;

    match command {
        AnalysisCommand::List { project, page } => {
            let analyses = client
                .list_analyses(org_id, &project, page.page, page.per_page)
                .await
                .context("Failed to list analyses")?;

            if ctx.format.is_json() {
                return print_json(&analyses);
            }
            if analyses.is_empty() {
                output::info("No analyses found");
                return Ok(());
            }

            let mut table = Table::new(&["id", "status", "stage", "branch", "created"]);
            for analysis in &analyses.data {
                table.add_row(vec![
                    analysis.id.clone(),
                    status_color(analysis.status.as_str()),
                    analysis.stage.to_string(),
                    output::or_empty(&analysis.branch),
                    output::format_time(analysis.created_on.as_ref()),
                ]);
            }
            table.print();
            if analyses.has_multiple_pages() {
                println!("\n{}", analyses.page_summary());
            }
        }
        AnalysisCommand::Get { project, analysis } => {
            let analysis = client
                .get_analysis(org_id, &project, &analysis)
                .await
                .context("Failed to get analysis")?;

            if ctx.format.is_json() {
                return print_json(&analysis);
            }
            print_analysis(&analysis);
            if !analysis.steps.is_empty() {
                println!();
                println!("{}", output::bold("Steps:"));
                for (i, group) in analysis.steps.iter().enumerate() {
                    for step in group {
                        println!(
                            "  {}. {} {}",
                            i + 1,
                            step.name,
                            status_color(&step.status)
                        );
                    }
                }
            }
        }
        AnalysisCommand::Start {
            project,
            analyzer,
            branch,
            commit,
            tag,
            watch,
        } => {
            let mut request = AnalysisCreateRequest::once(analyzer, branch);
            request.commit_hash = commit.filter(|c| !c.is_empty());
            request.tag = tag.filter(|t| !t.is_empty());

            let created = client
                .start_analysis(org_id, &project, &request)
                .await
                .context("Failed to start analysis")?;

            if !ctx.format.is_json() {
                output::success(format!("Analysis started: {}", created.id));
            }
            if watch {
                return watch_analysis(ctx, &client, org_id, &project, &created.id).await;
            }
            if ctx.format.is_json() {
                return print_json(&created);
            }
        }
        AnalysisCommand::Status {
            project,
            analysis,
            watch,
        } => {
            if watch {
                return watch_analysis(ctx, &client, org_id, &project, &analysis).await;
            }

            let analysis = client
                .get_analysis(org_id, &project, &analysis)
                .await
                .context("Failed to get analysis")?;

            if ctx.format.is_json() {
                return print_json(&analysis);
            }
            print_analysis(&analysis);
        }
    }
    Ok(())
}

/// Poll the analysis until it finishes, printing each status change.
///
/// A failed analysis exits with an error so scripts can branch on it.
async fn watch_analysis(
    ctx: &Context,
    client: &ApiClient,
    org_id: &str,
    project_id: &str,
    analysis_id: &str,
) -> Result<()> {
    let json = ctx.format.is_json();
    if !json {
        println!("Watching analysis {} (Ctrl+C to stop)...", analysis_id);
    }

    let cancel = CancellationToken::new();
    let _interrupt = InterruptGuard::install(cancel.clone());

    let result = poller::watch(
        || client.get_analysis(org_id, project_id, analysis_id),
        DEFAULT_POLL_INTERVAL,
        &cancel,
        |analysis: &Analysis| {
            if !json {
                println!(
                    "[{}] Status: {} (stage {})",
                    Local::now().format("%H:%M:%S"),
                    status_color(analysis.status.as_str()),
                    analysis.stage
                );
            }
        },
    )
    .await;

    match result {
        Ok(Outcome::Succeeded(analysis)) => {
            if json {
                return print_json(&analysis);
            }
            output::success("Analysis completed");
            print_analysis(&analysis);
            Ok(())
        }
        Ok(Outcome::Failed(analysis)) => {
            if json {
                print_json(&analysis)?;
            } else {
                print_analysis(&analysis);
            }
            bail!("Analysis {} failed", analysis.id)
        }
        Err(PollError::Cancelled) => {
            output::warning("Stopped watching; the analysis continues on the server");
            Ok(())
        }
        Err(PollError::Fetch(e)) => Err(e).context("Failed to get analysis status"),
    }
}

fn print_analysis(analysis: &Analysis) {
    let mut fields = vec![
        ("Analysis", analysis.id.clone()),
        ("Status", status_color(analysis.status.as_str())),
        ("Branch", output::or_empty(&analysis.branch)),
        ("Stage", analysis.stage.to_string()),
        ("Created", output::format_time(analysis.created_on.as_ref())),
    ];
    if let Some(ref started) = analysis.started_on {
        fields.push(("Started", output::format_time(Some(started))));
    }
    if let Some(ref ended) = analysis.ended_on {
        fields.push(("Ended", output::format_time(Some(ended))));
    }
    if let Some(ref commit) = analysis.commit_hash {
        fields.push(("Commit", commit.clone()));
    }
    if let Some(ref tag) = analysis.tag {
        fields.push(("Tag", tag.clone()));
    }
    print_fields(&fields);
}
