use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use clap::Subcommand;

use codeclarity_core::models::{Analyzer, AnalyzerCreateRequest, Stage};

use super::{Context, PageArgs};
use crate::output::{self, print_fields, print_json, truncate_string, Table};

#[derive(Debug, Clone, Subcommand)]
pub enum AnalyzerCommand {
    /// List analyzers
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show an analyzer and its stages
    Get {
        /// Analyzer ID
        id: String,
    },
    /// Create a new analyzer
    Create {
        /// Complete analyzer definition as JSON
        #[arg(long, conflicts_with_all = ["name", "description", "steps_file"])]
        file: Option<PathBuf>,

        /// Analyzer name
        #[arg(long)]
        name: Option<String>,

        /// Analyzer description
        #[arg(long)]
        description: Option<String>,

        /// JSON array of stage groups, e.g. [[{"name":"js-sbom","version":"v1"}]]
        #[arg(long = "steps-file")]
        steps_file: Option<PathBuf>,
    },
}

pub async fn run(ctx: &Context, command: AnalyzerCommand) -> Result<()> {
    let org_id = ctx.org_id()?;
    let client = ctx.client()?;

    match command {
        AnalyzerCommand::List { page } => {
            let analyzers = client
                .list_analyzers(org_id, page.page, page.per_page)
                .await
                .context("Failed to list analyzers")?;

            if ctx.format.is_json() {
                return print_json(&analyzers);
            }
            if analyzers.is_empty() {
                output::info("No analyzers found");
                return Ok(());
            }

            let mut table = Table::new(&["id", "name", "languages", "stages", "description"]);
            for analyzer in &analyzers.data {
                table.add_row(vec![
                    analyzer.id.clone(),
                    analyzer.name.clone(),
                    analyzer.languages_display(),
                    analyzer.stage_count().to_string(),
                    truncate_string(&analyzer.description, 50),
                ]);
            }
            table.print();
            if analyzers.has_multiple_pages() {
                println!("\n{}", analyzers.page_summary());
            }
        }
        AnalyzerCommand::Get { id } => {
            let analyzer = client
                .get_analyzer(org_id, &id)
                .await
                .context("Failed to get analyzer")?;

            if ctx.format.is_json() {
                return print_json(&analyzer);
            }
            print_analyzer(&analyzer);
        }
        AnalyzerCommand::Create {
            file,
            name,
            description,
            steps_file,
        } => {
            let request = match file {
                Some(path) => read_json::<AnalyzerCreateRequest>(&path)?,
                None => {
                    let Some(name) = name else {
                        bail!("Name is required. Use --name or --file");
                    };
                    let Some(description) = description else {
                        bail!("Description is required. Use --description or --file");
                    };
                    let steps = match steps_file {
                        Some(path) => read_json::<Vec<Vec<Stage>>>(&path)?,
                        None => Vec::new(),
                    };
                    AnalyzerCreateRequest {
                        name,
                        description,
                        steps,
                        supported_languages: Vec::new(),
                        language_config: None,
                        logo: None,
                    }
                }
            };

            let created = client
                .create_analyzer(org_id, &request)
                .await
                .context("Failed to create analyzer")?;

            if ctx.format.is_json() {
                return print_json(&created);
            }
            output::success(format!("Analyzer created: {}", created.id));
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_analyzer(analyzer: &Analyzer) {
    print_fields(&[
        ("ID", analyzer.id.clone()),
        ("Name", analyzer.name.clone()),
        ("Description", output::or_empty(&analyzer.description)),
        ("Languages", analyzer.languages_display()),
        ("Global", analyzer.global.to_string()),
        ("Created", output::format_time(analyzer.created_on.as_ref())),
    ]);

    if analyzer.steps.is_empty() {
        return;
    }
    println!();
    println!("{}", output::bold("Stages:"));
    for (i, group) in analyzer.steps.iter().enumerate() {
        let plugins: Vec<String> = group
            .iter()
            .map(|stage| format!("{}@{}", stage.name, stage.version))
            .collect();
        println!("  {}. {}", i + 1, plugins.join(", "));
    }
}
