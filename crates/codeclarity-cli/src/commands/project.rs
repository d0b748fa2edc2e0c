use anyhow::{Context as _, Result};
use clap::Subcommand;

use codeclarity_core::models::ProjectImportRequest;

use super::{Context, PageArgs};
use crate::output::{self, print_fields, print_json, truncate_string, Table};

#[derive(Debug, Clone, Subcommand)]
pub enum ProjectCommand {
    /// List projects
    List {
        #[command(flatten)]
        page: PageArgs,

        /// Filter by name
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a project
    Get {
        /// Project ID
        id: String,
    },
    /// Import a repository as a project
    Create {
        /// Repository URL
        #[arg(long)]
        url: String,

        /// Integration ID the repository is accessed through
        #[arg(long = "integration")]
        integration_id: String,

        /// Project name (defaults to the repository name)
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },
}

pub async fn run(ctx: &Context, command: ProjectCommand) -> Result<()> {
    let org_id = ctx.org_id()?;
    let client = ctx.client()?;

    match command {
        ProjectCommand::List { page, search } => {
            let projects = client
                .list_projects(org_id, page.page, page.per_page, search.as_deref())
                .await
                .context("Failed to list projects")?;

            if ctx.format.is_json() {
                return print_json(&projects);
            }
            if projects.is_empty() {
                output::info("No projects found");
                return Ok(());
            }

            let mut table = Table::new(&["id", "name", "type", "branch", "added"]);
            for project in &projects.data {
                table.add_row(vec![
                    project.id.clone(),
                    truncate_string(&project.name, 40),
                    output::or_empty(&project.project_type),
                    output::or_empty(&project.default_branch),
                    output::format_time(project.added_on.as_ref()),
                ]);
            }
            table.print();
            if projects.has_multiple_pages() {
                println!("\n{}", projects.page_summary());
            }
        }
        ProjectCommand::Get { id } => {
            let project = client
                .get_project(org_id, &id)
                .await
                .context("Failed to get project")?;

            if ctx.format.is_json() {
                return print_json(&project);
            }
            print_fields(&[
                ("ID", project.id.clone()),
                ("Name", project.name.clone()),
                ("Description", output::or_empty(&project.description)),
                ("URL", output::or_empty(&project.url)),
                ("Type", output::or_empty(&project.project_type)),
                ("Provider", output::or_empty(&project.integration_provider)),
                ("Branch", output::or_empty(&project.default_branch)),
                ("Added", output::format_time(project.added_on.as_ref())),
            ]);
            if project.invalid {
                output::warning("Project is marked invalid on the server");
            }
        }
        ProjectCommand::Create {
            url,
            integration_id,
            name,
            description,
        } => {
            let request = ProjectImportRequest {
                integration_id,
                url,
                name,
                description,
            };
            let created = client
                .import_project(org_id, &request)
                .await
                .context("Failed to import project")?;

            if ctx.format.is_json() {
                return print_json(&created);
            }
            output::success(format!("Project imported: {}", created.id));
        }
    }
    Ok(())
}
