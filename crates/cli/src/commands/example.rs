use std::process::ExitCode;

use anyhow::Result;
use jira_ops_client::JqlBuilder;
use jira_ops_output::OutputFormat;

use super::issues::IssueRow;
use super::projects::ProjectRow;
use super::users::UserRow;
use super::utils::JiraContext;

const SAMPLE: usize = 3;

/// Lists a few projects, the users of the first one and its open issues.
pub async fn run(ctx: &JiraContext<'_>) -> Result<ExitCode> {
    let projects = ctx.jira.get_projects().await;
    heading(ctx, "Projects");
    let rows: Vec<ProjectRow<'_>> = projects.iter().take(SAMPLE).map(ProjectRow::from).collect();
    ctx.renderer.render(&rows)?;

    let Some(first) = projects.first() else {
        return Ok(ExitCode::SUCCESS);
    };

    let users = ctx.jira.get_users(Some(&first.key)).await;
    heading(ctx, &format!("Users in {}", first.key));
    let rows: Vec<UserRow<'_>> = users.iter().take(SAMPLE).map(UserRow::from).collect();
    ctx.renderer.render(&rows)?;

    let jql = JqlBuilder::new()
        .eq("project", &first.key)
        .eq("statusCategory", "To Do")
        .order_by("created DESC")
        .finish();
    let issues = ctx.jira.search_issues(&jql, 5).await;
    heading(ctx, &format!("Open issues in {}", first.key));
    let rows: Vec<IssueRow<'_>> = issues.iter().map(IssueRow::from).collect();
    ctx.renderer.render(&rows)?;

    Ok(ExitCode::SUCCESS)
}

fn heading(ctx: &JiraContext<'_>, title: &str) {
    if ctx.renderer.format() == OutputFormat::Table {
        println!("\n{title}");
    }
}
