use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use super::utils::JiraContext;

pub async fn list_issue_types(ctx: &JiraContext<'_>, project: Option<&str>) -> Result<ExitCode> {
    let issue_types = ctx.jira.get_issue_types(project).await;

    #[derive(Serialize)]
    struct Row<'a> {
        id: &'a str,
        name: &'a str,
        subtask: bool,
        description: &'a str,
    }

    let rows: Vec<Row<'_>> = issue_types
        .iter()
        .map(|it| Row {
            id: &it.id,
            name: &it.name,
            subtask: it.subtask,
            description: it.description.as_deref().unwrap_or(""),
        })
        .collect();

    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn list_priorities(ctx: &JiraContext<'_>) -> Result<ExitCode> {
    let priorities = ctx.jira.get_priorities().await;

    #[derive(Serialize)]
    struct Row<'a> {
        id: &'a str,
        name: &'a str,
        description: &'a str,
    }

    let rows: Vec<Row<'_>> = priorities
        .iter()
        .map(|p| Row {
            id: &p.id,
            name: &p.name,
            description: p.description.as_deref().unwrap_or(""),
        })
        .collect();

    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn list_statuses(ctx: &JiraContext<'_>) -> Result<ExitCode> {
    let statuses = ctx.jira.get_statuses().await;

    #[derive(Serialize)]
    struct Row<'a> {
        id: &'a str,
        name: &'a str,
        category: &'a str,
        description: &'a str,
    }

    let rows: Vec<Row<'_>> = statuses
        .iter()
        .map(|status| Row {
            id: &status.id,
            name: &status.name,
            category: status.category().unwrap_or(""),
            description: status.description.as_deref().unwrap_or(""),
        })
        .collect();

    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}
