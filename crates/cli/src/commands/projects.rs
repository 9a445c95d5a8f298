use std::process::ExitCode;

use anyhow::Result;
use jira_ops_client::Project;
use serde::Serialize;

use super::utils::{display_name, truncate, JiraContext};

#[derive(Serialize)]
pub(crate) struct ProjectRow<'a> {
    key: &'a str,
    name: &'a str,
    project_type: &'a str,
    lead: &'a str,
}

impl<'a> From<&'a Project> for ProjectRow<'a> {
    fn from(project: &'a Project) -> Self {
        ProjectRow {
            key: &project.key,
            name: &project.name,
            project_type: project.project_type.as_deref().unwrap_or(""),
            lead: display_name(project.lead.as_ref()),
        }
    }
}

pub async fn list_projects(ctx: &JiraContext<'_>) -> Result<ExitCode> {
    let projects = ctx.jira.get_projects().await;
    let rows: Vec<ProjectRow<'_>> = projects.iter().map(ProjectRow::from).collect();
    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn get_project(ctx: &JiraContext<'_>, key: &str) -> Result<ExitCode> {
    let Some(project) = ctx.jira.get_project(key).await else {
        return Ok(ExitCode::FAILURE);
    };

    #[derive(Serialize)]
    struct Row<'a> {
        key: &'a str,
        name: &'a str,
        project_type: &'a str,
        lead: &'a str,
        issue_types: Vec<&'a str>,
        description: &'a str,
    }

    let row = Row {
        key: &project.key,
        name: &project.name,
        project_type: project.project_type.as_deref().unwrap_or(""),
        lead: display_name(project.lead.as_ref()),
        issue_types: project.issue_types.iter().map(|t| t.name.as_str()).collect(),
        description: project.description.as_deref().unwrap_or(""),
    };

    ctx.renderer.render(&row)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn list_components(ctx: &JiraContext<'_>, key: &str) -> Result<ExitCode> {
    let components = ctx.jira.get_project_components(key).await;

    #[derive(Serialize)]
    struct Row<'a> {
        id: &'a str,
        name: &'a str,
        lead: &'a str,
        description: String,
    }

    let rows: Vec<Row<'_>> = components
        .iter()
        .map(|component| Row {
            id: &component.id,
            name: &component.name,
            lead: display_name(component.lead.as_ref()),
            description: truncate(component.description.as_deref().unwrap_or(""), 80),
        })
        .collect();

    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn list_versions(ctx: &JiraContext<'_>, key: &str) -> Result<ExitCode> {
    let versions = ctx.jira.get_project_versions(key).await;

    #[derive(Serialize)]
    struct Row<'a> {
        id: &'a str,
        name: &'a str,
        released: bool,
        archived: bool,
        release_date: &'a str,
    }

    let rows: Vec<Row<'_>> = versions
        .iter()
        .map(|version| Row {
            id: &version.id,
            name: &version.name,
            released: version.released,
            archived: version.archived,
            release_date: version.release_date.as_deref().unwrap_or(""),
        })
        .collect();

    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}
