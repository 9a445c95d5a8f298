use std::process::ExitCode;

use anyhow::Result;
use jira_ops_client::Transition;
use serde::Serialize;
use tracing::error;

use super::utils::{exit_status, JiraContext};

pub async fn list_transitions(ctx: &JiraContext<'_>, key: &str) -> Result<ExitCode> {
    let transitions = ctx.jira.get_issue_transitions(key).await;

    #[derive(Serialize)]
    struct Row<'a> {
        id: &'a str,
        name: &'a str,
        to_status: &'a str,
        description: &'a str,
    }

    let rows: Vec<Row<'_>> = transitions
        .iter()
        .map(|t| Row {
            id: &t.id,
            name: &t.name,
            to_status: t.to_status.as_deref().unwrap_or(""),
            description: t.description.as_deref().unwrap_or(""),
        })
        .collect();

    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

/// Matches by ID first, then by transition or target-status name ignoring case.
fn resolve<'a>(transitions: &'a [Transition], wanted: &str) -> Option<&'a Transition> {
    let wanted = wanted.trim();
    transitions
        .iter()
        .find(|t| t.id == wanted)
        .or_else(|| {
            transitions
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(wanted))
        })
        .or_else(|| {
            transitions.iter().find(|t| {
                t.to_status
                    .as_deref()
                    .is_some_and(|status| status.eq_ignore_ascii_case(wanted))
            })
        })
}

pub async fn transition_issue(
    ctx: &JiraContext<'_>,
    key: &str,
    transition: &str,
    comment: Option<&str>,
) -> Result<ExitCode> {
    let transitions = ctx.jira.get_issue_transitions(key).await;
    let Some(selected) = resolve(&transitions, transition) else {
        let available: Vec<&str> = transitions.iter().map(|t| t.name.as_str()).collect();
        error!(
            "Transition '{transition}' is not available for {key}. Available: {}",
            if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            }
        );
        return Ok(ExitCode::FAILURE);
    };

    let ok = ctx.jira.transition_issue(key, &selected.id, comment).await;
    if ok {
        let target = selected.to_status.as_deref().unwrap_or(&selected.name);
        ctx.renderer.success(format!("Moved {key} to {target}"));
    }
    Ok(exit_status(ok))
}
