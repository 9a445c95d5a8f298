use std::process::ExitCode;

use anyhow::Result;
use jira_ops_client::Comment;
use serde::Serialize;

use super::utils::{display_name, exit_status, format_timestamp, truncate, JiraContext};

#[derive(Serialize)]
struct CommentRow<'a> {
    id: &'a str,
    author: &'a str,
    created: String,
    body: String,
}

impl<'a> From<&'a Comment> for CommentRow<'a> {
    fn from(comment: &'a Comment) -> Self {
        CommentRow {
            id: &comment.id,
            author: display_name(comment.author.as_ref()),
            created: format_timestamp(comment.created.as_deref()),
            body: truncate(&comment.body, 100),
        }
    }
}

pub async fn list_comments(ctx: &JiraContext<'_>, key: &str) -> Result<ExitCode> {
    let comments = ctx.jira.get_issue_comments(key).await;
    let rows: Vec<CommentRow<'_>> = comments.iter().map(CommentRow::from).collect();
    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn add_comment(ctx: &JiraContext<'_>, key: &str, body: &str) -> Result<ExitCode> {
    let Some(comment) = ctx.jira.add_comment(key, body).await else {
        return Ok(ExitCode::FAILURE);
    };
    ctx.renderer.success(format!("Added comment {} to {key}", comment.id));
    ctx.renderer.render(&CommentRow::from(&comment))?;
    Ok(ExitCode::SUCCESS)
}

pub async fn update_comment(
    ctx: &JiraContext<'_>,
    key: &str,
    comment_id: &str,
    body: &str,
) -> Result<ExitCode> {
    let Some(comment) = ctx.jira.update_comment(key, comment_id, body).await else {
        return Ok(ExitCode::FAILURE);
    };
    ctx.renderer.success(format!("Updated comment {comment_id} on {key}"));
    ctx.renderer.render(&CommentRow::from(&comment))?;
    Ok(ExitCode::SUCCESS)
}

pub async fn delete_comment(ctx: &JiraContext<'_>, key: &str, comment_id: &str) -> Result<ExitCode> {
    let ok = ctx.jira.delete_comment(key, comment_id).await;
    if ok {
        ctx.renderer.success(format!("Deleted comment {comment_id} from {key}"));
    }
    Ok(exit_status(ok))
}
