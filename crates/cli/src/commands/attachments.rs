use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use jira_ops_client::Attachment;
use serde::Serialize;

use super::utils::{display_name, exit_status, format_timestamp, JiraContext};

#[derive(Serialize)]
struct AttachmentRow<'a> {
    id: &'a str,
    filename: &'a str,
    size: u64,
    mime_type: &'a str,
    author: &'a str,
    created: String,
}

impl<'a> From<&'a Attachment> for AttachmentRow<'a> {
    fn from(attachment: &'a Attachment) -> Self {
        AttachmentRow {
            id: &attachment.id,
            filename: &attachment.filename,
            size: attachment.size,
            mime_type: attachment.mime_type.as_deref().unwrap_or(""),
            author: display_name(attachment.author.as_ref()),
            created: format_timestamp(attachment.created.as_deref()),
        }
    }
}

pub async fn list_attachments(ctx: &JiraContext<'_>, key: &str) -> Result<ExitCode> {
    let attachments = ctx.jira.get_issue_attachments(key).await;
    let rows: Vec<AttachmentRow<'_>> = attachments.iter().map(AttachmentRow::from).collect();
    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn add_attachment(
    ctx: &JiraContext<'_>,
    key: &str,
    path: &Path,
    filename: Option<&str>,
) -> Result<ExitCode> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Cannot read attachment {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("{} is not a file", path.display());
    }

    let Some(attachment) = ctx.jira.add_attachment(key, path, filename).await else {
        return Ok(ExitCode::FAILURE);
    };
    ctx.renderer.success(format!(
        "Attached {} ({} bytes) to {key}",
        attachment.filename, attachment.size
    ));
    ctx.renderer.render(&AttachmentRow::from(&attachment))?;
    Ok(ExitCode::SUCCESS)
}

pub async fn delete_attachment(ctx: &JiraContext<'_>, attachment_id: &str) -> Result<ExitCode> {
    let ok = ctx.jira.delete_attachment(attachment_id).await;
    if ok {
        ctx.renderer.success(format!("Deleted attachment {attachment_id}"));
    }
    Ok(exit_status(ok))
}
