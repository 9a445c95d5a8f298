use std::process::ExitCode;

use jira_ops_client::models::parse_timestamp;
use jira_ops_client::{JiraOperations, User};
use jira_ops_output::OutputRenderer;

pub struct JiraContext<'a> {
    pub jira: &'a JiraOperations,
    pub renderer: &'a OutputRenderer,
}

/// `2025-01-01T10:00:00.000+0000` as `2025-01-01 10:00`; unparseable values pass through.
pub fn format_timestamp(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => parse_timestamp(raw)
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| raw.to_string()),
        None => String::new(),
    }
}

pub fn display_name(user: Option<&User>) -> &str {
    user.map(|u| u.display_name.as_str()).unwrap_or("")
}

/// Cuts `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let kept: String = flat.chars().take(max).collect();
    format!("{}...", kept.trim_end())
}

pub fn exit_status(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
