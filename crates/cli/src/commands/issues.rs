use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Args;
use jira_ops_client::{Issue, IssueDraft, IssueUpdate, JqlBuilder};
use serde::Serialize;

use super::utils::{display_name, exit_status, format_timestamp, truncate, JiraContext};

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Raw JQL query; the words are joined with spaces (conflicts with filter flags)
    #[arg(conflicts_with_all = ["project", "assignee", "status", "issue_type", "text"])]
    pub jql: Vec<String>,

    /// Filter by project
    #[arg(short = 'p', long)]
    pub project: Option<String>,

    /// Filter by assignee (use @me for current user)
    #[arg(short = 'a', long)]
    pub assignee: Option<String>,

    /// Filter by status (repeatable)
    #[arg(short = 's', long)]
    pub status: Vec<String>,

    /// Filter by issue type
    #[arg(short = 't', long)]
    pub issue_type: Option<String>,

    /// Free text search in summary
    #[arg(long)]
    pub text: Option<String>,

    /// Maximum number of issues to return
    #[arg(long, default_value_t = 50)]
    pub limit: u32,

    /// Display the JQL query being run
    #[arg(long)]
    pub show_query: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Project key
    #[arg(long)]
    pub project: String,
    /// Issue type (e.g. Task, Bug, Story)
    #[arg(long)]
    pub issue_type: String,
    /// Issue summary
    #[arg(long)]
    pub summary: String,
    /// Issue description
    #[arg(long)]
    pub description: Option<String>,
    /// Priority name (e.g. High, Medium, Low)
    #[arg(long)]
    pub priority: Option<String>,
    /// Assignee account ID
    #[arg(long)]
    pub assignee: Option<String>,
    /// Label (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,
    /// Parent issue key (for subtasks)
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Issue key
    pub key: String,
    /// New summary
    #[arg(long)]
    pub summary: Option<String>,
    /// New description
    #[arg(long)]
    pub description: Option<String>,
    /// New priority
    #[arg(long)]
    pub priority: Option<String>,
    /// New assignee account ID
    #[arg(long)]
    pub assignee: Option<String>,
    /// Replace labels (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,
}

/// Raw JQL wins; otherwise the filter flags are combined with AND.
pub(crate) fn build_query(args: &SearchArgs) -> Result<String> {
    if !args.jql.is_empty() {
        return Ok(args.jql.join(" "));
    }

    let mut builder = JqlBuilder::new();
    if let Some(project) = &args.project {
        builder = builder.eq("project", project);
    }
    if let Some(assignee) = &args.assignee {
        builder = builder.eq("assignee", assignee);
    }
    builder = builder.in_list("status", &args.status);
    if let Some(issue_type) = &args.issue_type {
        builder = builder.eq("issuetype", issue_type);
    }
    if let Some(text) = &args.text {
        builder = builder.contains("summary", text);
    }

    if builder.is_empty() {
        bail!("Provide a JQL query or at least one filter (--project, --assignee, --status, --issue-type, --text)");
    }
    Ok(builder.order_by("updated DESC").finish())
}

#[derive(Serialize)]
pub(crate) struct IssueRow<'a> {
    key: &'a str,
    issue_type: &'a str,
    status: &'a str,
    priority: &'a str,
    assignee: &'a str,
    summary: &'a str,
    updated: String,
}

impl<'a> From<&'a Issue> for IssueRow<'a> {
    fn from(issue: &'a Issue) -> Self {
        IssueRow {
            key: &issue.key,
            issue_type: issue.issue_type.as_ref().map(|t| t.name.as_str()).unwrap_or(""),
            status: issue.status.as_ref().map(|s| s.name.as_str()).unwrap_or(""),
            priority: issue.priority.as_ref().map(|p| p.name.as_str()).unwrap_or(""),
            assignee: display_name(issue.assignee.as_ref()),
            summary: &issue.summary,
            updated: format_timestamp(issue.updated.as_deref()),
        }
    }
}

pub async fn get_issue(ctx: &JiraContext<'_>, key: &str) -> Result<ExitCode> {
    let Some(issue) = ctx.jira.get_issue(key).await else {
        return Ok(ExitCode::FAILURE);
    };

    #[derive(Serialize)]
    struct Row<'a> {
        key: &'a str,
        summary: &'a str,
        issue_type: &'a str,
        status: &'a str,
        priority: &'a str,
        assignee: &'a str,
        reporter: &'a str,
        parent: &'a str,
        labels: &'a [String],
        created: String,
        updated: String,
        description: String,
    }

    let row = Row {
        key: &issue.key,
        summary: &issue.summary,
        issue_type: issue.issue_type.as_ref().map(|t| t.name.as_str()).unwrap_or(""),
        status: issue.status.as_ref().map(|s| s.name.as_str()).unwrap_or(""),
        priority: issue.priority.as_ref().map(|p| p.name.as_str()).unwrap_or(""),
        assignee: issue
            .assignee
            .as_ref()
            .map(|a| a.display_name.as_str())
            .unwrap_or("Unassigned"),
        reporter: display_name(issue.reporter.as_ref()),
        parent: issue.parent.as_deref().unwrap_or(""),
        labels: &issue.labels,
        created: format_timestamp(issue.created.as_deref()),
        updated: format_timestamp(issue.updated.as_deref()),
        description: truncate(issue.description.as_deref().unwrap_or(""), 200),
    };

    ctx.renderer.render(&row)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn search_issues(ctx: &JiraContext<'_>, args: &SearchArgs) -> Result<ExitCode> {
    let jql = build_query(args)?;
    if args.show_query {
        eprintln!("JQL: {jql}");
    }

    let issues = ctx.jira.search_issues(&jql, args.limit).await;
    let rows: Vec<IssueRow<'_>> = issues.iter().map(IssueRow::from).collect();
    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn create_issue(ctx: &JiraContext<'_>, args: CreateArgs) -> Result<ExitCode> {
    let mut draft = IssueDraft::new(args.project, args.issue_type, args.summary).labels(args.labels);
    if let Some(description) = args.description {
        draft = draft.description(description);
    }
    if let Some(priority) = args.priority {
        draft = draft.priority(priority);
    }
    if let Some(assignee) = args.assignee {
        draft = draft.assignee(assignee);
    }
    if let Some(parent) = args.parent {
        draft = draft.parent(parent);
    }

    let Some(created) = ctx.jira.create_issue(&draft).await else {
        return Ok(ExitCode::FAILURE);
    };

    ctx.renderer.success(format!("Created issue {}", created.key));
    ctx.renderer.render(&created)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn update_issue(ctx: &JiraContext<'_>, args: UpdateArgs) -> Result<ExitCode> {
    let update = IssueUpdate {
        summary: args.summary,
        description: args.description.map(Into::into),
        priority: args.priority,
        assignee: args.assignee,
        labels: (!args.labels.is_empty()).then_some(args.labels),
    };

    let ok = ctx.jira.update_issue(&args.key, &update).await;
    if ok {
        ctx.renderer.success(format!("Updated issue {}", args.key));
    }
    Ok(exit_status(ok))
}

pub async fn delete_issue(
    ctx: &JiraContext<'_>,
    key: &str,
    delete_subtasks: bool,
    force: bool,
) -> Result<ExitCode> {
    if !force {
        let scope = if delete_subtasks { " and its subtasks" } else { "" };
        ctx.renderer.notice(format!(
            "About to delete issue {key}{scope}. Use --force to confirm deletion"
        ));
        return Ok(ExitCode::SUCCESS);
    }

    let ok = ctx.jira.delete_issue(key, delete_subtasks).await;
    if ok {
        ctx.renderer.success(format!("Deleted issue {key}"));
    }
    Ok(exit_status(ok))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        search: SearchArgs,
    }

    fn parse(args: &[&str]) -> SearchArgs {
        Harness::parse_from(std::iter::once("search").chain(args.iter().copied())).search
    }

    #[test]
    fn test_raw_jql_words_are_joined() {
        let args = parse(&["project", "=", "OPS", "AND", "status = 'To Do'"]);
        assert_eq!(build_query(&args).unwrap(), "project = OPS AND status = 'To Do'");
    }

    #[test]
    fn test_filters_build_jql() {
        let args = parse(&[
            "--project", "OPS", "-a", "@me", "-s", "To Do", "-s", "In Progress", "--text", "login",
        ]);
        assert_eq!(
            build_query(&args).unwrap(),
            "project = \"OPS\" AND assignee = currentUser() AND status IN (\"To Do\", \"In Progress\") AND summary ~ \"login\" ORDER BY updated DESC"
        );
        assert_eq!(args.limit, 50);
    }

    #[test]
    fn test_jql_conflicts_with_filters() {
        let result = Harness::try_parse_from(["search", "project = OPS", "--project", "OPS"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_query_is_an_error() {
        let err = build_query(&parse(&[])).unwrap_err();
        assert!(err.to_string().contains("at least one filter"));
    }
}
