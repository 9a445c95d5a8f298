use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use jira_ops_bulk::BulkExecutor;
use jira_ops_client::import::template;
use jira_ops_client::{ImportOutcome, ImportPlan, Importer};
use jira_ops_output::{OutputFormat, OutputRenderer};
use serde::Serialize;

use super::utils::{exit_status, JiraContext};

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// JSON file with one issue object or an array of them
    pub file: PathBuf,

    /// Custom field that links an issue to its epic (e.g. customfield_10014)
    #[arg(long)]
    pub epic_field_id: Option<String>,

    /// Issues created in parallel within each stage
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=16))]
    pub concurrency: u16,

    /// Print the payloads that would be sent without contacting Jira
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Where to write the sample file
    pub path: PathBuf,

    /// Project key to put in the sample entries
    #[arg(long, default_value = "PROJ")]
    pub project: String,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

fn load_plan(args: &ImportArgs) -> Result<ImportPlan> {
    ImportPlan::from_path(&args.file)
        .with_context(|| format!("Failed to load import file {}", args.file.display()))
}

pub fn preview(args: &ImportArgs, renderer: &OutputRenderer) -> Result<ExitCode> {
    let plan = load_plan(args)?;
    let payloads = plan.preview(args.epic_field_id.as_deref());

    // Nested payloads read poorly as a table.
    if renderer.format() == OutputFormat::Table {
        println!("{}", serde_json::to_string_pretty(&payloads)?);
    } else {
        renderer.render(&payloads)?;
    }
    renderer.notice(format!(
        "Dry run: {} entries ({} epics, {} issues, {} subtasks); nothing was sent",
        plan.len(),
        plan.epics.len(),
        plan.issues.len(),
        plan.subtasks.len()
    ));
    Ok(ExitCode::SUCCESS)
}

pub async fn run(ctx: &JiraContext<'_>, args: &ImportArgs) -> Result<ExitCode> {
    let plan = load_plan(args)?;
    let client = ctx
        .jira
        .client()
        .ok_or_else(|| anyhow!("Not connected to Jira"))?;

    let executor = BulkExecutor::new(usize::from(args.concurrency))
        .with_progress(ctx.renderer.format() == OutputFormat::Table);
    let outcome = Importer::new(client)
        .with_executor(executor)
        .with_epic_field_id(args.epic_field_id.clone())
        .run(plan)
        .await;

    ctx.renderer.render(&outcome_rows(&outcome))?;

    let summary = format!(
        "{} created, {} existing epics reused, {} failed",
        outcome.created.len(),
        outcome.reused.len(),
        outcome.failed.len()
    );
    if outcome.failed.is_empty() {
        ctx.renderer.success(summary);
    } else {
        ctx.renderer.notice(summary);
    }
    Ok(exit_status(outcome.is_success()))
}

#[derive(Serialize, Debug)]
struct OutcomeRow<'a> {
    result: &'static str,
    key: &'a str,
    issue_type: &'a str,
    summary: &'a str,
    error: &'a str,
}

fn outcome_rows(outcome: &ImportOutcome) -> Vec<OutcomeRow<'_>> {
    let created = outcome.created.iter().map(|issue| OutcomeRow {
        result: "created",
        key: &issue.key,
        issue_type: &issue.issue_type,
        summary: &issue.summary,
        error: "",
    });
    let reused = outcome.reused.iter().map(|issue| OutcomeRow {
        result: "reused",
        key: &issue.key,
        issue_type: &issue.issue_type,
        summary: &issue.summary,
        error: "",
    });
    let failed = outcome.failed.iter().map(|failure| OutcomeRow {
        result: "failed",
        key: "",
        issue_type: &failure.issue_type,
        summary: &failure.summary,
        error: &failure.error,
    });
    reused.chain(created).chain(failed).collect()
}

pub fn write_template(args: &TemplateArgs, renderer: &OutputRenderer) -> Result<ExitCode> {
    if args.path.exists() && !args.force {
        bail!(
            "{} already exists. Use --force to overwrite it",
            args.path.display()
        );
    }

    let body = serde_json::to_string_pretty(&template(&args.project))?;
    fs::write(&args.path, format!("{body}\n"))
        .with_context(|| format!("Unable to write {}", args.path.display()))?;

    renderer.success(format!("Wrote sample import file to {}", args.path.display()));
    Ok(ExitCode::SUCCESS)
}
