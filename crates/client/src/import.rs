//! Creating issues in bulk from a JSON file.
//!
//! A file holds one issue object or an array of them. Entries run in three
//! stages (epics, standard issues, subtasks) so that later stages can link to
//! keys produced by earlier ones. Within a stage every entry is attempted; a
//! failure is logged once and never stops the rest.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use jira_ops_bulk::BulkExecutor;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::JiraClient;
use crate::models::{Description, IssueDraft};

/// Field that carries the epic name on company-managed projects.
pub const EPIC_NAME_FIELD: &str = "customfield_10011";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input JSON must be an object or an array of objects")]
    UnexpectedShape,

    #[error("Input contains no issues")]
    Empty,

    #[error("Entry {index} is not a valid issue: {source}")]
    InvalidEntry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Entry {index} is missing required fields: {}", .fields.join(", "))]
    MissingFields {
        index: usize,
        fields: Vec<&'static str>,
    },
}

/// One entry of an import file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueSpec {
    #[serde(default)]
    pub project: String,
    #[serde(rename = "issuetype", default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,
    /// Explicit parent key (team-managed epics, subtasks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Summary of the epic this issue belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic_name: Option<String>,
    /// Summary of the story a subtask hangs under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_story: Option<String>,
    /// Epic key for the company-managed epic link field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub customfields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Epic,
    Standard,
    Subtask,
}

impl IssueSpec {
    pub fn kind(&self) -> IssueKind {
        let normalized: String = self
            .issue_type
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "epic" => IssueKind::Epic,
            "subtask" => IssueKind::Subtask,
            _ => IssueKind::Standard,
        }
    }

    pub fn issue_type_name(&self) -> &str {
        match self.issue_type.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ if self.kind() == IssueKind::Epic => "Epic",
            _ => "",
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.project.trim().is_empty() {
            missing.push("project");
        }
        if self.kind() != IssueKind::Epic && self.issue_type_name().trim().is_empty() {
            missing.push("issuetype");
        }
        if self.summary.trim().is_empty() {
            missing.push("summary");
        }
        missing
    }

    fn non_blank(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Builds the create payload, keeping optional fields only when
    /// `fields` allows them. `parent` is always sent.
    fn draft(
        &self,
        parent: Option<String>,
        fields: &FieldFilter,
        epic_field_id: Option<&str>,
    ) -> IssueDraft {
        let mut draft = IssueDraft::new(&self.project, self.issue_type_name(), &self.summary);

        if let Some(description) = &self.description {
            draft.description = Some(description.clone());
        }
        if !self.labels.is_empty() && fields.allows("labels") {
            draft.labels = self.labels.clone();
        }
        if let Some(assignee) = Self::non_blank(&self.assignee) {
            if fields.allows("assignee") {
                draft.assignee = Some(assignee.to_string());
            }
        }
        if let Some(priority) = Self::non_blank(&self.priority) {
            if fields.allows("priority") {
                draft.priority = Some(priority.to_string());
            }
        }
        draft.parent = parent;

        if let (Some(epic), Some(field_id)) = (Self::non_blank(&self.epic), epic_field_id) {
            if fields.allows(field_id) {
                draft = draft.field(field_id, json!(epic));
            }
        }
        if self.kind() == IssueKind::Epic && fields.lists(EPIC_NAME_FIELD) {
            let name = Self::non_blank(&self.epic_name).unwrap_or(&self.summary);
            draft = draft.field(EPIC_NAME_FIELD, json!(name));
        }
        for (id, value) in &self.customfields {
            if fields.allows(id) {
                draft = draft.field(id.clone(), value.clone());
            }
        }

        draft
    }
}

/// Field ids from create metadata. Empty means the metadata was unavailable,
/// in which case nothing is filtered out.
#[derive(Debug, Default)]
struct FieldFilter(Vec<String>);

impl FieldFilter {
    fn allows(&self, id: &str) -> bool {
        self.0.is_empty() || self.lists(id)
    }

    fn lists(&self, id: &str) -> bool {
        self.0.iter().any(|field| field == id)
    }
}

/// Validated import entries, split into stages.
#[derive(Debug, Default, Clone)]
pub struct ImportPlan {
    pub epics: Vec<IssueSpec>,
    pub issues: Vec<IssueSpec>,
    pub subtasks: Vec<IssueSpec>,
}

impl ImportPlan {
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates every entry before anything is sent.
    pub fn from_json(raw: &str) -> Result<Self, ImportError> {
        let entries = match serde_json::from_str::<Value>(raw)? {
            Value::Array(entries) => entries,
            entry @ Value::Object(_) => vec![entry],
            _ => return Err(ImportError::UnexpectedShape),
        };
        if entries.is_empty() {
            return Err(ImportError::Empty);
        }

        let mut plan = ImportPlan::default();
        for (index, entry) in entries.into_iter().enumerate() {
            if !entry.is_object() {
                return Err(ImportError::UnexpectedShape);
            }
            let spec: IssueSpec = serde_json::from_value(entry)
                .map_err(|source| ImportError::InvalidEntry { index, source })?;

            let missing = spec.missing_fields();
            if !missing.is_empty() {
                return Err(ImportError::MissingFields {
                    index,
                    fields: missing,
                });
            }

            match spec.kind() {
                IssueKind::Epic => plan.epics.push(spec),
                IssueKind::Standard => plan.issues.push(spec),
                IssueKind::Subtask => plan.subtasks.push(spec),
            }
        }

        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.epics.len() + self.issues.len() + self.subtasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create payloads as they would be sent, without contacting Jira.
    /// Links to issues created earlier in the same run show as placeholders.
    pub fn preview(&self, epic_field_id: Option<&str>) -> Vec<Value> {
        let unfiltered = FieldFilter::default();
        let epics = self
            .epics
            .iter()
            .map(|spec| spec.draft(spec.parent.clone(), &unfiltered, epic_field_id));
        let issues = self.issues.iter().map(|spec| {
            let parent = spec.parent.clone().or_else(|| {
                IssueSpec::non_blank(&spec.epic_name).map(|name| format!("<epic: {name}>"))
            });
            spec.draft(parent, &unfiltered, epic_field_id)
        });
        let subtasks = self.subtasks.iter().map(|spec| {
            let parent = spec.parent.clone().or_else(|| {
                IssueSpec::non_blank(&spec.parent_story).map(|name| format!("<story: {name}>"))
            });
            spec.draft(parent, &unfiltered, epic_field_id)
        });

        epics
            .chain(issues)
            .chain(subtasks)
            .map(|draft| draft.to_payload())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedIssue {
    pub key: String,
    pub summary: String,
    pub issue_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedImport {
    pub summary: String,
    pub issue_type: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportOutcome {
    pub created: Vec<ImportedIssue>,
    /// Epics that already existed and were linked instead of created.
    pub reused: Vec<ImportedIssue>,
    pub failed: Vec<FailedImport>,
}

impl ImportOutcome {
    /// True when at least one issue was created or reused.
    pub fn is_success(&self) -> bool {
        !self.created.is_empty() || !self.reused.is_empty()
    }
}

enum Resolved {
    Created(ImportedIssue),
    Reused(ImportedIssue),
}

impl Resolved {
    fn issue(&self) -> &ImportedIssue {
        match self {
            Resolved::Created(issue) | Resolved::Reused(issue) => issue,
        }
    }
}

pub struct Importer<'a> {
    client: &'a JiraClient,
    executor: BulkExecutor,
    epic_field_id: Option<String>,
}

impl<'a> Importer<'a> {
    pub fn new(client: &'a JiraClient) -> Self {
        Self {
            client,
            executor: BulkExecutor::new(1),
            epic_field_id: None,
        }
    }

    pub fn with_executor(mut self, executor: BulkExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_epic_field_id(mut self, field_id: Option<String>) -> Self {
        self.epic_field_id = field_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub async fn run(&self, plan: ImportPlan) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();

        info!("Processing {} epics", plan.epics.len());
        let epics = self
            .stage(plan.epics, &mut outcome, |spec| self.import_epic(spec))
            .await;
        let epic_keys: HashMap<String, String> = epics
            .into_iter()
            .map(|issue| (issue.summary, issue.key))
            .collect();

        info!("Processing {} issues", plan.issues.len());
        let stories = self
            .stage(plan.issues, &mut outcome, |spec| {
                self.import_issue(spec, &epic_keys)
            })
            .await;
        let story_keys: HashMap<String, String> = stories
            .into_iter()
            .map(|issue| (issue.summary, issue.key))
            .collect();

        info!("Processing {} subtasks", plan.subtasks.len());
        self.stage(plan.subtasks, &mut outcome, |spec| {
            self.import_subtask(spec, &story_keys)
        })
        .await;

        info!(
            created = outcome.created.len(),
            reused = outcome.reused.len(),
            failed = outcome.failed.len(),
            "Import finished"
        );
        outcome
    }

    /// Runs one stage and folds its results into `outcome`, returning the
    /// issues that later stages may link to.
    async fn stage<F, Fut>(
        &self,
        specs: Vec<IssueSpec>,
        outcome: &mut ImportOutcome,
        job: F,
    ) -> Vec<ImportedIssue>
    where
        F: Fn(IssueSpec) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<Resolved>>,
    {
        let labels: Vec<(String, String)> = specs
            .iter()
            .map(|spec| (spec.summary.clone(), spec.issue_type_name().to_string()))
            .collect();

        let results = self.executor.execute_with_results(specs, job).await;

        let mut linked = Vec::new();
        for (_, resolved) in results.successful {
            linked.push(resolved.issue().clone());
            match resolved {
                Resolved::Created(issue) => outcome.created.push(issue),
                Resolved::Reused(issue) => outcome.reused.push(issue),
            }
        }
        for (index, error) in results.failed {
            let (summary, issue_type) = labels.get(index).cloned().unwrap_or_default();
            outcome.failed.push(FailedImport {
                summary,
                issue_type,
                error: format!("{error:#}"),
            });
        }
        linked
    }

    async fn import_epic(&self, spec: IssueSpec) -> anyhow::Result<Resolved> {
        let existing = self
            .client
            .find_issue_by_summary(&spec.project, "Epic", &spec.summary)
            .await;
        match existing {
            Ok(Some(key)) => {
                info!("Found existing epic: {key} ({})", spec.summary);
                return Ok(Resolved::Reused(ImportedIssue {
                    key,
                    summary: spec.summary,
                    issue_type: "Epic".to_string(),
                }));
            }
            Ok(None) => {}
            Err(e) => warn!(
                error = %e,
                "Failed to look up epic '{}'; creating a new one",
                spec.summary
            ),
        }

        self.create(&spec, spec.parent.clone()).await
    }

    async fn import_issue(
        &self,
        spec: IssueSpec,
        epic_keys: &HashMap<String, String>,
    ) -> anyhow::Result<Resolved> {
        let mut parent = spec.parent.clone();
        if let Some(epic_name) = IssueSpec::non_blank(&spec.epic_name) {
            match epic_keys.get(epic_name) {
                Some(key) => {
                    info!("Linking {} to epic {key}", spec.summary);
                    parent = Some(key.clone());
                }
                None => {
                    let found = self
                        .client
                        .find_issue_by_summary(&spec.project, "Epic", epic_name)
                        .await;
                    match found {
                        Ok(Some(key)) => {
                            info!("Linking {} to existing epic {key}", spec.summary);
                            parent = Some(key);
                        }
                        Ok(None) => warn!(
                            "Epic '{epic_name}' not found for '{}'; creating without it",
                            spec.summary
                        ),
                        Err(e) => warn!(
                            error = %e,
                            "Failed to look up epic '{epic_name}' for '{}'; creating without it",
                            spec.summary
                        ),
                    }
                }
            }
        }

        self.create(&spec, parent).await
    }

    async fn import_subtask(
        &self,
        spec: IssueSpec,
        story_keys: &HashMap<String, String>,
    ) -> anyhow::Result<Resolved> {
        let mut parent = spec.parent.clone();
        if let Some(story) = IssueSpec::non_blank(&spec.parent_story) {
            if let Some(key) = story_keys.get(story) {
                info!("Linking subtask {} to new story {key}", spec.summary);
                parent = Some(key.clone());
            } else {
                let found = self
                    .client
                    .find_issue_by_summary(&spec.project, "Story", story)
                    .await;
                match found {
                    Ok(Some(key)) => {
                        info!("Linking subtask {} to existing story {key}", spec.summary);
                        parent = Some(key);
                    }
                    Ok(None) => warn!(
                        "Parent story '{story}' not found for subtask '{}'",
                        spec.summary
                    ),
                    Err(e) => warn!(
                        error = %e,
                        "Failed to look up parent story '{story}' for subtask '{}'",
                        spec.summary
                    ),
                }
            }
        }

        self.create(&spec, parent).await
    }

    async fn create(&self, spec: &IssueSpec, parent: Option<String>) -> anyhow::Result<Resolved> {
        let issue_type = spec.issue_type_name();

        // Metadata only narrows optional fields; an unavailable listing is not fatal.
        let fields = match self.client.create_fields(&spec.project, issue_type).await {
            Ok(fields) => FieldFilter(fields),
            Err(e) => {
                warn!(error = %e, "Create metadata unavailable for {issue_type} in {}", spec.project);
                FieldFilter::default()
            }
        };

        let draft = spec.draft(parent, &fields, self.epic_field_id.as_deref());
        let created = self
            .client
            .create_issue(&draft)
            .await
            .with_context(|| format!("Failed to create {issue_type} '{}'", spec.summary))?;

        info!(
            "Created {}: {} ({})",
            issue_type.to_lowercase(),
            created.key,
            spec.summary
        );
        Ok(Resolved::Created(ImportedIssue {
            key: created.key,
            summary: spec.summary.clone(),
            issue_type: issue_type.to_string(),
        }))
    }
}

/// Sample import file covering epics, stories and subtasks.
pub fn template(project: &str) -> Value {
    json!([
        {
            "project": project,
            "issuetype": "Epic",
            "summary": "Customer onboarding",
            "description": "Everything a new customer touches in the first week",
            "epic_name": "Onboarding"
        },
        {
            "project": project,
            "issuetype": "Story",
            "summary": "Send welcome email",
            "description": "Triggered when the account is activated",
            "epic_name": "Customer onboarding",
            "priority": "Medium",
            "labels": ["email", "onboarding"]
        },
        {
            "project": project,
            "issuetype": "Story",
            "summary": "Guided product tour",
            "description": "Walk the user through the dashboard on first login",
            "epic_name": "Customer onboarding",
            "labels": ["frontend"]
        },
        {
            "project": project,
            "issuetype": "Subtask",
            "summary": "Write welcome email copy",
            "parent_story": "Send welcome email",
            "labels": ["content"]
        },
        {
            "project": project,
            "issuetype": "Task",
            "summary": "Audit onboarding analytics events",
            "assignee": "",
            "customfields": {}
        }
    ])
}
