//! Snapshots of Jira resources as returned by the REST API, plus the
//! outbound payloads for creating and editing issues.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::adf::{adf_to_text, text_to_adf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub account_id: String,
    /// Username on Jira Server/Data Center; absent on Cloud.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub active: bool,
    /// `atlassian` for people; `app` and `customer` for the rest.
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl User {
    /// Account id on Cloud, username on Server.
    pub fn identifier(&self) -> &str {
        if self.account_id.is_empty() {
            self.name.as_deref().unwrap_or_default()
        } else {
            &self.account_id
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subtask: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "projectTypeKey", default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub lead: Option<User>,
    #[serde(default)]
    pub issue_types: Vec<IssueType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCategory {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status_category: Option<StatusCategory>,
}

impl Status {
    pub fn category(&self) -> Option<&str> {
        self.status_category.as_ref().map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lead: Option<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Issue {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub issue_type: Option<IssueType>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub assignee: Option<User>,
    pub reporter: Option<User>,
    pub labels: Vec<String>,
    pub parent: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

/// Wire shape of an issue: everything interesting lives under `fields`.
#[derive(Deserialize)]
pub(crate) struct IssueRecord {
    #[serde(default)]
    id: String,
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Value,
    #[serde(rename = "issuetype", default)]
    issue_type: Option<IssueType>,
    #[serde(default)]
    status: Option<Status>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    assignee: Option<User>,
    #[serde(default)]
    reporter: Option<User>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    parent: Option<IssueRef>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    updated: Option<String>,
}

#[derive(Deserialize, Default)]
pub(crate) struct IssueRef {
    key: String,
}

impl From<IssueRecord> for Issue {
    fn from(record: IssueRecord) -> Self {
        let fields = record.fields;
        let description = match adf_to_text(&fields.description) {
            text if text.is_empty() => None,
            text => Some(text),
        };

        Issue {
            id: record.id,
            key: record.key,
            summary: fields.summary.unwrap_or_default(),
            description,
            issue_type: fields.issue_type,
            status: fields.status,
            priority: fields.priority,
            assignee: fields.assignee,
            reporter: fields.reporter,
            labels: fields.labels,
            parent: fields.parent.map(|p| p.key),
            created: fields.created,
            updated: fields.updated,
        }
    }
}

/// Reference returned by issue creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self", default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub to_status: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct TransitionRecord {
    id: String,
    name: String,
    #[serde(default)]
    to: Option<Status>,
}

impl From<TransitionRecord> for Transition {
    fn from(record: TransitionRecord) -> Self {
        let (to_status, description) = match record.to {
            Some(status) => (Some(status.name), status.description),
            None => (None, None),
        };
        Transition {
            id: record.id,
            name: record.name,
            to_status,
            description,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Comment {
    pub id: String,
    pub author: Option<User>,
    pub body: String,
    pub created: Option<String>,
    pub updated: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct CommentRecord {
    id: String,
    #[serde(default)]
    author: Option<User>,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    updated: Option<String>,
}

impl From<CommentRecord> for Comment {
    fn from(record: CommentRecord) -> Self {
        Comment {
            id: record.id,
            author: record.author,
            body: adf_to_text(&record.body),
            created: record.created,
            updated: record.updated,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Rich text for an outbound payload: plain text, or a ready-made ADF document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Description {
    Text(String),
    Document(Value),
}

impl Description {
    pub fn to_adf(&self) -> Value {
        match self {
            Description::Text(text) => text_to_adf(text),
            Description::Document(doc) => doc.clone(),
        }
    }

    /// Whitespace-only text. Jira stores it as no description at all.
    pub fn is_blank(&self) -> bool {
        matches!(self, Description::Text(text) if text.trim().is_empty())
    }
}

impl From<&str> for Description {
    fn from(text: &str) -> Self {
        Description::Text(text.to_string())
    }
}

impl From<String> for Description {
    fn from(text: String) -> Self {
        Description::Text(text)
    }
}

/// Fields for a new issue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueDraft {
    pub project: String,
    pub issue_type: String,
    pub summary: String,
    pub description: Option<Description>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    pub parent: Option<String>,
    /// Extra field ids (custom fields, epic link) sent verbatim.
    pub extra_fields: BTreeMap<String, Value>,
}

impl IssueDraft {
    pub fn new(
        project: impl Into<String>,
        issue_type: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            issue_type: issue_type.into(),
            summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<Description>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn assignee(mut self, account_id: impl Into<String>) -> Self {
        self.assignee = Some(account_id.into());
        self
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn parent(mut self, key: impl Into<String>) -> Self {
        self.parent = Some(key.into());
        self
    }

    pub fn field(mut self, id: impl Into<String>, value: Value) -> Self {
        self.extra_fields.insert(id.into(), value);
        self
    }

    pub fn to_payload(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("project".into(), json!({ "key": self.project }));
        fields.insert("issuetype".into(), json!({ "name": self.issue_type }));
        fields.insert("summary".into(), json!(self.summary));

        if let Some(description) = self.description.as_ref().filter(|d| !d.is_blank()) {
            fields.insert("description".into(), description.to_adf());
        }
        if let Some(priority) = &self.priority {
            fields.insert("priority".into(), json!({ "name": priority }));
        }
        if let Some(assignee) = &self.assignee {
            fields.insert("assignee".into(), json!({ "accountId": assignee }));
        }
        if !self.labels.is_empty() {
            fields.insert("labels".into(), json!(self.labels));
        }
        if let Some(parent) = &self.parent {
            fields.insert("parent".into(), json!({ "key": parent }));
        }
        for (id, value) in &self.extra_fields {
            fields.insert(id.clone(), value.clone());
        }

        json!({ "fields": fields })
    }
}

/// Fields to change on an existing issue; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueUpdate {
    pub summary: Option<String>,
    pub description: Option<Description>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub labels: Option<Vec<String>>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.labels.is_none()
    }

    pub fn to_payload(&self) -> Value {
        let mut fields = Map::new();

        if let Some(summary) = &self.summary {
            fields.insert("summary".into(), json!(summary));
        }
        if let Some(description) = &self.description {
            fields.insert("description".into(), description.to_adf());
        }
        if let Some(priority) = &self.priority {
            fields.insert("priority".into(), json!({ "name": priority }));
        }
        if let Some(assignee) = &self.assignee {
            fields.insert("assignee".into(), json!({ "accountId": assignee }));
        }
        if let Some(labels) = &self.labels {
            fields.insert("labels".into(), json!(labels));
        }

        json!({ "fields": fields })
    }
}

/// Parses Jira timestamps such as `2025-01-01T10:00:00.000+0000`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}
