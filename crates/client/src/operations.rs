//! Connection-scoped Jira operations.
//!
//! Each method maps to one REST call, except the teams export which walks
//! every user. Failures never propagate: they are
//! logged as a single error event and the caller gets an empty list, `None`
//! or `false`.

use std::path::Path;

use chrono::Utc;
use jira_ops_api::error::ApiError;
use jira_ops_api::ApiClient;
use tracing::{debug, error, info, warn};

use crate::client::JiraClient;
use crate::models::{
    Attachment, Comment, Component, CreatedIssue, Issue, IssueDraft, IssueType, IssueUpdate,
    Priority, Project, Status, Transition, User, Version,
};
use crate::teams::{is_person, led_projects, TeamMember, TeamsReport};

pub struct JiraOperations {
    base_url: String,
    username: String,
    api_token: String,
    client: Option<JiraClient>,
}

impl JiraOperations {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            username: username.into().trim().to_string(),
            api_token: api_token.into().trim().to_string(),
            client: None,
        }
    }

    /// Wraps an already-built client, skipping the `connect` handshake.
    pub fn with_client(client: JiraClient) -> Self {
        let base_url = client.api().base_url().as_str().trim_end_matches('/').to_string();
        let username = client.api().username().unwrap_or_default().to_string();
        Self {
            base_url,
            username,
            api_token: String::new(),
            client: Some(client),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// The live client, if connected.
    pub fn client(&self) -> Option<&JiraClient> {
        self.client.as_ref()
    }

    /// Names of the settings still missing before a connection can be made.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.base_url.is_empty() {
            missing.push("JIRA_BASE_URL");
        }
        if self.username.is_empty() {
            missing.push("JIRA_USERNAME");
        }
        if self.api_token.is_empty() {
            missing.push("JIRA_API_TOKEN");
        }
        missing
    }

    /// Verifies the credentials against `/myself` and keeps the session.
    pub async fn connect(&mut self) -> bool {
        let missing = self.missing_settings();
        if !missing.is_empty() {
            error!(
                missing = %missing.join(", "),
                "Jira connection is not configured; set {} or run: jira-ops config setup",
                missing.join(", ")
            );
            return false;
        }

        let api = match ApiClient::new(&self.base_url) {
            Ok(api) => api.with_basic_auth(&self.username, &self.api_token),
            Err(e) => return failed("connecting to Jira", e),
        };
        let client = JiraClient::new(api);

        match client.myself().await {
            Ok(user) => {
                info!(
                    base_url = %self.base_url,
                    user = %user.display_name,
                    "Connected to Jira"
                );
                self.client = Some(client);
                true
            }
            Err(e) => failed(&format!("connecting to Jira at {}", self.base_url), e),
        }
    }

    pub fn disconnect(&mut self) {
        if self.client.take().is_some() {
            info!("Disconnected from Jira");
        }
    }

    fn session(&self) -> Option<&JiraClient> {
        if self.client.is_none() {
            error!("Not connected to Jira; call connect first");
        }
        self.client.as_ref()
    }

    // Projects

    pub async fn get_projects(&self) -> Vec<Project> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        match client.projects().await {
            Ok(projects) => {
                info!("Found {} projects", projects.len());
                projects
            }
            Err(e) => failed("getting projects", e),
        }
    }

    pub async fn get_project(&self, key: &str) -> Option<Project> {
        let client = self.session()?;
        if !present("project key", key) {
            return None;
        }
        match client.project(key).await {
            Ok(project) => {
                info!("Project {}: {}", project.key, project.name);
                Some(project)
            }
            Err(e) => failed(&format!("getting project {key}"), e),
        }
    }

    pub async fn get_project_components(&self, key: &str) -> Vec<Component> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        if !present("project key", key) {
            return Vec::new();
        }
        match client.project_components(key).await {
            Ok(components) => {
                info!("Found {} components in {key}", components.len());
                components
            }
            Err(e) => failed(&format!("getting components for {key}"), e),
        }
    }

    pub async fn get_project_versions(&self, key: &str) -> Vec<Version> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        if !present("project key", key) {
            return Vec::new();
        }
        match client.project_versions(key).await {
            Ok(versions) => {
                info!("Found {} versions in {key}", versions.len());
                versions
            }
            Err(e) => failed(&format!("getting versions for {key}"), e),
        }
    }

    // Users

    pub async fn get_users(&self, project: Option<&str>) -> Vec<User> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        match client.users(project).await {
            Ok(users) => {
                match project {
                    Some(key) => info!("Found {} users in project {key}", users.len()),
                    None => info!("Found {} users", users.len()),
                }
                users
            }
            Err(e) => failed("getting users", e),
        }
    }

    pub async fn get_user(&self, account_id: &str) -> Option<User> {
        let client = self.session()?;
        if !present("account id", account_id) {
            return None;
        }
        match client.user(account_id).await {
            Ok(user) => {
                info!("User {account_id}: {}", user.display_name);
                Some(user)
            }
            Err(e) => failed(&format!("getting user {account_id}"), e),
        }
    }

    pub async fn search_users(&self, query: &str) -> Vec<User> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        match client.search_users(query).await {
            Ok(users) => {
                info!("Found {} users matching '{query}'", users.len());
                users
            }
            Err(e) => failed("searching users", e),
        }
    }

    // Metadata

    pub async fn get_issue_types(&self, project: Option<&str>) -> Vec<IssueType> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        match client.issue_types(project).await {
            Ok(types) => {
                match project {
                    Some(key) => info!("Found {} issue types in project {key}", types.len()),
                    None => info!("Found {} issue types", types.len()),
                }
                types
            }
            Err(e) => failed("getting issue types", e),
        }
    }

    pub async fn get_priorities(&self) -> Vec<Priority> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        match client.priorities().await {
            Ok(priorities) => {
                info!("Found {} priorities", priorities.len());
                priorities
            }
            Err(e) => failed("getting priorities", e),
        }
    }

    pub async fn get_statuses(&self) -> Vec<Status> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        match client.statuses().await {
            Ok(statuses) => {
                info!("Found {} statuses", statuses.len());
                statuses
            }
            Err(e) => failed("getting statuses", e),
        }
    }

    pub async fn get_create_fields(&self, project: &str, issue_type: &str) -> Vec<String> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        match client.create_fields(project, issue_type).await {
            Ok(fields) => {
                info!(
                    "Found {} create fields for {issue_type} in {project}",
                    fields.len()
                );
                fields
            }
            Err(e) => failed(&format!("getting create metadata for {project}"), e),
        }
    }

    // Issues

    pub async fn create_issue(&self, draft: &IssueDraft) -> Option<CreatedIssue> {
        let client = self.session()?;
        match client.create_issue(draft).await {
            Ok(created) => {
                info!("Created issue {}: {}", created.key, draft.summary);
                Some(created)
            }
            Err(e) => failed("creating issue", e),
        }
    }

    pub async fn get_issue(&self, key: &str) -> Option<Issue> {
        let client = self.session()?;
        if !present("issue key", key) {
            return None;
        }
        match client.issue(key).await {
            Ok(issue) => {
                info!("Issue {key}: {}", issue.summary);
                Some(issue)
            }
            Err(e) => failed(&format!("getting issue {key}"), e),
        }
    }

    pub async fn update_issue(&self, key: &str, update: &IssueUpdate) -> bool {
        let Some(client) = self.session() else {
            return false;
        };
        if !present("issue key", key) {
            return false;
        }
        if update.is_empty() {
            error!("Nothing to update on {key}");
            return false;
        }
        match client.update_issue(key, update).await {
            Ok(()) => {
                info!("Updated issue {key}");
                true
            }
            Err(e) => failed(&format!("updating issue {key}"), e),
        }
    }

    pub async fn delete_issue(&self, key: &str, delete_subtasks: bool) -> bool {
        let Some(client) = self.session() else {
            return false;
        };
        if !present("issue key", key) {
            return false;
        }
        match client.delete_issue(key, delete_subtasks).await {
            Ok(()) => {
                info!("Deleted issue {key}");
                true
            }
            Err(e) => failed(&format!("deleting issue {key}"), e),
        }
    }

    pub async fn search_issues(&self, jql: &str, max_results: u32) -> Vec<Issue> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        match client.search_issues(jql, max_results).await {
            Ok(issues) => {
                info!("Found {} issues matching JQL", issues.len());
                issues
            }
            Err(e) => failed("searching issues", e),
        }
    }

    // Transitions

    pub async fn get_issue_transitions(&self, key: &str) -> Vec<Transition> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        if !present("issue key", key) {
            return Vec::new();
        }
        match client.transitions(key).await {
            Ok(transitions) => {
                info!("Found {} transitions for {key}", transitions.len());
                transitions
            }
            Err(e) => failed(&format!("getting transitions for {key}"), e),
        }
    }

    pub async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        comment: Option<&str>,
    ) -> bool {
        let Some(client) = self.session() else {
            return false;
        };
        if !present("issue key", key) || !present("transition id", transition_id) {
            return false;
        }
        match client.transition_issue(key, transition_id, comment).await {
            Ok(()) => {
                info!("Transitioned issue {key} via {transition_id}");
                true
            }
            Err(e) => failed(&format!("transitioning issue {key}"), e),
        }
    }

    // Comments

    pub async fn get_issue_comments(&self, key: &str) -> Vec<Comment> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        if !present("issue key", key) {
            return Vec::new();
        }
        match client.comments(key).await {
            Ok(comments) => {
                info!("Found {} comments for {key}", comments.len());
                comments
            }
            Err(e) => failed(&format!("getting comments for {key}"), e),
        }
    }

    pub async fn add_comment(&self, key: &str, body: &str) -> Option<Comment> {
        let client = self.session()?;
        if !present("issue key", key) || !present("comment body", body) {
            return None;
        }
        match client.add_comment(key, body).await {
            Ok(comment) => {
                info!("Added comment {} to {key}", comment.id);
                Some(comment)
            }
            Err(e) => failed(&format!("adding comment to {key}"), e),
        }
    }

    pub async fn update_comment(&self, key: &str, comment_id: &str, body: &str) -> Option<Comment> {
        let client = self.session()?;
        if !present("issue key", key)
            || !present("comment id", comment_id)
            || !present("comment body", body)
        {
            return None;
        }
        match client.update_comment(key, comment_id, body).await {
            Ok(comment) => {
                info!("Updated comment {comment_id} on {key}");
                Some(comment)
            }
            Err(e) => failed(&format!("updating comment {comment_id}"), e),
        }
    }

    pub async fn delete_comment(&self, key: &str, comment_id: &str) -> bool {
        let Some(client) = self.session() else {
            return false;
        };
        if !present("issue key", key) || !present("comment id", comment_id) {
            return false;
        }
        match client.delete_comment(key, comment_id).await {
            Ok(()) => {
                info!("Deleted comment {comment_id} from {key}");
                true
            }
            Err(e) => failed(&format!("deleting comment {comment_id}"), e),
        }
    }

    // Attachments

    pub async fn get_issue_attachments(&self, key: &str) -> Vec<Attachment> {
        let Some(client) = self.session() else {
            return Vec::new();
        };
        if !present("issue key", key) {
            return Vec::new();
        }
        match client.attachments(key).await {
            Ok(attachments) => {
                info!("Found {} attachments for {key}", attachments.len());
                attachments
            }
            Err(e) => failed(&format!("getting attachments for {key}"), e),
        }
    }

    pub async fn add_attachment(
        &self,
        key: &str,
        file: &Path,
        file_name: Option<&str>,
    ) -> Option<Attachment> {
        let client = self.session()?;
        if !present("issue key", key) {
            return None;
        }
        match client.add_attachment(key, file, file_name).await {
            Ok(uploaded) => match uploaded.into_iter().next() {
                Some(attachment) => {
                    info!("Attached {} to {key}", attachment.filename);
                    Some(attachment)
                }
                None => {
                    error!("Jira accepted the upload to {key} but returned no attachment");
                    None
                }
            },
            Err(e) => failed(&format!("attaching {} to {key}", file.display()), e),
        }
    }

    pub async fn delete_attachment(&self, attachment_id: &str) -> bool {
        let Some(client) = self.session() else {
            return false;
        };
        if !present("attachment id", attachment_id) {
            return false;
        }
        match client.delete_attachment(attachment_id).await {
            Ok(()) => {
                info!("Deleted attachment {attachment_id}");
                true
            }
            Err(e) => failed(&format!("deleting attachment {attachment_id}"), e),
        }
    }

    // Teams

    /// People grouped by team, with the projects each one works in.
    pub async fn get_teams(&self) -> Option<TeamsReport> {
        let client = self.session()?;
        let users = match client.all_users().await {
            Ok(users) => users,
            Err(e) => return failed("getting users for the teams export", e),
        };
        let projects = match client.projects().await {
            Ok(projects) => projects,
            Err(e) => {
                warn!(error = %e, "Project listing unavailable; project leads will not be used");
                Vec::new()
            }
        };

        let mut members = Vec::new();
        for user in users.into_iter().filter(is_person) {
            debug!("Processing {}", user.display_name);
            let teams = match client.user_groups(&user.account_id).await {
                Ok(teams) => teams,
                Err(e) => {
                    warn!(error = %e, "Failed to get groups for {}", user.display_name);
                    Vec::new()
                }
            };
            let user_projects = match client.user_permission_projects(&user.account_id).await {
                Ok(names) if !names.is_empty() => names,
                Ok(_) => led_projects(&projects, &user.account_id),
                Err(e) => {
                    debug!(
                        error = %e,
                        "Permission search failed for {}; using project leads",
                        user.display_name
                    );
                    led_projects(&projects, &user.account_id)
                }
            };
            members.push(TeamMember {
                display_name: user.display_name,
                account_id: user.account_id,
                email_address: user.email_address,
                teams,
                projects: user_projects,
            });
        }

        let report = TeamsReport::build(members, Utc::now());
        info!(
            "Found {} users across {} teams",
            report.metadata.total_users, report.metadata.total_teams
        );
        Some(report)
    }
}

/// Logs a failed call and yields the empty value for its result type.
fn failed<T: Default>(action: &str, err: ApiError) -> T {
    match err.suggestion() {
        Some(hint) => error!(error = %err, hint, "Error {action}"),
        None => error!(error = %err, "Error {action}"),
    }
    T::default()
}

fn present(what: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        warn!("Empty {what}; skipping request");
        return false;
    }
    true
}
