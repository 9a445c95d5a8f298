use std::path::Path;

use jira_ops_api::error::Result;
use jira_ops_api::pagination::{page_query, PagedResponse};
use jira_ops_api::ApiClient;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use urlencoding::encode;

use crate::adf::text_to_adf;
use crate::jql::JqlBuilder;
use crate::models::{
    Attachment, Comment, CommentRecord, Component, CreatedIssue, Issue, IssueDraft, IssueRecord,
    IssueType, IssueUpdate, Priority, Project, Status, Transition, TransitionRecord, User, Version,
};

/// Fields requested for issue reads.
const ISSUE_FIELDS: &str =
    "summary,description,issuetype,status,priority,assignee,reporter,labels,parent,created,updated";

const PAGE_SIZE: u32 = 50;
const USER_LISTING_LIMIT: u32 = 1000;

/// Typed Jira REST calls. Each method issues exactly one request and returns
/// the transport error untouched.
#[derive(Clone)]
pub struct JiraClient {
    api: ApiClient,
}

impl JiraClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn myself(&self) -> Result<User> {
        self.api.get("/rest/api/3/myself").await
    }

    // Projects

    pub async fn projects(&self) -> Result<Vec<Project>> {
        let path = page_query(
            "/rest/api/3/project/search?expand=description,lead",
            0,
            PAGE_SIZE,
        );
        let page: PagedResponse<Project> = self.api.get(&path).await?;
        if page.has_next() {
            debug!(total = ?page.total, "More projects available than one page");
        }
        Ok(page.into_values())
    }

    pub async fn project(&self, key: &str) -> Result<Project> {
        self.api
            .get(&format!(
                "/rest/api/3/project/{}?expand=description,lead,issueTypes",
                encode(key)
            ))
            .await
    }

    pub async fn project_components(&self, key: &str) -> Result<Vec<Component>> {
        self.api
            .get(&format!("/rest/api/3/project/{}/components", encode(key)))
            .await
    }

    pub async fn project_versions(&self, key: &str) -> Result<Vec<Version>> {
        self.api
            .get(&format!("/rest/api/3/project/{}/versions", encode(key)))
            .await
    }

    // Users

    pub async fn users(&self, project: Option<&str>) -> Result<Vec<User>> {
        let path = match project {
            Some(key) => format!(
                "/rest/api/3/user/assignable/search?project={}&maxResults={}",
                encode(key),
                PAGE_SIZE
            ),
            None => page_query("/rest/api/3/users/search", 0, PAGE_SIZE),
        };
        self.api.get(&path).await
    }

    pub async fn user(&self, account_id: &str) -> Result<User> {
        self.api
            .get(&format!("/rest/api/3/user?accountId={}", encode(account_id)))
            .await
    }

    /// Every user the caller can see, up to the directory listing's cap.
    pub async fn all_users(&self) -> Result<Vec<User>> {
        self.api
            .get(&page_query("/rest/api/3/users/search", 0, USER_LISTING_LIMIT))
            .await
    }

    /// Names of the groups `account_id` belongs to.
    pub async fn user_groups(&self, account_id: &str) -> Result<Vec<String>> {
        #[derive(Deserialize, Default)]
        struct GroupList {
            #[serde(default)]
            items: Vec<Group>,
        }
        #[derive(Deserialize)]
        struct Group {
            name: String,
        }
        #[derive(Deserialize)]
        struct UserWithGroups {
            #[serde(default)]
            groups: GroupList,
        }

        let user: UserWithGroups = self
            .api
            .get(&format!(
                "/rest/api/3/user?accountId={}&expand=groups",
                encode(account_id)
            ))
            .await?;
        Ok(user.groups.items.into_iter().map(|g| g.name).collect())
    }

    /// Distinct names of the projects `account_id` holds permissions in.
    pub async fn user_permission_projects(&self, account_id: &str) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct PermissionList {
            #[serde(default)]
            permissions: Vec<Permission>,
        }
        #[derive(Deserialize)]
        struct Permission {
            #[serde(default)]
            project: Option<NamedProject>,
        }
        #[derive(Deserialize)]
        struct NamedProject {
            name: String,
        }

        let list: PermissionList = self
            .api
            .get(&format!(
                "/rest/api/3/user/permission/search?accountId={}",
                encode(account_id)
            ))
            .await?;

        let mut names: Vec<String> = list
            .permissions
            .into_iter()
            .filter_map(|p| p.project.map(|project| project.name))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        self.api
            .get(&format!(
                "/rest/api/3/user/search?query={}&maxResults={}",
                encode(query),
                PAGE_SIZE
            ))
            .await
    }

    // Metadata

    pub async fn issue_types(&self, project: Option<&str>) -> Result<Vec<IssueType>> {
        match project {
            Some(key) => Ok(self.project(key).await?.issue_types),
            None => self.api.get("/rest/api/3/issuetype").await,
        }
    }

    pub async fn priorities(&self) -> Result<Vec<Priority>> {
        self.api.get("/rest/api/3/priority").await
    }

    pub async fn statuses(&self) -> Result<Vec<Status>> {
        self.api.get("/rest/api/3/status").await
    }

    /// Field ids accepted when creating `issue_type` issues in `project`.
    pub async fn create_fields(&self, project: &str, issue_type: &str) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct CreateMeta {
            #[serde(default)]
            projects: Vec<MetaProject>,
        }

        #[derive(Deserialize)]
        struct MetaProject {
            #[serde(default)]
            issuetypes: Vec<MetaIssueType>,
        }

        #[derive(Deserialize)]
        struct MetaIssueType {
            #[serde(default)]
            fields: Map<String, Value>,
        }

        let meta: CreateMeta = self
            .api
            .get(&format!(
                "/rest/api/3/issue/createmeta?projectKeys={}&issuetypeNames={}&expand=projects.issuetypes.fields",
                encode(project),
                encode(issue_type)
            ))
            .await?;

        Ok(meta
            .projects
            .into_iter()
            .next()
            .and_then(|p| p.issuetypes.into_iter().next())
            .map(|t| t.fields.into_iter().map(|(id, _)| id).collect())
            .unwrap_or_default())
    }

    // Issues

    pub async fn create_issue(&self, draft: &IssueDraft) -> Result<CreatedIssue> {
        self.api
            .post("/rest/api/3/issue", &draft.to_payload())
            .await
    }

    pub async fn issue(&self, key: &str) -> Result<Issue> {
        let record: IssueRecord = self
            .api
            .get(&format!(
                "/rest/api/3/issue/{}?fields={ISSUE_FIELDS}",
                encode(key)
            ))
            .await?;
        Ok(record.into())
    }

    pub async fn update_issue(&self, key: &str, update: &IssueUpdate) -> Result<()> {
        self.api
            .put(
                &format!("/rest/api/3/issue/{}", encode(key)),
                &update.to_payload(),
            )
            .await
    }

    pub async fn delete_issue(&self, key: &str, delete_subtasks: bool) -> Result<()> {
        self.api
            .delete(&format!(
                "/rest/api/3/issue/{}?deleteSubtasks={delete_subtasks}",
                encode(key)
            ))
            .await
    }

    pub async fn search_issues(&self, jql: &str, max_results: u32) -> Result<Vec<Issue>> {
        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            issues: Vec<IssueRecord>,
            #[serde(rename = "isLast", default)]
            is_last: Option<bool>,
        }

        let response: SearchResponse = self
            .api
            .get(&format!(
                "/rest/api/3/search/jql?jql={}&maxResults={}&fields={ISSUE_FIELDS}",
                encode(jql),
                max_results.max(1)
            ))
            .await?;

        if response.is_last == Some(false) {
            debug!(max_results, "Search matched more issues than requested");
        }
        Ok(response.issues.into_iter().map(Issue::from).collect())
    }

    /// Key of the first `issue_type` issue in `project` whose summary equals
    /// `summary` exactly. JQL `~` is a fuzzy text match, so candidates are
    /// confirmed locally.
    pub async fn find_issue_by_summary(
        &self,
        project: &str,
        issue_type: &str,
        summary: &str,
    ) -> Result<Option<String>> {
        let jql = JqlBuilder::new()
            .eq("project", project)
            .eq("issuetype", issue_type)
            .contains("summary", summary)
            .finish();

        let candidates = self.search_issues(&jql, PAGE_SIZE).await?;
        Ok(candidates
            .into_iter()
            .find(|issue| issue.summary == summary)
            .map(|issue| issue.key))
    }

    // Transitions

    pub async fn transitions(&self, key: &str) -> Result<Vec<Transition>> {
        #[derive(Deserialize)]
        struct TransitionsResponse {
            #[serde(default)]
            transitions: Vec<TransitionRecord>,
        }

        let response: TransitionsResponse = self
            .api
            .get(&format!("/rest/api/3/issue/{}/transitions", encode(key)))
            .await?;
        Ok(response
            .transitions
            .into_iter()
            .map(Transition::from)
            .collect())
    }

    pub async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({ "transition": { "id": transition_id } });
        if let Some(comment) = comment {
            payload["update"] = json!({
                "comment": [{ "add": { "body": text_to_adf(comment) } }]
            });
        }

        self.api
            .post(
                &format!("/rest/api/3/issue/{}/transitions", encode(key)),
                &payload,
            )
            .await
    }

    // Comments

    pub async fn comments(&self, key: &str) -> Result<Vec<Comment>> {
        let path = page_query(
            &format!("/rest/api/3/issue/{}/comment", encode(key)),
            0,
            PAGE_SIZE,
        );
        let page: PagedResponse<CommentRecord> = self.api.get(&path).await?;
        if page.has_next() {
            debug!(%key, total = ?page.total, "More comments available than one page");
        }
        Ok(page.into_values().into_iter().map(Comment::from).collect())
    }

    pub async fn add_comment(&self, key: &str, body: &str) -> Result<Comment> {
        let record: CommentRecord = self
            .api
            .post(
                &format!("/rest/api/3/issue/{}/comment", encode(key)),
                &json!({ "body": text_to_adf(body) }),
            )
            .await?;
        Ok(record.into())
    }

    pub async fn update_comment(&self, key: &str, comment_id: &str, body: &str) -> Result<Comment> {
        let record: CommentRecord = self
            .api
            .put(
                &format!(
                    "/rest/api/3/issue/{}/comment/{}",
                    encode(key),
                    encode(comment_id)
                ),
                &json!({ "body": text_to_adf(body) }),
            )
            .await?;
        Ok(record.into())
    }

    pub async fn delete_comment(&self, key: &str, comment_id: &str) -> Result<()> {
        self.api
            .delete(&format!(
                "/rest/api/3/issue/{}/comment/{}",
                encode(key),
                encode(comment_id)
            ))
            .await
    }

    // Attachments

    pub async fn attachments(&self, key: &str) -> Result<Vec<Attachment>> {
        #[derive(Deserialize)]
        struct AttachmentIssue {
            #[serde(default)]
            fields: AttachmentFields,
        }

        #[derive(Deserialize, Default)]
        struct AttachmentFields {
            #[serde(default)]
            attachment: Vec<Attachment>,
        }

        let issue: AttachmentIssue = self
            .api
            .get(&format!(
                "/rest/api/3/issue/{}?fields=attachment",
                encode(key)
            ))
            .await?;
        Ok(issue.fields.attachment)
    }

    /// Uploads `file`; Jira answers with the list of stored attachments.
    pub async fn add_attachment(
        &self,
        key: &str,
        file: &Path,
        file_name: Option<&str>,
    ) -> Result<Vec<Attachment>> {
        self.api
            .post_file(
                &format!("/rest/api/3/issue/{}/attachments", encode(key)),
                file,
                file_name,
            )
            .await
    }

    pub async fn delete_attachment(&self, attachment_id: &str) -> Result<()> {
        self.api
            .delete(&format!("/rest/api/3/attachment/{}", encode(attachment_id)))
            .await
    }
}
