pub mod adf;
pub mod client;
pub mod import;
pub mod jql;
pub mod models;
pub mod operations;
pub mod teams;

pub use client::JiraClient;
pub use import::{ImportError, ImportOutcome, ImportPlan, Importer, IssueSpec};
pub use jql::JqlBuilder;
pub use models::{
    Attachment, Comment, Component, CreatedIssue, Description, Issue, IssueDraft, IssueType,
    IssueUpdate, Priority, Project, Status, StatusCategory, Transition, User, Version,
};
pub use operations::JiraOperations;
pub use teams::{TeamEntry, TeamMember, TeamsReport};
