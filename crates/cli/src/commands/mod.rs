use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

mod attachments;
mod comments;
pub mod config;
mod example;
pub mod import;
mod issues;
mod metadata;
mod projects;
mod teams;
mod transitions;
mod users;
pub mod utils;

use utils::JiraContext;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List all projects
    Projects,
    /// Get a specific project
    Project {
        /// Project key
        key: String,
    },
    /// List components of a project
    Components {
        /// Project key
        key: String,
    },
    /// List versions of a project
    Versions {
        /// Project key
        key: String,
    },

    /// List users (optionally those assignable in a project)
    Users {
        /// Project key
        project: Option<String>,
    },
    /// Print users as JSON to stdout
    DumpUsersJson {
        /// Project key
        project: Option<String>,
    },
    /// Get a specific user
    User {
        /// Account ID
        account_id: String,
    },
    /// Search users by name or email
    SearchUsers {
        /// Search text
        query: String,
    },

    /// List issue types (optionally those of a project)
    IssueTypes {
        /// Project key
        project: Option<String>,
    },
    /// List priorities
    Priorities,
    /// List statuses
    Statuses,

    /// Get a specific issue
    Issue {
        /// Issue key (e.g. OPS-123)
        key: String,
    },
    /// Search issues with JQL or filter flags
    Search(issues::SearchArgs),
    /// Create a new issue
    Create(issues::CreateArgs),
    /// Update an existing issue
    Update(issues::UpdateArgs),
    /// Delete an issue
    Delete {
        /// Issue key
        key: String,
        /// Also delete the issue's subtasks
        #[arg(long)]
        delete_subtasks: bool,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },

    /// Get available transitions for an issue
    Transitions {
        /// Issue key
        key: String,
    },
    /// Move an issue through a transition
    Transition {
        /// Issue key
        key: String,
        /// Transition ID or name
        transition: String,
        /// Comment to add with the transition
        #[arg(long)]
        comment: Option<String>,
    },

    /// Get comments for an issue
    Comments {
        /// Issue key
        key: String,
    },
    /// Add a comment to an issue
    Comment {
        /// Issue key
        key: String,
        /// Comment text
        body: String,
    },
    /// Replace the text of a comment
    EditComment {
        /// Issue key
        key: String,
        /// Comment ID
        id: String,
        /// New comment text
        body: String,
    },
    /// Delete a comment
    DeleteComment {
        /// Issue key
        key: String,
        /// Comment ID
        id: String,
    },

    /// Get attachments for an issue
    Attachments {
        /// Issue key
        key: String,
    },
    /// Upload a file to an issue
    Attach {
        /// Issue key
        key: String,
        /// File to upload
        path: PathBuf,
        /// Name to store the file under
        #[arg(long)]
        filename: Option<String>,
    },
    /// Delete an attachment
    DeleteAttachment {
        /// Attachment ID
        id: String,
    },

    /// Create issues from a JSON file
    Import(import::ImportArgs),
    /// Write a sample import file
    Template(import::TemplateArgs),
    /// Run a short tour: projects, users and open issues
    Example,
    /// Export people grouped by team to a JSON file
    Teams {
        /// Where to write the report
        #[arg(long, default_value = "jira_teams.json")]
        output_file: PathBuf,
    },

    /// Manage connection settings
    #[command(subcommand)]
    Config(config::ConfigCommand),
}

pub async fn execute(command: Command, ctx: &JiraContext<'_>) -> Result<ExitCode> {
    match command {
        Command::Projects => projects::list_projects(ctx).await,
        Command::Project { key } => projects::get_project(ctx, &key).await,
        Command::Components { key } => projects::list_components(ctx, &key).await,
        Command::Versions { key } => projects::list_versions(ctx, &key).await,

        Command::Users { project } => users::list_users(ctx, project.as_deref()).await,
        Command::DumpUsersJson { project } => users::dump_users_json(ctx, project.as_deref()).await,
        Command::User { account_id } => users::get_user(ctx, &account_id).await,
        Command::SearchUsers { query } => users::search_users(ctx, &query).await,

        Command::IssueTypes { project } => metadata::list_issue_types(ctx, project.as_deref()).await,
        Command::Priorities => metadata::list_priorities(ctx).await,
        Command::Statuses => metadata::list_statuses(ctx).await,

        Command::Issue { key } => issues::get_issue(ctx, &key).await,
        Command::Search(args) => issues::search_issues(ctx, &args).await,
        Command::Create(args) => issues::create_issue(ctx, args).await,
        Command::Update(args) => issues::update_issue(ctx, args).await,
        Command::Delete {
            key,
            delete_subtasks,
            force,
        } => issues::delete_issue(ctx, &key, delete_subtasks, force).await,

        Command::Transitions { key } => transitions::list_transitions(ctx, &key).await,
        Command::Transition {
            key,
            transition,
            comment,
        } => transitions::transition_issue(ctx, &key, &transition, comment.as_deref()).await,

        Command::Comments { key } => comments::list_comments(ctx, &key).await,
        Command::Comment { key, body } => comments::add_comment(ctx, &key, &body).await,
        Command::EditComment { key, id, body } => {
            comments::update_comment(ctx, &key, &id, &body).await
        }
        Command::DeleteComment { key, id } => comments::delete_comment(ctx, &key, &id).await,

        Command::Attachments { key } => attachments::list_attachments(ctx, &key).await,
        Command::Attach {
            key,
            path,
            filename,
        } => attachments::add_attachment(ctx, &key, &path, filename.as_deref()).await,
        Command::DeleteAttachment { id } => attachments::delete_attachment(ctx, &id).await,

        Command::Import(args) => import::run(ctx, &args).await,
        Command::Example => example::run(ctx).await,
        Command::Teams { output_file } => teams::export_teams(ctx, &output_file).await,

        // Handled before a connection is opened.
        Command::Template(args) => import::write_template(&args, ctx.renderer),
        Command::Config(_) => Ok(ExitCode::SUCCESS),
    }
}
