use std::process::ExitCode;

use anyhow::Result;
use jira_ops_client::User;
use serde::Serialize;

use super::utils::JiraContext;

#[derive(Serialize)]
pub(crate) struct UserRow<'a> {
    account_id: &'a str,
    display_name: &'a str,
    email: &'a str,
    active: bool,
    time_zone: &'a str,
}

impl<'a> From<&'a User> for UserRow<'a> {
    fn from(user: &'a User) -> Self {
        UserRow {
            account_id: user.identifier(),
            display_name: &user.display_name,
            email: user.email_address.as_deref().unwrap_or(""),
            active: user.active,
            time_zone: user.time_zone.as_deref().unwrap_or(""),
        }
    }
}

/// Shape consumed by scripts that post-process `dump-users-json`.
#[derive(Serialize, Debug, PartialEq)]
struct UserExport<'a> {
    account_id: &'a str,
    display_name: &'a str,
    email_address: Option<&'a str>,
}

impl<'a> From<&'a User> for UserExport<'a> {
    fn from(user: &'a User) -> Self {
        let display_name = if user.display_name.is_empty() {
            user.name.as_deref().unwrap_or("")
        } else {
            user.display_name.as_str()
        };
        UserExport {
            account_id: user.identifier(),
            display_name,
            email_address: user.email_address.as_deref().filter(|e| !e.is_empty()),
        }
    }
}

pub async fn list_users(ctx: &JiraContext<'_>, project: Option<&str>) -> Result<ExitCode> {
    let users = ctx.jira.get_users(project).await;
    let rows: Vec<UserRow<'_>> = users.iter().map(UserRow::from).collect();
    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

/// Always JSON on stdout, whatever `--output` says.
pub async fn dump_users_json(ctx: &JiraContext<'_>, project: Option<&str>) -> Result<ExitCode> {
    let users = ctx.jira.get_users(project).await;
    let payload: Vec<UserExport<'_>> = users.iter().map(UserExport::from).collect();
    println!("{}", serde_json::to_string(&payload)?);
    Ok(ExitCode::SUCCESS)
}

pub async fn get_user(ctx: &JiraContext<'_>, account_id: &str) -> Result<ExitCode> {
    match ctx.jira.get_user(account_id).await {
        Some(user) => {
            ctx.renderer.render(&UserRow::from(&user))?;
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}

pub async fn search_users(ctx: &JiraContext<'_>, query: &str) -> Result<ExitCode> {
    let users = ctx.jira.search_users(query).await;
    let rows: Vec<UserRow<'_>> = users.iter().map(UserRow::from).collect();
    ctx.renderer.render(&rows)?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_falls_back_to_server_fields() {
        let server_user = User {
            name: Some("jsmith".into()),
            email_address: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            UserExport::from(&server_user),
            UserExport {
                account_id: "jsmith",
                display_name: "jsmith",
                email_address: None,
            }
        );
    }

    #[test]
    fn test_export_json_shape() {
        let user = User {
            account_id: "5b10ac8d82e05b22cc7d4ef5".into(),
            display_name: "Mia Krystof".into(),
            email_address: Some("mia@example.com".into()),
            ..Default::default()
        };
        let json = serde_json::to_value([UserExport::from(&user)]).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "account_id": "5b10ac8d82e05b22cc7d4ef5",
                "display_name": "Mia Krystof",
                "email_address": "mia@example.com"
            }])
        );
    }
}
