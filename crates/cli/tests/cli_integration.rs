use std::path::Path;
use std::process::Output;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::process::Command;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BIN: &str = env!("CARGO_BIN_EXE_jira-ops");

/// The binary with an empty HOME and no ambient Jira settings.
fn jira_ops(home: &Path) -> Command {
    let mut cmd = Command::new(BIN);
    cmd.env("HOME", home)
        .env("RUST_LOG", "info")
        .env_remove("JIRA_BASE_URL")
        .env_remove("JIRA_URL")
        .env_remove("JIRA_USERNAME")
        .env_remove("JIRA_API_TOKEN");
    cmd
}

/// Same, already pointed at the mock server.
fn connected(home: &Path, server: &MockServer) -> Command {
    let mut cmd = jira_ops(home);
    cmd.env("JIRA_BASE_URL", server.uri())
        .env("JIRA_USERNAME", "dev@example.com")
        .env("JIRA_API_TOKEN", "fake-token");
    cmd
}

async fn run(mut cmd: Command, args: &[&str]) -> Output {
    cmd.args(args).output().await.expect("failed to run jira-ops")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

async fn mock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/myself"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountId": "5b10a2844c20165700ede21g",
            "displayName": "Dev"
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = run(jira_ops(home.path()), &["--version"]).await;

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("jira-ops"));
    assert!(out.contains("0.1."));
}

#[tokio::test]
async fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = run(jira_ops(home.path()), &["--help"]).await;

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Usage:"));
    for command in ["projects", "search", "transition", "import", "dump-users-json", "config"] {
        assert!(out.contains(command), "help is missing {command}");
    }
}

#[tokio::test]
async fn test_missing_settings_fail_without_network() {
    let home = TempDir::new().unwrap();
    let output = run(jira_ops(home.path()), &["projects"]).await;

    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
    let err = stderr(&output);
    assert!(err.contains("JIRA_BASE_URL"));
    assert!(err.contains("JIRA_API_TOKEN"));
}

#[tokio::test]
async fn test_unknown_profile_is_an_error() {
    let home = TempDir::new().unwrap();
    let output = run(jira_ops(home.path()), &["--profile", "nope", "priorities"]).await;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Profile 'nope' not found"));
}

#[tokio::test]
async fn test_template_then_dry_run() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("issues.json");
    let file_arg = file.to_str().unwrap();

    let output = run(
        jira_ops(home.path()),
        &["template", file_arg, "--project", "OPS"],
    )
    .await;
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(file.exists());

    let output = run(
        jira_ops(home.path()),
        &["--output", "json", "import", file_arg, "--dry-run"],
    )
    .await;
    assert!(output.status.success(), "{}", stderr(&output));

    let payloads: Vec<Value> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(payloads.len(), 5);
    assert_eq!(payloads[0]["fields"]["issuetype"]["name"], "Epic");
    assert_eq!(payloads[0]["fields"]["project"]["key"], "OPS");
    assert!(stderr(&output).contains("nothing was sent"));
}

#[tokio::test]
async fn test_config_setup_then_show() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("config.yaml");
    let config_arg = config.to_str().unwrap();

    let output = run(
        jira_ops(home.path()),
        &[
            "--config",
            config_arg,
            "--profile",
            "work",
            "--base-url",
            "https://acme.atlassian.net/",
            "--username",
            "dev@acme.io",
            "--api-token",
            "tok-1234567890",
            "config",
            "setup",
        ],
    )
    .await;
    assert!(output.status.success(), "{}", stderr(&output));

    let saved = std::fs::read_to_string(&config).unwrap();
    assert!(saved.contains("https://acme.atlassian.net"));
    assert!(!saved.contains("tok-1234567890"));
    assert!(home.path().join(".jira-ops").join("credentials").exists());

    // The token now comes from the credentials file.
    let output = run(
        jira_ops(home.path()),
        &["--config", config_arg, "--output", "json", "config", "show"],
    )
    .await;
    assert!(output.status.success(), "{}", stderr(&output));

    let shown: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(shown["profile"], "work");
    assert_eq!(shown["base_url"], "https://acme.atlassian.net");
    assert_eq!(shown["username"], "dev@acme.io");
    assert_eq!(shown["api_token"], "**********7890");
    assert_eq!(shown["configured"], true);
}

#[tokio::test]
async fn test_config_show_reports_missing() {
    let home = TempDir::new().unwrap();
    let output = run(jira_ops(home.path()), &["--output", "json", "config", "show"]).await;

    assert!(!output.status.success());
    let shown: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(shown["configured"], false);
    assert!(stderr(&output).contains("JIRA_USERNAME"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_projects_from_env_file() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/project/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [
                {"id": "10000", "key": "OPS", "name": "Operations", "projectTypeKey": "software",
                 "lead": {"accountId": "a1", "displayName": "Lee"}},
                {"id": "10001", "key": "WEB", "name": "Website", "projectTypeKey": "business"}
            ],
            "isLast": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let env_file = home.path().join("jira.env");
    std::fs::write(
        &env_file,
        format!(
            "# local\nJIRA_URL={}\nJIRA_USERNAME=dev@example.com\nJIRA_API_TOKEN=\"fake-token\"\n",
            server.uri()
        ),
    )
    .unwrap();

    let output = run(
        jira_ops(home.path()),
        &["--env-file", env_file.to_str().unwrap(), "--output", "json", "projects"],
    )
    .await;
    assert!(output.status.success(), "{}", stderr(&output));

    let rows: Vec<Value> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["key"], "OPS");
    assert_eq!(rows[0]["lead"], "Lee");
    assert_eq!(rows[1]["project_type"], "business");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_filters_and_quiet_output() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/search/jql"))
        .and(query_param(
            "jql",
            "project = \"OPS\" AND assignee = currentUser() ORDER BY updated DESC",
        ))
        .and(query_param("maxResults", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [
                {"id": "1", "key": "OPS-1", "fields": {"summary": "First"}},
                {"id": "2", "key": "OPS-2", "fields": {"summary": "Second"}}
            ],
            "isLast": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = run(
        connected(home.path(), &server),
        &[
            "--output", "quiet", "search", "--project", "OPS", "--assignee", "@me", "--limit",
            "10", "--show-query",
        ],
    )
    .await;

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "OPS-1\nOPS-2\n");
    assert!(stderr(&output).contains("JQL: project = \"OPS\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_with_no_matches_prints_empty_list() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/search/jql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"issues": [], "isLast": true})))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = run(
        connected(home.path(), &server),
        &["--output", "json", "search", "project = OPS AND summary ~ nothing"],
    )
    .await;

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "[]");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dump_users_json_ignores_output_format() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/user/assignable/search"))
        .and(query_param("project", "OPS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"accountId": "a1", "displayName": "Ada", "emailAddress": "ada@example.com", "active": true},
            {"accountId": "b2", "displayName": "Bo", "active": true}
        ])))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = run(
        connected(home.path(), &server),
        &["--output", "yaml", "dump-users-json", "OPS"],
    )
    .await;

    assert!(output.status.success(), "{}", stderr(&output));
    let users: Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(
        users,
        json!([
            {"account_id": "a1", "display_name": "Ada", "email_address": "ada@example.com"},
            {"account_id": "b2", "display_name": "Bo", "email_address": null}
        ])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_requires_force() {
    let server = mock_server().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/api/3/issue/OPS-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = run(connected(home.path(), &server), &["delete", "OPS-9"]).await;
    assert!(output.status.success());
    assert!(stderr(&output).contains("Use --force to confirm deletion"));

    let output = run(connected(home.path(), &server), &["delete", "OPS-9", "--force"]).await;
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("Deleted issue OPS-9"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transition_by_name() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/OPS-3/transitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transitions": [
                {"id": "11", "name": "Start work", "to": {"id": "3", "name": "In Progress"}},
                {"id": "31", "name": "Finish", "to": {"id": "10001", "name": "Done"}}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue/OPS-3/transitions"))
        .and(body_partial_json(json!({"transition": {"id": "31"}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = run(connected(home.path(), &server), &["transition", "OPS-3", "done"]).await;
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("Moved OPS-3 to Done"));

    let output = run(connected(home.path(), &server), &["transition", "OPS-3", "Reopen"]).await;
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Available: Start work, Finish"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_credentials_exit_non_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/myself"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = run(connected(home.path(), &server), &["priorities"]).await;
    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_teams_writes_report_file() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/users/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"accountId": "ada", "displayName": "Ada", "active": true, "accountType": "atlassian"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/project/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": "1", "key": "OPS", "name": "Operations"}],
            "isLast": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/user"))
        .and(query_param("expand", "groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountId": "ada",
            "groups": {"items": [{"name": "platform"}]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/user/permission/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "permissions": [{"project": {"name": "Operations"}}]
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let report_path = home.path().join("teams.json");
    let output = run(
        connected(home.path(), &server),
        &[
            "--output",
            "json",
            "teams",
            "--output-file",
            report_path.to_str().unwrap(),
        ],
    )
    .await;
    assert!(output.status.success(), "{}", stderr(&output));

    let rows: Vec<Value> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(rows, vec![json!({"team": "platform", "members": 1, "people": "Ada"})]);

    let report: Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["metadata"]["total_users"], 1);
    assert_eq!(report["teams"]["platform"][0]["projects"], json!(["Operations"]));
    assert_eq!(report["all_users"][0]["teams"], json!(["platform"]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_teams_fails_when_users_unavailable() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/users/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let report_path = home.path().join("teams.json");
    let output = run(
        connected(home.path(), &server),
        &["teams", "--output-file", report_path.to_str().unwrap()],
    )
    .await;
    assert!(!output.status.success());
    assert!(!report_path.exists());
}
