use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use jira_ops_client::TeamsReport;
use serde::Serialize;

use super::utils::{truncate, JiraContext};

#[derive(Serialize, Debug, PartialEq)]
struct TeamRow<'a> {
    team: &'a str,
    members: usize,
    people: String,
}

fn team_rows(report: &TeamsReport) -> Vec<TeamRow<'_>> {
    report
        .teams
        .iter()
        .map(|(team, entries)| {
            let names: Vec<&str> = entries.iter().map(|e| e.display_name.as_str()).collect();
            TeamRow {
                team,
                members: entries.len(),
                people: truncate(&names.join(", "), 80),
            }
        })
        .collect()
}

pub async fn export_teams(ctx: &JiraContext<'_>, output_file: &Path) -> Result<ExitCode> {
    let Some(report) = ctx.jira.get_teams().await else {
        return Ok(ExitCode::FAILURE);
    };

    let body = serde_json::to_string_pretty(&report)?;
    fs::write(output_file, format!("{body}\n"))
        .with_context(|| format!("Unable to write {}", output_file.display()))?;

    ctx.renderer.render(&team_rows(&report))?;
    ctx.renderer.success(format!(
        "Saved {} users across {} teams to {}",
        report.metadata.total_users,
        report.metadata.total_teams,
        output_file.display()
    ));
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use jira_ops_client::TeamMember;

    #[test]
    fn test_team_rows() {
        let member = |name: &str, teams: &[&str]| TeamMember {
            display_name: name.to_string(),
            account_id: name.to_lowercase(),
            teams: teams.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
        let report = TeamsReport::build(
            vec![member("Ada", &["platform"]), member("Bo", &["platform", "web"])],
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        );

        let rows = team_rows(&report);
        assert_eq!(
            rows,
            vec![
                TeamRow {
                    team: "platform",
                    members: 2,
                    people: "Ada, Bo".into(),
                },
                TeamRow {
                    team: "web",
                    members: 1,
                    people: "Bo".into(),
                },
            ]
        );
    }
}
