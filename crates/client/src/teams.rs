//! People grouped by the Jira groups they belong to.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Project, User};

pub const NO_TEAM: &str = "No Team";
pub const NO_PROJECT: &str = "No Project";

/// A person with the groups and projects found for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub display_name: String,
    pub account_id: String,
    pub email_address: Option<String>,
    pub teams: Vec<String>,
    pub projects: Vec<String>,
}

/// A member as listed under one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub display_name: String,
    pub account_id: String,
    pub email_address: Option<String>,
    pub projects: Vec<String>,
}

impl From<&TeamMember> for TeamEntry {
    fn from(member: &TeamMember) -> Self {
        Self {
            display_name: member.display_name.clone(),
            account_id: member.account_id.clone(),
            email_address: member.email_address.clone(),
            projects: member.projects.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamsMetadata {
    pub total_users: usize,
    pub total_teams: usize,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamsReport {
    pub metadata: TeamsMetadata,
    pub teams: BTreeMap<String, Vec<TeamEntry>>,
    pub all_users: Vec<TeamMember>,
}

impl TeamsReport {
    /// Groups members by team. Members without a team land in
    /// [`NO_TEAM`]; if nobody has a team, members are grouped by their first
    /// project instead.
    pub fn build(members: Vec<TeamMember>, generated_at: DateTime<Utc>) -> Self {
        let mut teams: BTreeMap<String, Vec<TeamEntry>> = BTreeMap::new();

        if members.iter().any(|m| !m.teams.is_empty()) {
            for member in &members {
                if member.teams.is_empty() {
                    teams.entry(NO_TEAM.to_string()).or_default().push(member.into());
                }
                for team in &member.teams {
                    teams.entry(team.clone()).or_default().push(member.into());
                }
            }
        } else {
            for member in &members {
                let project = member.projects.first().map_or(NO_PROJECT, String::as_str);
                teams.entry(project.to_string()).or_default().push(member.into());
            }
        }

        Self {
            metadata: TeamsMetadata {
                total_users: members.len(),
                total_teams: teams.len(),
                generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            },
            teams,
            all_users: members,
        }
    }
}

/// Active human accounts; apps and customers are left out.
pub fn is_person(user: &User) -> bool {
    user.active && user.account_type.as_deref() == Some("atlassian")
}

/// Names of the projects `account_id` leads.
pub fn led_projects(projects: &[Project], account_id: &str) -> Vec<String> {
    projects
        .iter()
        .filter(|p| p.lead.as_ref().is_some_and(|lead| lead.account_id == account_id))
        .map(|p| p.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn member(name: &str, teams: &[&str], projects: &[&str]) -> TeamMember {
        TeamMember {
            display_name: name.to_string(),
            account_id: format!("id-{}", name.to_lowercase()),
            email_address: None,
            teams: teams.iter().map(|t| t.to_string()).collect(),
            projects: projects.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_groups_by_team_with_no_team_bucket() {
        let report = TeamsReport::build(
            vec![
                member("Ada", &["platform", "security"], &["Ops"]),
                member("Bo", &["platform"], &[]),
                member("Cy", &[], &["Ops"]),
            ],
            at(),
        );

        let names = |team: &str| -> Vec<&str> {
            report.teams[team].iter().map(|e| e.display_name.as_str()).collect()
        };
        assert_eq!(names("platform"), vec!["Ada", "Bo"]);
        assert_eq!(names("security"), vec!["Ada"]);
        assert_eq!(names(NO_TEAM), vec!["Cy"]);
        assert_eq!(report.metadata.total_users, 3);
        assert_eq!(report.metadata.total_teams, 3);
        assert_eq!(report.metadata.generated_at, "2026-03-01T09:30:00Z");
    }

    #[test]
    fn test_falls_back_to_first_project() {
        let report = TeamsReport::build(
            vec![
                member("Ada", &[], &["Ops", "Web"]),
                member("Bo", &[], &[]),
            ],
            at(),
        );
        assert_eq!(report.teams["Ops"][0].account_id, "id-ada");
        assert_eq!(report.teams[NO_PROJECT][0].account_id, "id-bo");
        assert_eq!(report.metadata.total_teams, 2);
    }

    #[test]
    fn test_report_json_shape() {
        let report = TeamsReport::build(vec![member("Ada", &["platform"], &["Ops"])], at());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["teams"]["platform"][0]["projects"], serde_json::json!(["Ops"]));
        assert!(json["teams"]["platform"][0].get("teams").is_none());
        assert_eq!(json["all_users"][0]["teams"], serde_json::json!(["platform"]));
    }

    #[test]
    fn test_is_person() {
        let person = User {
            active: true,
            account_type: Some("atlassian".into()),
            ..Default::default()
        };
        let app = User {
            active: true,
            account_type: Some("app".into()),
            ..Default::default()
        };
        let inactive = User {
            account_type: Some("atlassian".into()),
            ..Default::default()
        };
        assert!(is_person(&person));
        assert!(!is_person(&app));
        assert!(!is_person(&inactive));
    }

    #[test]
    fn test_led_projects() {
        let lead = User {
            account_id: "abc".into(),
            ..Default::default()
        };
        let projects = vec![
            Project {
                key: "OPS".into(),
                name: "Operations".into(),
                lead: Some(lead),
                ..Default::default()
            },
            Project {
                key: "WEB".into(),
                name: "Website".into(),
                ..Default::default()
            },
        ];
        assert_eq!(led_projects(&projects, "abc"), vec!["Operations"]);
        assert!(led_projects(&projects, "xyz").is_empty());
    }
}
