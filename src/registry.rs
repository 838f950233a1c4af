//! Read-only team roster and sample question bank, loaded once at startup.

use std::{fs, io::ErrorKind, path::Path};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::game::{Question, QuestionKind, TeamId};

/// A roster entry: a team and the member emails allowed to join it.
#[derive(Debug, Clone)]
pub struct RosterTeam {
    /// Team identifier; the roster must cover a contiguous 1..=N range.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Whitelisted member emails.
    pub members: Vec<String>,
}

/// The static team/admin whitelist consulted by the identity gate and used to
/// (re)initialise the game state. Read-only during a session.
#[derive(Debug, Default)]
pub struct TeamRegistry {
    teams: Vec<RosterTeam>,
    admins: Vec<String>,
}

impl TeamRegistry {
    /// Load the roster from `path`, falling back to an empty registry so the
    /// server still boots (with a loud warning) when the file is missing.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawRoster>(&contents) {
                Ok(raw) => {
                    let registry: Self = raw.into();
                    info!(
                        path = %path.display(),
                        teams = registry.teams.len(),
                        members = registry
                            .teams
                            .iter()
                            .map(|t| t.members.len())
                            .sum::<usize>(),
                        "loaded team roster"
                    );
                    registry
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to parse roster; starting empty");
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "roster file not found; starting empty");
                Self::default()
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read roster; starting empty");
                Self::default()
            }
        }
    }

    /// Build a registry directly from its parts. Teams are sorted by id so the
    /// game state and the domino wrap-around see a stable ascending order.
    pub fn from_parts(mut teams: Vec<RosterTeam>, admins: Vec<String>) -> Self {
        teams.sort_unstable_by_key(|team| team.id);

        if let Some((index, team)) = teams
            .iter()
            .enumerate()
            .find(|(index, team)| team.id != *index as TeamId + 1)
        {
            warn!(
                team = team.id,
                expected = index + 1,
                "roster ids are not contiguous from 1; domino wrap-around will skip gaps"
            );
        }

        Self { teams, admins }
    }

    /// All roster teams in ascending-id order.
    pub fn teams(&self) -> &[RosterTeam] {
        &self.teams
    }

    /// Look up a roster team by id.
    pub fn team(&self, id: TeamId) -> Option<&RosterTeam> {
        self.teams.iter().find(|team| team.id == id)
    }

    /// Find the team whose member list contains `email` (case-insensitive).
    pub fn team_for_email(&self, email: &str) -> Option<&RosterTeam> {
        let needle = email.to_lowercase();
        self.teams
            .iter()
            .find(|team| team.members.iter().any(|m| m.to_lowercase() == needle))
    }

    /// Whether `email` is on the admin whitelist (case-insensitive).
    pub fn is_admin_email(&self, email: &str) -> bool {
        let needle = email.to_lowercase();
        self.admins.iter().any(|a| a.to_lowercase() == needle)
    }
}

/// Load the sample question bank from `path`; an empty bank is not an error.
pub fn load_question_bank(path: &Path) -> Vec<Question> {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Vec<RawQuestion>>(&contents) {
            Ok(raw) => {
                let bank: Vec<Question> = raw.into_iter().map(Into::into).collect();
                info!(path = %path.display(), count = bank.len(), "loaded sample questions");
                bank
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to parse question bank");
                Vec::new()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "question bank not found; none loaded");
            Vec::new()
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read question bank");
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the roster file.
struct RawRoster {
    teams: Vec<RawRosterTeam>,
    #[serde(default)]
    admins: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawRosterTeam {
    id: TeamId,
    name: String,
    members: Vec<String>,
}

impl From<RawRoster> for TeamRegistry {
    fn from(value: RawRoster) -> Self {
        Self::from_parts(
            value
                .teams
                .into_iter()
                .map(|team| RosterTeam {
                    id: team.id,
                    name: team.name,
                    members: team.members,
                })
                .collect(),
            value.admins,
        )
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of one question bank entry.
struct RawQuestion {
    question: String,
    #[serde(rename = "type")]
    kind: QuestionKind,
    options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    correct_answer: String,
}

impl From<RawQuestion> for Question {
    fn from(value: RawQuestion) -> Self {
        Self {
            kind: value.kind,
            text: value.question,
            options: value.options,
            correct_answer: value.correct_answer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TeamRegistry {
        TeamRegistry::from_parts(
            vec![
                RosterTeam {
                    id: 2,
                    name: "Second".into(),
                    members: vec!["Two@Example.Com".into()],
                },
                RosterTeam {
                    id: 1,
                    name: "First".into(),
                    members: vec!["one@example.com".into(), "spare@example.com".into()],
                },
            ],
            vec!["Admin@Example.Com".into()],
        )
    }

    #[test]
    fn teams_are_sorted_by_id() {
        let registry = registry();
        let ids: Vec<_> = registry.teams().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn email_lookup_is_case_insensitive() {
        let registry = registry();
        assert_eq!(registry.team_for_email("TWO@example.com").unwrap().id, 2);
        assert_eq!(registry.team_for_email("spare@EXAMPLE.com").unwrap().id, 1);
        assert!(registry.team_for_email("nobody@example.com").is_none());
    }

    #[test]
    fn admin_lookup_is_case_insensitive() {
        let registry = registry();
        assert!(registry.is_admin_email("admin@example.com"));
        assert!(!registry.is_admin_email("one@example.com"));
    }

    #[test]
    fn question_bank_entries_map_to_domain_questions() {
        let raw = r#"[{
            "question": "Is water wet?",
            "type": "trueFalse",
            "options": ["True", "False"],
            "correctAnswer": "True"
        }]"#;
        let bank: Vec<Question> = serde_json::from_str::<Vec<RawQuestion>>(raw)
            .unwrap()
            .into_iter()
            .map(Into::into)
            .collect();

        assert_eq!(bank.len(), 1);
        assert_eq!(bank[0].kind, QuestionKind::TrueFalse);
        assert_eq!(bank[0].text, "Is water wet?");
        assert_eq!(bank[0].correct_answer, "True");
    }
}
