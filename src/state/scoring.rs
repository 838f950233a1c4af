//! Pure scoring computation for a round: correctness deltas, the cascading
//! domino pass, and the crisis rule. No I/O, no mutation; the state machine
//! applies the returned outcome atomically.

use indexmap::IndexMap;

use crate::{
    config::GameRules,
    state::game::{CardFlags, Question, Team, TeamId},
};

/// One cascading penalty link from an incorrect team to its effective target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominoChain {
    /// The team that answered incorrectly.
    pub from: TeamId,
    /// The team that receives the penalty (successor or redirect target).
    pub to: TeamId,
    /// Signed penalty value applied to `to`.
    pub penalty: i32,
}

/// Per-team scoring result for a single round.
#[derive(Debug, Clone)]
pub struct TeamResult {
    /// Team id.
    pub id: TeamId,
    /// Team display name at scoring time.
    pub name: String,
    /// The answer that was compared, if any was recorded.
    pub answer: Option<String>,
    /// Whether the answer matched exactly.
    pub is_correct: bool,
    /// Total signed delta: base, domino, and crisis combined.
    pub score_change: i32,
    /// Score before the delta was applied.
    pub score_before: i32,
    /// Score after applying the delta and the floor clamp.
    pub score_after: i32,
    /// Cards that were armed when the round was scored.
    pub used_cards: CardFlags,
    /// Redirect target that was armed, if any.
    pub redirect_target: Option<TeamId>,
}

/// Everything a scoring event produced, broadcast verbatim and kept in history.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// Per-team results in ascending team-id order.
    pub teams: Vec<TeamResult>,
    /// Domino links recorded during the cascade pass.
    pub domino_chains: Vec<DominoChain>,
    /// Whether the crisis rule fired this round.
    pub is_crisis: bool,
}

/// Compute the outcome of the current round.
///
/// Deterministic for a given input: teams are processed in ascending id order
/// throughout. A missing answer counts as incorrect and participates fully in
/// the domino and crisis logic.
pub fn score_round(
    teams: &IndexMap<TeamId, Team>,
    question: &Question,
    rules: &GameRules,
) -> RoundOutcome {
    let mut ids: Vec<TeamId> = teams.keys().copied().collect();
    ids.sort_unstable();
    let team_count = ids.len() as TeamId;

    let mut results = Vec::with_capacity(ids.len());
    let mut wrong_teams = Vec::new();

    for id in &ids {
        let team = &teams[id];
        let is_correct = team.answer.as_deref() == Some(question.correct_answer.as_str());

        let base = if is_correct {
            rules.correct_points
        } else {
            rules.wrong_points
        };
        // All-in doubles the base correctness delta and nothing else.
        let score_change = if team.active_cards.all_in { base * 2 } else { base };

        if !is_correct {
            wrong_teams.push(team.id);
        }

        results.push(TeamResult {
            id: team.id,
            name: team.name.clone(),
            answer: team.answer.clone(),
            is_correct,
            score_change,
            score_before: team.score,
            score_after: team.score,
            used_cards: team.active_cards,
            redirect_target: team.redirect_target,
        });
    }

    let mut domino_chains = Vec::new();
    for &from in &wrong_teams {
        let successor_id = (from % team_count) + 1;
        let Some(successor) = teams.get(&successor_id) else {
            continue;
        };

        // Immunity blocks the whole link: no penalty, no redirection.
        if successor.active_cards.immunity {
            continue;
        }

        let to = match (successor.active_cards.redirect, successor.redirect_target) {
            (true, Some(target)) => target,
            _ => successor_id,
        };

        domino_chains.push(DominoChain {
            from,
            to,
            penalty: rules.domino_penalty,
        });

        // A redirect may point at a team id outside the roster; the chain is
        // still recorded but the penalty lands nowhere.
        if let Some(result) = results.iter_mut().find(|r| r.id == to) {
            result.score_change += rules.domino_penalty;
        }
    }

    let is_crisis = wrong_teams.len() >= rules.crisis_threshold;
    if is_crisis {
        for result in &mut results {
            result.score_change += rules.crisis_penalty;
        }
    }

    for result in &mut results {
        result.score_after = (result.score_before + result.score_change).max(rules.min_score);
    }

    RoundOutcome {
        teams: results,
        domino_chains,
        is_crisis,
    }
}
