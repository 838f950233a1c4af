use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::state::{
    GameEngine,
    game::{CardFlags, Question, QuestionKind, RoundRecord, Team, TeamId, TimerState},
    scoring::{DominoChain, RoundOutcome, TeamResult},
};

/// Wire projection of a question, broadcast with `newQuestion` and inside
/// snapshots. The correct answer is included, as the admin screen needs it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    /// Question kind.
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: QuestionKind,
    /// Question text.
    pub question: String,
    /// Candidate answers.
    pub options: Vec<String>,
    /// The answer submissions are compared against.
    pub correct_answer: String,
}

impl From<&Question> for QuestionDto {
    fn from(value: &Question) -> Self {
        Self {
            kind: value.kind,
            question: value.text.clone(),
            options: value.options.clone(),
            correct_answer: value.correct_answer.clone(),
        }
    }
}

/// One boolean per card kind, as serialized in snapshots and results.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardSetDto {
    /// Immunity card flag.
    pub immunity: bool,
    /// Redirect card flag.
    pub redirect: bool,
    /// All-in card flag.
    pub all_in: bool,
}

impl From<CardFlags> for CardSetDto {
    fn from(value: CardFlags) -> Self {
        Self {
            immunity: value.immunity,
            redirect: value.redirect,
            all_in: value.all_in,
        }
    }
}

/// Public projection of a team inside a state snapshot.
///
/// Connection references are never present here; the controller identity and
/// viewer count are joined in from the role arbiter side-table.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamSnapshot {
    /// Team id.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Current score.
    pub score: i32,
    /// Answer recorded this round, if any.
    pub answer: Option<String>,
    /// Cards still available this session.
    pub special_cards: CardSetDto,
    /// Cards armed for the current round.
    pub active_cards: CardSetDto,
    /// Armed redirect target, if any.
    pub redirect_target: Option<TeamId>,
    /// Identity of the controller connection, if one is seated.
    pub controller_email: Option<String>,
    /// Number of seated viewers.
    pub viewer_count: usize,
}

/// Countdown data exposed to clients; the task handle never leaves the server.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct TimerSnapshot {
    /// Whether the countdown is running.
    pub active: bool,
    /// Configured round duration in seconds.
    pub duration: u64,
    /// Seconds left.
    pub remaining: u64,
}

impl From<TimerState> for TimerSnapshot {
    fn from(value: TimerState) -> Self {
        Self {
            active: value.active,
            duration: value.duration_secs,
            remaining: value.remaining_secs,
        }
    }
}

/// One domino chain link as broadcast in round results.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DominoChainDto {
    /// The incorrectly-answering team.
    pub from: TeamId,
    /// The team that received the penalty.
    pub to: TeamId,
    /// Signed penalty value.
    pub penalty: i32,
}

impl From<&DominoChain> for DominoChainDto {
    fn from(value: &DominoChain) -> Self {
        Self {
            from: value.from,
            to: value.to,
            penalty: value.penalty,
        }
    }
}

/// Per-team scoring result as broadcast in `roundResults`.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamResultDto {
    /// Team id.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Answer that was compared, if any.
    pub answer: Option<String>,
    /// Whether the answer matched.
    pub is_correct: bool,
    /// Combined signed delta (base, domino, crisis).
    pub score_change: i32,
    /// Score before the round.
    pub score_before: i32,
    /// Score after clamping at the floor.
    pub score_after: i32,
    /// Cards armed when the round was scored.
    pub used_cards: CardSetDto,
    /// Armed redirect target, if any.
    pub redirect_target: Option<TeamId>,
}

impl From<&TeamResult> for TeamResultDto {
    fn from(value: &TeamResult) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            answer: value.answer.clone(),
            is_correct: value.is_correct,
            score_change: value.score_change,
            score_before: value.score_before,
            score_after: value.score_after,
            used_cards: value.used_cards.into(),
            redirect_target: value.redirect_target,
        }
    }
}

/// Full scoring outcome as broadcast with `roundResults` and kept in history.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundResultsDto {
    /// Per-team results in ascending team-id order.
    pub teams: Vec<TeamResultDto>,
    /// Recorded domino chain links.
    pub domino_chains: Vec<DominoChainDto>,
    /// Whether the crisis rule fired.
    pub is_crisis: bool,
}

impl From<&RoundOutcome> for RoundResultsDto {
    fn from(value: &RoundOutcome) -> Self {
        Self {
            teams: value.teams.iter().map(Into::into).collect(),
            domino_chains: value.domino_chains.iter().map(Into::into).collect(),
            is_crisis: value.is_crisis,
        }
    }
}

/// One completed round in the snapshot history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundRecordDto {
    /// Round counter at scoring time.
    pub round: u32,
    /// The question that was scored.
    pub question: QuestionDto,
    /// The broadcast outcome.
    pub results: RoundResultsDto,
    /// RFC 3339 scoring timestamp.
    pub timestamp: String,
}

impl From<&RoundRecord> for RoundRecordDto {
    fn from(value: &RoundRecord) -> Self {
        Self {
            round: value.round,
            question: (&value.question).into(),
            results: (&value.results).into(),
            timestamp: value.timestamp.clone(),
        }
    }
}

/// Full sanitized state snapshot broadcast as `gameState`.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    /// Every team, ascending id order.
    pub teams: Vec<TeamSnapshot>,
    /// The question being played, if any.
    pub current_question: Option<QuestionDto>,
    /// Round counter.
    pub current_round: u32,
    /// Whether the round is locked.
    pub is_locked: bool,
    /// Completed scoring events.
    pub history: Vec<RoundRecordDto>,
    /// Countdown data.
    pub timer: TimerSnapshot,
}

impl GameSnapshot {
    /// Capture a consistent snapshot while the engine lock is held.
    pub fn capture(engine: &GameEngine) -> Self {
        let state = &engine.state;
        Self {
            teams: state
                .teams
                .values()
                .map(|team| team_snapshot(team, engine))
                .collect(),
            current_question: state.current_question.as_ref().map(Into::into),
            current_round: state.current_round,
            is_locked: state.is_locked,
            history: state.history.iter().map(Into::into).collect(),
            timer: state.timer.into(),
        }
    }
}

fn team_snapshot(team: &Team, engine: &GameEngine) -> TeamSnapshot {
    TeamSnapshot {
        id: team.id,
        name: team.name.clone(),
        score: team.score,
        answer: team.answer.clone(),
        special_cards: team.special_cards.into(),
        active_cards: team.active_cards.into(),
        redirect_target: team.redirect_target,
        controller_email: engine
            .seats
            .controller_identity(team.id)
            .map(str::to_owned),
        viewer_count: engine.seats.viewer_count(team.id),
    }
}
