use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::GameRules,
    registry::TeamRegistry,
    state::scoring::{self, RoundOutcome},
};

/// Identifier of a team, as declared in the roster (contiguous, starting at 1).
pub type TeamId = u32;

/// Special card kinds a team can play once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardKind {
    /// Blocks an incoming domino penalty for the round.
    Immunity,
    /// Re-routes an incoming domino penalty to a chosen team.
    Redirect,
    /// Doubles the magnitude of the base correctness delta.
    AllIn,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Immunity => "immunity",
            Self::Redirect => "redirect",
            Self::AllIn => "allIn",
        })
    }
}

/// One boolean per card kind; used both for availability and armed-this-round flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardFlags {
    /// Immunity card flag.
    pub immunity: bool,
    /// Redirect card flag.
    pub redirect: bool,
    /// All-in card flag.
    pub all_in: bool,
}

impl CardFlags {
    /// Every card flagged, the availability set of a fresh team.
    pub fn all_available() -> Self {
        Self {
            immunity: true,
            redirect: true,
            all_in: true,
        }
    }

    /// Read the flag for `kind`.
    pub fn get(&self, kind: CardKind) -> bool {
        match kind {
            CardKind::Immunity => self.immunity,
            CardKind::Redirect => self.redirect,
            CardKind::AllIn => self.all_in,
        }
    }

    /// Write the flag for `kind`.
    pub fn set(&mut self, kind: CardKind, value: bool) {
        match kind {
            CardKind::Immunity => self.immunity = value,
            CardKind::Redirect => self.redirect = value,
            CardKind::AllIn => self.all_in = value,
        }
    }
}

/// Kind of question being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionKind {
    /// Free set of options, one of which is correct.
    MultipleChoice,
    /// Two options, true or false.
    TrueFalse,
}

/// An immutable question; at most one is current at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Multiple choice or true/false.
    pub kind: QuestionKind,
    /// The question text shown to every team.
    pub text: String,
    /// Candidate answers, in display order.
    pub options: Vec<String>,
    /// The answer submissions are compared against (exact string match).
    pub correct_answer: String,
}

/// A participating team and its round-scoped data.
///
/// Connection handles are deliberately absent: controller and viewer seats
/// live in the role arbiter side-table and are joined into snapshots at
/// serialization time.
#[derive(Debug, Clone)]
pub struct Team {
    /// Roster identifier.
    pub id: TeamId,
    /// Display name from the roster.
    pub name: String,
    /// Current score, never below the configured floor.
    pub score: i32,
    /// Answer recorded for the current round, if any.
    pub answer: Option<String>,
    /// Cards still available this session (single-use).
    pub special_cards: CardFlags,
    /// Cards armed for the current round.
    pub active_cards: CardFlags,
    /// Target recorded when the redirect card was armed with one.
    pub redirect_target: Option<TeamId>,
}

impl Team {
    fn fresh(id: TeamId, name: String, initial_score: i32) -> Self {
        Self {
            id,
            name,
            score: initial_score,
            answer: None,
            special_cards: CardFlags::all_available(),
            active_cards: CardFlags::default(),
            redirect_target: None,
        }
    }
}

/// Countdown data exposed in snapshots; the running task handle lives outside
/// the serializable state.
#[derive(Debug, Clone, Copy)]
pub struct TimerState {
    /// Whether a countdown is currently running.
    pub active: bool,
    /// Configured round duration in seconds.
    pub duration_secs: u64,
    /// Seconds left before the round auto-locks.
    pub remaining_secs: u64,
}

/// One completed scoring event, appended to the in-memory history.
#[derive(Debug, Clone)]
pub struct RoundRecord {
    /// Round counter at the time of scoring.
    pub round: u32,
    /// The question that was scored.
    pub question: Question,
    /// Full outcome as broadcast to clients.
    pub results: RoundOutcome,
    /// RFC 3339 timestamp supplied by the caller.
    pub timestamp: String,
}

/// Outcome of a single countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Timer still running; carries the seconds left and the full duration.
    Running {
        /// Seconds left.
        remaining: u64,
        /// Configured duration.
        duration: u64,
    },
    /// Timer just reached zero; the round has been force-locked.
    Expired,
    /// No countdown is active; the tick did nothing.
    Idle,
}

/// Per-event errors; all are local and non-fatal, the state stays consistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Caller lacks the role the operation requires.
    #[error("only the team controller may perform this action")]
    PermissionDenied,
    /// The round is locked; answers and cards are no longer accepted.
    #[error("the round is locked, no further changes are accepted")]
    RoundLocked,
    /// The card was already consumed earlier in the session.
    #[error("card `{0}` has already been used")]
    CardAlreadyUsed(CardKind),
    /// Scoring was requested with no current question.
    #[error("no question is currently active")]
    NoActiveQuestion,
    /// The team id is not part of the roster.
    #[error("unknown team `{0}`")]
    UnknownTeam(TeamId),
    /// A question payload failed boundary validation.
    #[error("invalid question: {0}")]
    InvalidQuestion(String),
}

/// The authoritative, process-wide game state.
///
/// All mutation goes through the operation set below while the engine mutex is
/// held, so each operation is atomic relative to every other.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Teams keyed by id, in ascending-id order.
    pub teams: IndexMap<TeamId, Team>,
    /// The question currently being played, if any.
    pub current_question: Option<Question>,
    /// Incremented exactly once per created question.
    pub current_round: u32,
    /// Monotonic within a round; cleared by the next question or a reset.
    pub is_locked: bool,
    /// Append-only record of completed scoring events.
    pub history: Vec<RoundRecord>,
    /// Countdown data mirrored into snapshots.
    pub timer: TimerState,
}

impl GameState {
    /// Initialise every team from the roster with the configured starting score.
    pub fn new(registry: &TeamRegistry, rules: &GameRules) -> Self {
        Self {
            teams: initial_teams(registry, rules),
            current_question: None,
            current_round: 0,
            is_locked: false,
            history: Vec::new(),
            timer: TimerState {
                active: false,
                duration_secs: rules.round_duration_secs,
                remaining_secs: rules.round_duration_secs,
            },
        }
    }

    /// Install a new question and open the answer window.
    ///
    /// Clears every recorded answer, bumps the round counter, unlocks, and
    /// rearms the countdown at the configured duration. The caller is
    /// responsible for cancelling any running countdown task first.
    pub fn begin_round(&mut self, question: Question) {
        self.current_question = Some(question);
        self.current_round += 1;
        self.is_locked = false;

        for team in self.teams.values_mut() {
            team.answer = None;
        }

        self.timer.active = true;
        self.timer.remaining_secs = self.timer.duration_secs;
    }

    /// Record (or overwrite) a team's answer; last write before lock wins.
    pub fn record_answer(&mut self, team_id: TeamId, answer: String) -> Result<(), GameError> {
        if self.is_locked {
            return Err(GameError::RoundLocked);
        }

        let team = self
            .teams
            .get_mut(&team_id)
            .ok_or(GameError::UnknownTeam(team_id))?;
        team.answer = Some(answer);
        Ok(())
    }

    /// Consume a card's availability and arm it for the current round.
    pub fn arm_card(
        &mut self,
        team_id: TeamId,
        card: CardKind,
        redirect_target: Option<TeamId>,
    ) -> Result<(), GameError> {
        if self.is_locked {
            return Err(GameError::RoundLocked);
        }

        let team = self
            .teams
            .get_mut(&team_id)
            .ok_or(GameError::UnknownTeam(team_id))?;

        if !team.special_cards.get(card) {
            return Err(GameError::CardAlreadyUsed(card));
        }

        team.special_cards.set(card, false);
        team.active_cards.set(card, true);
        if card == CardKind::Redirect
            && let Some(target) = redirect_target
        {
            team.redirect_target = Some(target);
        }

        Ok(())
    }

    /// Lock the round. Returns `false` when it was already locked, in which
    /// case the caller skips re-broadcasting.
    pub fn lock(&mut self) -> bool {
        if self.is_locked {
            return false;
        }
        self.is_locked = true;
        true
    }

    /// Advance the countdown by one second.
    ///
    /// Reaching zero deactivates the timer and force-locks the round, the
    /// auto-lock path equivalent to an admin lock.
    pub fn tick(&mut self) -> CountdownTick {
        if !self.timer.active {
            return CountdownTick::Idle;
        }

        self.timer.remaining_secs = self.timer.remaining_secs.saturating_sub(1);
        if self.timer.remaining_secs == 0 {
            self.timer.active = false;
            self.is_locked = true;
            return CountdownTick::Expired;
        }

        CountdownTick::Running {
            remaining: self.timer.remaining_secs,
            duration: self.timer.duration_secs,
        }
    }

    /// Score the current round and apply the outcome as one unit.
    ///
    /// Delegates the computation to the pure scoring engine, then commits the
    /// per-team scores, clears the round-scoped card state, and appends the
    /// record to the history.
    pub fn score_round(
        &mut self,
        rules: &GameRules,
        timestamp: String,
    ) -> Result<RoundOutcome, GameError> {
        let question = self
            .current_question
            .as_ref()
            .ok_or(GameError::NoActiveQuestion)?;

        let outcome = scoring::score_round(&self.teams, question, rules);

        for result in &outcome.teams {
            if let Some(team) = self.teams.get_mut(&result.id) {
                team.score = result.score_after;
                team.active_cards = CardFlags::default();
                team.redirect_target = None;
            }
        }

        self.history.push(RoundRecord {
            round: self.current_round,
            question: question.clone(),
            results: outcome.clone(),
            timestamp,
        });

        Ok(outcome)
    }

    /// Return every team and counter to its initial state.
    pub fn reset(&mut self, registry: &TeamRegistry, rules: &GameRules) {
        self.teams = initial_teams(registry, rules);
        self.current_question = None;
        self.current_round = 0;
        self.is_locked = false;
        self.history.clear();
        self.timer = TimerState {
            active: false,
            duration_secs: rules.round_duration_secs,
            remaining_secs: rules.round_duration_secs,
        };
    }
}

fn initial_teams(registry: &TeamRegistry, rules: &GameRules) -> IndexMap<TeamId, Team> {
    registry
        .teams()
        .iter()
        .map(|entry| {
            (
                entry.id,
                Team::fresh(entry.id, entry.name.clone(), rules.initial_score),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RosterTeam;

    fn registry(count: u32) -> TeamRegistry {
        TeamRegistry::from_parts(
            (1..=count)
                .map(|id| RosterTeam {
                    id,
                    name: format!("Team {id}"),
                    members: vec![format!("member{id}@example.com")],
                })
                .collect(),
            vec!["admin@example.com".into()],
        )
    }

    fn rules() -> GameRules {
        GameRules::default()
    }

    fn question() -> Question {
        Question {
            kind: QuestionKind::MultipleChoice,
            text: "capital of France?".into(),
            options: vec!["Paris".into(), "Lyon".into()],
            correct_answer: "Paris".into(),
        }
    }

    #[test]
    fn begin_round_opens_window_and_bumps_counter() {
        let mut state = GameState::new(&registry(3), &rules());
        state.is_locked = true;

        state.begin_round(question());

        assert_eq!(state.current_round, 1);
        assert!(!state.is_locked);
        assert!(state.timer.active);
        assert_eq!(state.timer.remaining_secs, state.timer.duration_secs);
        assert!(state.teams.values().all(|t| t.answer.is_none()));
    }

    #[test]
    fn answers_overwrite_until_lock() {
        let mut state = GameState::new(&registry(3), &rules());
        state.begin_round(question());

        state.record_answer(1, "Lyon".into()).unwrap();
        state.record_answer(1, "Paris".into()).unwrap();
        assert_eq!(state.teams[&1].answer.as_deref(), Some("Paris"));

        assert!(state.lock());
        assert_eq!(
            state.record_answer(1, "Lyon".into()),
            Err(GameError::RoundLocked)
        );
        assert_eq!(state.teams[&1].answer.as_deref(), Some("Paris"));
    }

    #[test]
    fn lock_is_idempotent() {
        let mut state = GameState::new(&registry(3), &rules());
        assert!(state.lock());
        assert!(!state.lock());
        assert!(state.is_locked);
    }

    #[test]
    fn card_is_single_use_across_rounds() {
        let mut state = GameState::new(&registry(3), &rules());
        state.begin_round(question());

        state.arm_card(2, CardKind::Immunity, None).unwrap();
        assert!(state.teams[&2].active_cards.immunity);
        assert!(!state.teams[&2].special_cards.immunity);

        assert_eq!(
            state.arm_card(2, CardKind::Immunity, None),
            Err(GameError::CardAlreadyUsed(CardKind::Immunity))
        );

        // Scoring clears the armed flag but never restores availability.
        state.score_round(&rules(), "t0".into()).unwrap();
        state.begin_round(question());
        assert!(!state.teams[&2].active_cards.immunity);
        assert_eq!(
            state.arm_card(2, CardKind::Immunity, None),
            Err(GameError::CardAlreadyUsed(CardKind::Immunity))
        );
    }

    #[test]
    fn redirect_target_recorded_and_cleared_after_scoring() {
        let mut state = GameState::new(&registry(3), &rules());
        state.begin_round(question());

        state.arm_card(2, CardKind::Redirect, Some(3)).unwrap();
        assert_eq!(state.teams[&2].redirect_target, Some(3));

        state.score_round(&rules(), "t0".into()).unwrap();
        assert_eq!(state.teams[&2].redirect_target, None);
        assert_eq!(state.teams[&2].active_cards, CardFlags::default());
    }

    #[test]
    fn locked_round_rejects_cards() {
        let mut state = GameState::new(&registry(3), &rules());
        state.begin_round(question());
        state.lock();

        assert_eq!(
            state.arm_card(1, CardKind::AllIn, None),
            Err(GameError::RoundLocked)
        );
        assert!(state.teams[&1].special_cards.all_in);
    }

    #[test]
    fn tick_counts_down_and_expiry_locks() {
        let mut state = GameState::new(&registry(3), &rules());
        state.begin_round(question());
        state.timer.remaining_secs = 2;

        assert_eq!(
            state.tick(),
            CountdownTick::Running {
                remaining: 1,
                duration: state.timer.duration_secs
            }
        );
        assert_eq!(state.tick(), CountdownTick::Expired);
        assert!(state.is_locked);
        assert!(!state.timer.active);
        assert_eq!(state.tick(), CountdownTick::Idle);
    }

    #[test]
    fn scoring_without_question_is_rejected() {
        let mut state = GameState::new(&registry(3), &rules());
        let err = state.score_round(&rules(), "t0".into()).unwrap_err();
        assert_eq!(err, GameError::NoActiveQuestion);
        assert!(state.history.is_empty());
    }

    #[test]
    fn history_grows_once_per_scoring() {
        let mut state = GameState::new(&registry(3), &rules());
        state.begin_round(question());
        state.score_round(&rules(), "t0".into()).unwrap();
        state.begin_round(question());
        state.score_round(&rules(), "t1".into()).unwrap();

        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[0].round, 1);
        assert_eq!(state.history[1].round, 2);
    }

    #[test]
    fn reset_restores_initial_state() {
        let reg = registry(3);
        let mut state = GameState::new(&reg, &rules());
        state.begin_round(question());
        state.record_answer(1, "Paris".into()).unwrap();
        state.arm_card(1, CardKind::AllIn, None).unwrap();
        state.score_round(&rules(), "t0".into()).unwrap();

        state.reset(&reg, &rules());

        assert_eq!(state.current_round, 0);
        assert!(state.current_question.is_none());
        assert!(!state.is_locked);
        assert!(state.history.is_empty());
        let team = &state.teams[&1];
        assert_eq!(team.score, rules().initial_score);
        assert_eq!(team.special_cards, CardFlags::all_available());
        assert!(team.answer.is_none());
    }
}
