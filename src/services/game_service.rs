use std::time::Duration;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::{
        game::{GameSnapshot, QuestionDto, RoundResultsDto},
        validation,
        ws::ServerMessage,
    },
    services::ws_events,
    state::{
        ClientConnection, SharedState,
        game::{CardKind, CountdownTick, GameError, Question, TeamId},
    },
};

/// Install a new question, open the answer window, and restart the countdown.
///
/// The running countdown (if any) is always cancelled before the new one
/// starts so two timers never race on the same round.
pub async fn create_question(state: &SharedState, question: Question) -> Result<(), GameError> {
    validation::validate_question(
        question.kind,
        &question.text,
        &question.options,
        &question.correct_answer,
    )?;

    state.cancel_countdown().await;

    let question_dto = QuestionDto::from(&question);
    let snapshot = state
        .with_engine(|engine| {
            engine.state.begin_round(question);
            GameSnapshot::capture(engine)
        })
        .await;

    info!(
        round = snapshot.current_round,
        question = %question_dto.question,
        duration = snapshot.timer.duration,
        "question created"
    );

    ws_events::broadcast_all(state, &ServerMessage::NewQuestion(question_dto));
    ws_events::broadcast_all(state, &ServerMessage::GameState(snapshot));

    let handle = tokio::spawn(run_countdown(state.clone()));
    state.install_countdown(handle).await;

    Ok(())
}

/// Record a team's answer; only that team's controller may do so, and only
/// while the round is open. Overwrites are allowed until lock.
pub async fn submit_answer(
    state: &SharedState,
    connection: &ClientConnection,
    team_id: TeamId,
    answer: String,
) -> Result<(), GameError> {
    let (snapshot, team_name) = state
        .with_engine(|engine| {
            if !engine.seats.is_controller(team_id, connection.id) {
                return Err(GameError::PermissionDenied);
            }
            engine.state.record_answer(team_id, answer)?;
            let name = engine
                .state
                .teams
                .get(&team_id)
                .map(|team| team.name.clone())
                .unwrap_or_default();
            Ok((GameSnapshot::capture(engine), name))
        })
        .await?;

    info!(team = %team_name, "answer recorded");
    ws_events::broadcast_all(state, &ServerMessage::GameState(snapshot));
    Ok(())
}

/// Arm a special card for the round, consuming its availability permanently.
pub async fn activate_card(
    state: &SharedState,
    connection: &ClientConnection,
    team_id: TeamId,
    card: CardKind,
    redirect_target: Option<TeamId>,
) -> Result<(), GameError> {
    let snapshot = state
        .with_engine(|engine| {
            if !engine.seats.is_controller(team_id, connection.id) {
                return Err(GameError::PermissionDenied);
            }
            engine.state.arm_card(team_id, card, redirect_target)?;
            Ok(GameSnapshot::capture(engine))
        })
        .await?;

    info!(team = team_id, card = %card, "card activated");
    ws_events::broadcast_all(state, &ServerMessage::GameState(snapshot));
    Ok(())
}

/// Lock the round. Idempotent: a second call changes nothing and broadcasts
/// nothing.
pub async fn lock_round(state: &SharedState) -> Result<(), GameError> {
    let snapshot = state
        .with_engine(|engine| engine.state.lock().then(|| GameSnapshot::capture(engine)))
        .await;

    if let Some(snapshot) = snapshot {
        info!("round locked");
        ws_events::broadcast_all(state, &ServerMessage::RoundLocked);
        ws_events::broadcast_all(state, &ServerMessage::GameState(snapshot));
    }

    Ok(())
}

/// Score the current round and broadcast the outcome.
pub async fn calculate_scores(state: &SharedState) -> Result<(), GameError> {
    let rules = state.config().rules.clone();
    let timestamp = now_rfc3339();

    let (results, snapshot) = state
        .with_engine(|engine| {
            let outcome = engine.state.score_round(&rules, timestamp)?;
            Ok::<_, GameError>((RoundResultsDto::from(&outcome), GameSnapshot::capture(engine)))
        })
        .await?;

    info!(
        round = snapshot.current_round,
        is_crisis = results.is_crisis,
        chains = results.domino_chains.len(),
        "round scored"
    );

    ws_events::broadcast_all(state, &ServerMessage::RoundResults(results));
    ws_events::broadcast_all(state, &ServerMessage::GameState(snapshot));
    Ok(())
}

/// Reinitialise the whole game: scores, cards, seats, question, and history.
pub async fn reset_game(state: &SharedState) -> Result<(), GameError> {
    state.cancel_countdown().await;

    let snapshot = state
        .with_engine(|engine| {
            engine.state.reset(state.registry(), &state.config().rules);
            engine.seats.clear();
            GameSnapshot::capture(engine)
        })
        .await;

    info!("game reset");
    ws_events::broadcast_all(state, &ServerMessage::GameReset);
    ws_events::broadcast_all(state, &ServerMessage::GameState(snapshot));
    Ok(())
}

/// Push the sample question bank to one connection.
pub fn send_sample_questions(state: &SharedState, connection: Uuid) {
    let questions = state.question_bank().iter().map(QuestionDto::from).collect();
    ws_events::send_to(
        state,
        connection,
        &ServerMessage::SampleQuestions { questions },
    );
}

/// One-second countdown loop injected into the same serialized mutation
/// stream as client events; each tick takes the engine lock like any other
/// operation.
async fn run_countdown(state: SharedState) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // The first tick completes immediately; skip it so the first decrement
    // lands a full second after the question opened.
    interval.tick().await;

    loop {
        interval.tick().await;

        let (tick, duration) = state
            .with_engine(|engine| (engine.state.tick(), engine.state.timer.duration_secs))
            .await;

        match tick {
            CountdownTick::Running {
                remaining,
                duration,
            } => {
                // Lightweight timer-only update, not a full snapshot.
                ws_events::broadcast_all(
                    &state,
                    &ServerMessage::TimerUpdate {
                        remaining,
                        duration,
                    },
                );
            }
            CountdownTick::Expired => {
                info!("countdown expired; round auto-locked");
                ws_events::broadcast_all(
                    &state,
                    &ServerMessage::TimerUpdate {
                        remaining: 0,
                        duration,
                    },
                );
                ws_events::broadcast_all(&state, &ServerMessage::RoundLocked);
                ws_events::broadcast_all(&state, &ServerMessage::TimerExpired);
                break;
            }
            CountdownTick::Idle => break,
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
