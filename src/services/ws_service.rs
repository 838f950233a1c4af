use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        game::GameSnapshot,
        ws::{ClientMessage, ServerMessage},
    },
    services::{auth_service::Claims, game_service, ws_events},
    state::{
        ClientConnection, SharedState,
        arbiter::LeaveOutcome,
        game::{GameError, Question, TeamId},
    },
};

/// Handle the full lifecycle of an authenticated client WebSocket connection.
///
/// The principal was already resolved at upgrade time; from here the
/// connection is registered, seated (for team members), and its events are
/// dispatched one at a time until the socket closes.
pub async fn handle_socket(state: SharedState, socket: WebSocket, claims: Claims) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection = ClientConnection {
        id: Uuid::new_v4(),
        email: claims.email.clone(),
        team_id: if claims.is_admin { None } else { claims.team_id },
        is_admin: claims.is_admin,
        tx: outbound_tx.clone(),
    };
    state.clients().insert(connection.id, connection.clone());

    if connection.is_admin {
        info!(email = %connection.email, "admin connected");
        let snapshot = state.with_engine(|engine| GameSnapshot::capture(engine)).await;
        ws_events::send_to(&state, connection.id, &ServerMessage::GameState(snapshot));
    } else if let Some(team_id) = connection.team_id {
        seat_team_member(&state, &connection, team_id).await;
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientMessage::from_json_str(&text) {
                Ok(event) => {
                    if let Err(err) = dispatch(&state, &connection, event).await {
                        warn!(email = %connection.email, error = %err, "event rejected");
                        ws_events::send_to(
                            &state,
                            connection.id,
                            &ServerMessage::Error {
                                message: err.to_string(),
                            },
                        );
                    }
                }
                Err(err) => {
                    warn!(email = %connection.email, error = %err, "failed to parse client message");
                    ws_events::send_to(
                        &state,
                        connection.id,
                        &ServerMessage::Error {
                            message: "malformed message".into(),
                        },
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(email = %connection.email, error = %err, "websocket error");
                break;
            }
        }
    }

    state.clients().remove(&connection.id);
    if let Some(team_id) = connection.team_id {
        release_seat(&state, &connection, team_id).await;
    }
    info!(email = %connection.email, "client disconnected");

    // The local connection handle holds a sender clone; drop it before
    // waiting, or the writer would never see the channel close.
    drop(connection);
    finalize(writer_task, outbound_tx).await;
}

/// Route one validated client event to its operation, enforcing roles first.
async fn dispatch(
    state: &SharedState,
    connection: &ClientConnection,
    message: ClientMessage,
) -> Result<(), GameError> {
    match message {
        ClientMessage::JoinAdmin => {
            require_admin(connection)?;
            let snapshot = state.with_engine(|engine| GameSnapshot::capture(engine)).await;
            ws_events::send_to(state, connection.id, &ServerMessage::GameState(snapshot));
            Ok(())
        }
        ClientMessage::GetSampleQuestions => {
            game_service::send_sample_questions(state, connection.id);
            Ok(())
        }
        ClientMessage::CreateQuestion {
            question,
            kind,
            options,
            correct_answer,
        } => {
            require_admin(connection)?;
            game_service::create_question(
                state,
                Question {
                    kind,
                    text: question,
                    options,
                    correct_answer,
                },
            )
            .await
        }
        ClientMessage::LockRound => {
            require_admin(connection)?;
            game_service::lock_round(state).await
        }
        ClientMessage::CalculateScores => {
            require_admin(connection)?;
            game_service::calculate_scores(state).await
        }
        ClientMessage::ResetGame => {
            require_admin(connection)?;
            game_service::reset_game(state).await
        }
        ClientMessage::SubmitAnswer { team_id, answer } => {
            game_service::submit_answer(state, connection, team_id, answer).await
        }
        ClientMessage::ActivateCard {
            team_id,
            card_type,
            redirect_target,
        } => game_service::activate_card(state, connection, team_id, card_type, redirect_target).await,
        ClientMessage::Unknown => {
            warn!(email = %connection.email, "ignoring unknown event");
            Ok(())
        }
    }
}

fn require_admin(connection: &ClientConnection) -> Result<(), GameError> {
    if connection.is_admin {
        Ok(())
    } else {
        Err(GameError::PermissionDenied)
    }
}

/// Seat a team member and announce the resulting controller status.
async fn seat_team_member(state: &SharedState, connection: &ClientConnection, team_id: TeamId) {
    let seated = state
        .with_engine(|engine| {
            // The upgrade handler already vetted the team id against the
            // roster; guard anyway in case a reset raced the join.
            if !engine.state.teams.contains_key(&team_id) {
                return None;
            }
            let role = engine
                .seats
                .join(team_id, connection.id, connection.email.clone());
            Some((
                role,
                engine.seats.controller_identity(team_id).map(str::to_owned),
                engine.seats.viewer_count(team_id),
                engine.seats.connections(team_id),
                GameSnapshot::capture(engine),
            ))
        })
        .await;

    let Some((role, controller_email, viewer_count, team_connections, snapshot)) = seated else {
        ws_events::send_to(
            state,
            connection.id,
            &ServerMessage::Error {
                message: GameError::UnknownTeam(team_id).to_string(),
            },
        );
        let _ = connection.tx.send(Message::Close(None));
        return;
    };

    info!(email = %connection.email, team = team_id, ?role, "team member seated");

    ws_events::send_to(
        state,
        connection.id,
        &ServerMessage::AuthSuccess {
            role,
            team_id,
            email: connection.email.clone(),
            controller_email: controller_email.clone(),
        },
    );
    ws_events::send_to(state, connection.id, &ServerMessage::GameState(snapshot));
    ws_events::send_many(
        state,
        &team_connections,
        &ServerMessage::ControllerStatus {
            controller_email,
            viewer_count,
        },
    );
}

/// Free the seat a disconnecting member held, promoting the front viewer when
/// the controller left.
async fn release_seat(state: &SharedState, connection: &ClientConnection, team_id: TeamId) {
    let (outcome, controller_email, viewer_count, team_connections) = state
        .with_engine(|engine| {
            let outcome = engine.seats.leave(team_id, connection.id);
            (
                outcome,
                engine.seats.controller_identity(team_id).map(str::to_owned),
                engine.seats.viewer_count(team_id),
                engine.seats.connections(team_id),
            )
        })
        .await;

    match outcome {
        LeaveOutcome::ControllerLeft { promoted } => {
            if let Some(seat) = promoted {
                info!(email = %seat.identity, team = team_id, "viewer promoted to controller");
                ws_events::send_to(
                    state,
                    seat.connection,
                    &ServerMessage::Promoted {
                        message: "You have been promoted to controller".into(),
                    },
                );
            }
            ws_events::send_many(
                state,
                &team_connections,
                &ServerMessage::ControllerStatus {
                    controller_email,
                    viewer_count,
                },
            );
        }
        LeaveOutcome::ViewerLeft => {
            ws_events::send_many(
                state,
                &team_connections,
                &ServerMessage::ControllerStatus {
                    controller_email,
                    viewer_count,
                },
            );
        }
        LeaveOutcome::NotSeated => {}
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
