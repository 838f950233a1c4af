//! End-to-end exercises of the turn lifecycle through the service layer,
//! with fake client connections observing the broadcast stream.

use axum::extract::ws::Message;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use domino_quiz_back::{
    config::{AppConfig, GameRules},
    registry::{RosterTeam, TeamRegistry},
    services::game_service,
    state::{AppState, ClientConnection, SharedState},
};
use domino_quiz_back::state::game::{CardKind, GameError, Question, QuestionKind};

fn test_state(team_count: u32) -> SharedState {
    let registry = TeamRegistry::from_parts(
        (1..=team_count)
            .map(|id| RosterTeam {
                id,
                name: format!("Team {id}"),
                members: vec![format!("member{id}@example.com")],
            })
            .collect(),
        vec!["host@example.com".into()],
    );

    let config = AppConfig {
        rules: GameRules::default(),
        session_secret: "test-secret".into(),
        admin_username: "admin".into(),
        admin_password: "admin123".into(),
        google_client_id: None,
        test_mode: true,
        teams_path: "config/teams.json".into(),
        questions_path: "config/questions.json".into(),
    };

    AppState::new(config, registry, Vec::new())
}

/// Register a fake connection and, for team members, seat it with the arbiter.
async fn connect(
    state: &SharedState,
    team_id: Option<u32>,
    email: &str,
) -> (ClientConnection, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connection = ClientConnection {
        id: Uuid::new_v4(),
        email: email.to_string(),
        team_id,
        is_admin: team_id.is_none(),
        tx,
    };
    state.clients().insert(connection.id, connection.clone());

    if let Some(team) = team_id {
        let conn_id = connection.id;
        let identity = connection.email.clone();
        state
            .with_engine(move |engine| engine.seats.join(team, conn_id, identity))
            .await;
    }

    (connection, rx)
}

/// Drain everything queued on a fake connection into parsed JSON values.
fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            events.push(serde_json::from_str(text.as_str()).expect("frames are JSON"));
        }
    }
    events
}

fn events_named<'a>(events: &'a [Value], name: &str) -> Vec<&'a Value> {
    events.iter().filter(|e| e["event"] == name).collect()
}

fn question() -> Question {
    Question {
        kind: QuestionKind::MultipleChoice,
        text: "Which treaty split Vietnam at the 17th parallel?".into(),
        options: vec!["A. Geneva Accords".into(), "B. Paris Accords".into()],
        correct_answer: "A. Geneva Accords".into(),
    }
}

#[tokio::test]
async fn question_broadcast_reaches_every_connection() {
    let state = test_state(3);
    let (_admin, mut admin_rx) = connect(&state, None, "host@example.com").await;
    let (_controller, mut team_rx) = connect(&state, Some(1), "member1@example.com").await;

    game_service::create_question(&state, question())
        .await
        .unwrap();

    for rx in [&mut admin_rx, &mut team_rx] {
        let events = drain(rx);
        assert_eq!(events_named(&events, "newQuestion").len(), 1);
        let snapshots = events_named(&events, "gameState");
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0]["currentRound"], 1);
        assert_eq!(snapshots[0]["isLocked"], false);
        assert_eq!(snapshots[0]["timer"]["active"], true);
    }
}

#[tokio::test]
async fn only_the_controller_of_that_team_may_submit() {
    let state = test_state(3);
    let (controller, _rx1) = connect(&state, Some(1), "member1@example.com").await;
    let (viewer, _rx2) = connect(&state, Some(1), "viewer1@example.com").await;

    game_service::create_question(&state, question())
        .await
        .unwrap();

    // The controller may answer for its own team only.
    game_service::submit_answer(&state, &controller, 1, "A. Geneva Accords".into())
        .await
        .unwrap();
    assert_eq!(
        game_service::submit_answer(&state, &controller, 2, "A. Geneva Accords".into()).await,
        Err(GameError::PermissionDenied)
    );

    // Viewers are read-only.
    assert_eq!(
        game_service::submit_answer(&state, &viewer, 1, "B. Paris Accords".into()).await,
        Err(GameError::PermissionDenied)
    );

    let recorded = state
        .with_engine(|engine| engine.state.teams[&1].answer.clone())
        .await;
    assert_eq!(recorded.as_deref(), Some("A. Geneva Accords"));
}

#[tokio::test]
async fn locking_twice_broadcasts_the_lock_only_once() {
    let state = test_state(3);
    let (_controller, mut rx) = connect(&state, Some(1), "member1@example.com").await;

    game_service::create_question(&state, question())
        .await
        .unwrap();
    drain(&mut rx);

    game_service::lock_round(&state).await.unwrap();
    game_service::lock_round(&state).await.unwrap();

    let events = drain(&mut rx);
    assert_eq!(events_named(&events, "roundLocked").len(), 1);
    assert_eq!(events_named(&events, "gameState").len(), 1);
}

#[tokio::test]
async fn locked_round_rejects_answers_and_cards() {
    let state = test_state(3);
    let (controller, _rx) = connect(&state, Some(1), "member1@example.com").await;

    game_service::create_question(&state, question())
        .await
        .unwrap();
    game_service::lock_round(&state).await.unwrap();

    assert_eq!(
        game_service::submit_answer(&state, &controller, 1, "A. Geneva Accords".into()).await,
        Err(GameError::RoundLocked)
    );
    assert_eq!(
        game_service::activate_card(&state, &controller, 1, CardKind::Immunity, None).await,
        Err(GameError::RoundLocked)
    );
}

#[tokio::test]
async fn scoring_broadcasts_results_and_updates_scores() {
    let state = test_state(3);
    let (_admin, mut admin_rx) = connect(&state, None, "host@example.com").await;
    let (c1, _rx1) = connect(&state, Some(1), "member1@example.com").await;
    let (c2, _rx2) = connect(&state, Some(2), "member2@example.com").await;

    // Scoring with no question is refused up front.
    assert_eq!(
        game_service::calculate_scores(&state).await,
        Err(GameError::NoActiveQuestion)
    );

    game_service::create_question(&state, question())
        .await
        .unwrap();
    game_service::submit_answer(&state, &c1, 1, "A. Geneva Accords".into())
        .await
        .unwrap();
    game_service::submit_answer(&state, &c2, 2, "B. Paris Accords".into())
        .await
        .unwrap();
    drain(&mut admin_rx);

    game_service::calculate_scores(&state).await.unwrap();

    let events = drain(&mut admin_rx);
    let results = events_named(&events, "roundResults");
    assert_eq!(results.len(), 1);
    let results = results[0];

    assert_eq!(results["isCrisis"], false);
    // Teams 2 (wrong answer) and 3 (no answer) both domino onto their
    // successors, 3 and 1 respectively.
    assert_eq!(results["dominoChains"][0]["from"], 2);
    assert_eq!(results["dominoChains"][0]["to"], 3);
    assert_eq!(results["dominoChains"][1]["from"], 3);
    assert_eq!(results["dominoChains"][1]["to"], 1);

    let scores = state
        .with_engine(|engine| {
            engine
                .state
                .teams
                .values()
                .map(|team| team.score)
                .collect::<Vec<_>>()
        })
        .await;
    // From 15 each: team 1 is +2 correct -1 dominoed; team 2 is -2 wrong;
    // team 3 is -2 for its missing answer -1 dominoed.
    assert_eq!(scores, vec![16, 13, 12]);

    let history_len = state
        .with_engine(|engine| engine.state.history.len())
        .await;
    assert_eq!(history_len, 1);
}

#[tokio::test]
async fn reset_restores_scores_cards_and_seats() {
    let state = test_state(3);
    let (controller, mut rx) = connect(&state, Some(1), "member1@example.com").await;

    game_service::create_question(&state, question())
        .await
        .unwrap();
    game_service::activate_card(&state, &controller, 1, CardKind::AllIn, None)
        .await
        .unwrap();
    game_service::calculate_scores(&state).await.unwrap();
    drain(&mut rx);

    game_service::reset_game(&state).await.unwrap();

    let events = drain(&mut rx);
    assert_eq!(events_named(&events, "gameReset").len(), 1);
    let snapshots = events_named(&events, "gameState");
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0]["currentRound"], 0);
    assert_eq!(snapshots[0]["history"].as_array().unwrap().len(), 0);
    assert_eq!(snapshots[0]["teams"][0]["score"], 15);
    assert_eq!(snapshots[0]["teams"][0]["specialCards"]["allIn"], true);
    // Seats were cleared with everything else.
    assert_eq!(snapshots[0]["teams"][0]["viewerCount"], 0);

    let seated = state
        .with_engine(|engine| engine.seats.controller_identity(1).map(str::to_owned))
        .await;
    assert_eq!(seated, None);
}

#[tokio::test]
async fn card_activation_is_single_use_and_visible_in_snapshots() {
    let state = test_state(3);
    let (controller, mut rx) = connect(&state, Some(2), "member2@example.com").await;

    game_service::create_question(&state, question())
        .await
        .unwrap();
    drain(&mut rx);

    game_service::activate_card(&state, &controller, 2, CardKind::Redirect, Some(3))
        .await
        .unwrap();
    assert_eq!(
        game_service::activate_card(&state, &controller, 2, CardKind::Redirect, Some(1)).await,
        Err(GameError::CardAlreadyUsed(CardKind::Redirect))
    );

    let events = drain(&mut rx);
    let snapshots = events_named(&events, "gameState");
    assert_eq!(snapshots.len(), 1);
    let team = &snapshots[0]["teams"][1];
    assert_eq!(team["specialCards"]["redirect"], false);
    assert_eq!(team["activeCards"]["redirect"], true);
    assert_eq!(team["redirectTarget"], 3);
}
