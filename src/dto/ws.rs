use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::game::{GameSnapshot, QuestionDto, RoundResultsDto},
    state::{
        arbiter::Role,
        game::{CardKind, QuestionKind, TeamId},
    },
};

/// Messages accepted from WebSocket clients, discriminated by `event`.
///
/// Payload shapes are validated at this boundary before any dispatch; an
/// unrecognised event deserialises to [`ClientMessage::Unknown`].
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Admin-only idempotent room join.
    JoinAdmin,
    /// Request the sample question bank.
    GetSampleQuestions,
    /// Admin installs a new question and opens the answer window.
    #[serde(rename_all = "camelCase")]
    CreateQuestion {
        /// Question text.
        question: String,
        /// Question kind.
        #[serde(rename = "type")]
        #[schema(value_type = String)]
        kind: QuestionKind,
        /// Candidate answers.
        options: Vec<String>,
        /// The correct answer, compared by exact string match.
        correct_answer: String,
    },
    /// Admin locks the round.
    LockRound,
    /// Admin triggers scoring of the current round.
    CalculateScores,
    /// Admin resets the whole game.
    ResetGame,
    /// Controller submits (or overwrites) the team answer.
    #[serde(rename_all = "camelCase")]
    SubmitAnswer {
        /// Team the answer is for; the caller must be its controller.
        team_id: TeamId,
        /// The submitted answer.
        answer: String,
    },
    /// Controller arms a special card for the round.
    #[serde(rename_all = "camelCase")]
    ActivateCard {
        /// Team the card belongs to; the caller must be its controller.
        team_id: TeamId,
        /// Which card to arm.
        #[schema(value_type = String)]
        card_type: CardKind,
        /// Redirect target, meaningful only for the redirect card.
        redirect_target: Option<TeamId>,
    },
    /// Any event this protocol does not know.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a client frame.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Messages pushed to WebSocket clients, discriminated by `event`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full sanitized state snapshot.
    GameState(GameSnapshot),
    /// Sent to a team connection right after it is seated.
    #[serde(rename_all = "camelCase")]
    AuthSuccess {
        /// Role granted to this connection.
        #[schema(value_type = String)]
        role: Role,
        /// The team joined.
        team_id: TeamId,
        /// Identity of this connection.
        email: String,
        /// Identity of the team's current controller.
        controller_email: Option<String>,
    },
    /// Sent to a team's connections whenever its seating changes.
    #[serde(rename_all = "camelCase")]
    ControllerStatus {
        /// Identity of the current controller, if any.
        controller_email: Option<String>,
        /// Number of seated viewers.
        viewer_count: usize,
    },
    /// Sent to the one viewer promoted to controller.
    Promoted {
        /// Human-readable promotion notice.
        message: String,
    },
    /// A new question opened an answer window.
    NewQuestion(QuestionDto),
    /// The round is locked.
    RoundLocked,
    /// Lightweight once-a-second countdown update.
    TimerUpdate {
        /// Seconds left.
        remaining: u64,
        /// Configured duration.
        duration: u64,
    },
    /// The countdown reached zero and auto-locked the round.
    TimerExpired,
    /// Scoring outcome for the round just computed.
    RoundResults(RoundResultsDto),
    /// The sample question bank, in response to `getSampleQuestions`.
    SampleQuestions {
        /// Loaded sample questions.
        questions: Vec<QuestionDto>,
    },
    /// The game was reset to its initial state.
    GameReset,
    /// A per-event failure, reported only to the originating connection.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_answer_parses_camel_case_fields() {
        let msg = ClientMessage::from_json_str(
            r#"{"event":"submitAnswer","teamId":3,"answer":"Paris"}"#,
        )
        .unwrap();

        match msg {
            ClientMessage::SubmitAnswer { team_id, answer } => {
                assert_eq!(team_id, 3);
                assert_eq!(answer, "Paris");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn create_question_keeps_the_type_field_for_the_question_kind() {
        let msg = ClientMessage::from_json_str(
            r#"{
                "event": "createQuestion",
                "question": "1 + 1?",
                "type": "multipleChoice",
                "options": ["1", "2"],
                "correctAnswer": "2"
            }"#,
        )
        .unwrap();

        match msg {
            ClientMessage::CreateQuestion {
                question,
                kind,
                options,
                correct_answer,
            } => {
                assert_eq!(question, "1 + 1?");
                assert_eq!(kind, QuestionKind::MultipleChoice);
                assert_eq!(options.len(), 2);
                assert_eq!(correct_answer, "2");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn activate_card_accepts_optional_redirect_target() {
        let msg = ClientMessage::from_json_str(
            r#"{"event":"activateCard","teamId":2,"cardType":"redirect","redirectTarget":6}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::ActivateCard {
                team_id,
                card_type,
                redirect_target,
            } => {
                assert_eq!(team_id, 2);
                assert_eq!(card_type, CardKind::Redirect);
                assert_eq!(redirect_target, Some(6));
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let msg = ClientMessage::from_json_str(
            r#"{"event":"activateCard","teamId":2,"cardType":"allIn"}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::ActivateCard {
                card_type: CardKind::AllIn,
                redirect_target: None,
                ..
            }
        ));
    }

    #[test]
    fn unrecognised_events_fall_through_to_unknown() {
        let msg = ClientMessage::from_json_str(r#"{"event":"danceParty"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Unknown));
    }

    #[test]
    fn server_messages_carry_the_event_discriminator() {
        let json = serde_json::to_value(&ServerMessage::TimerUpdate {
            remaining: 12,
            duration: 30,
        })
        .unwrap();
        assert_eq!(json["event"], "timerUpdate");
        assert_eq!(json["remaining"], 12);

        let json = serde_json::to_value(&ServerMessage::RoundLocked).unwrap();
        assert_eq!(json["event"], "roundLocked");

        let json = serde_json::to_value(&ServerMessage::ControllerStatus {
            controller_email: Some("c@example.com".into()),
            viewer_count: 1,
        })
        .unwrap();
        assert_eq!(json["event"], "controllerStatus");
        assert_eq!(json["controllerEmail"], "c@example.com");
        assert_eq!(json["viewerCount"], 1);
    }
}
