use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use crate::state::game::TeamId;

/// Role granted to a team connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The single connection allowed to submit answers and activate cards.
    Controller,
    /// A read-only connection, promotable when the controller leaves.
    Viewer,
}

/// A connection occupying a controller or viewer seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    /// Connection identifier (transport side-table key, never serialized).
    pub connection: Uuid,
    /// Identity (email) presented at connection time.
    pub identity: String,
}

/// What happened when a connection left its team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The controller left; the front viewer was promoted if one existed.
    ControllerLeft {
        /// The seat that was promoted to controller, if any.
        promoted: Option<Seat>,
    },
    /// A viewer left; nobody is promoted.
    ViewerLeft,
    /// The connection held no seat on that team.
    NotSeated,
}

#[derive(Debug, Default)]
struct TeamSeats {
    controller: Option<Seat>,
    viewers: VecDeque<Seat>,
}

/// Per-team controller/viewer seat assignment.
///
/// Keeps transport-layer connection references out of the game state entirely;
/// snapshots join controller identity and viewer count from here.
#[derive(Debug, Default)]
pub struct RoleArbiter {
    seats: IndexMap<TeamId, TeamSeats>,
}

impl RoleArbiter {
    /// Create seat tables for the given team ids, all empty.
    pub fn new(team_ids: impl IntoIterator<Item = TeamId>) -> Self {
        Self {
            seats: team_ids
                .into_iter()
                .map(|id| (id, TeamSeats::default()))
                .collect(),
        }
    }

    /// Seat a joining connection: first in becomes controller, everyone else
    /// is appended to the viewer queue in join order.
    pub fn join(&mut self, team_id: TeamId, connection: Uuid, identity: String) -> Role {
        let seats = self.seats.entry(team_id).or_default();
        let seat = Seat {
            connection,
            identity,
        };

        if seats.controller.is_none() {
            seats.controller = Some(seat);
            Role::Controller
        } else {
            seats.viewers.push_back(seat);
            Role::Viewer
        }
    }

    /// Release whatever seat `connection` holds on the team.
    ///
    /// A leaving controller promotes the front viewer when the queue is
    /// non-empty; otherwise the team is left controllerless until the next
    /// join. A leaving viewer is simply removed.
    pub fn leave(&mut self, team_id: TeamId, connection: Uuid) -> LeaveOutcome {
        let Some(seats) = self.seats.get_mut(&team_id) else {
            return LeaveOutcome::NotSeated;
        };

        if seats
            .controller
            .as_ref()
            .is_some_and(|seat| seat.connection == connection)
        {
            seats.controller = seats.viewers.pop_front();
            return LeaveOutcome::ControllerLeft {
                promoted: seats.controller.clone(),
            };
        }

        let before = seats.viewers.len();
        seats.viewers.retain(|seat| seat.connection != connection);
        if seats.viewers.len() < before {
            LeaveOutcome::ViewerLeft
        } else {
            LeaveOutcome::NotSeated
        }
    }

    /// Whether `connection` currently holds the controller seat of the team.
    pub fn is_controller(&self, team_id: TeamId, connection: Uuid) -> bool {
        self.seats
            .get(&team_id)
            .and_then(|seats| seats.controller.as_ref())
            .is_some_and(|seat| seat.connection == connection)
    }

    /// Identity of the team's controller, if one is seated.
    pub fn controller_identity(&self, team_id: TeamId) -> Option<&str> {
        self.seats
            .get(&team_id)?
            .controller
            .as_ref()
            .map(|seat| seat.identity.as_str())
    }

    /// Number of seated viewers for the team.
    pub fn viewer_count(&self, team_id: TeamId) -> usize {
        self.seats
            .get(&team_id)
            .map_or(0, |seats| seats.viewers.len())
    }

    /// Every connection associated with the team, controller first.
    pub fn connections(&self, team_id: TeamId) -> Vec<Uuid> {
        let Some(seats) = self.seats.get(&team_id) else {
            return Vec::new();
        };

        seats
            .controller
            .iter()
            .chain(seats.viewers.iter())
            .map(|seat| seat.connection)
            .collect()
    }

    /// Empty every seat, keeping the team table itself.
    pub fn clear(&mut self) {
        for seats in self.seats.values_mut() {
            seats.controller = None;
            seats.viewers.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn first_join_wins_controller_then_fifo_viewers() {
        let mut arbiter = RoleArbiter::new([1, 2]);
        let c = conn();
        let v1 = conn();
        let v2 = conn();

        assert_eq!(arbiter.join(1, c, "c@x".into()), Role::Controller);
        assert_eq!(arbiter.join(1, v1, "v1@x".into()), Role::Viewer);
        assert_eq!(arbiter.join(1, v2, "v2@x".into()), Role::Viewer);

        assert!(arbiter.is_controller(1, c));
        assert!(!arbiter.is_controller(1, v1));
        assert_eq!(arbiter.controller_identity(1), Some("c@x"));
        assert_eq!(arbiter.viewer_count(1), 2);
        assert_eq!(arbiter.connections(1), vec![c, v1, v2]);
    }

    #[test]
    fn controller_disconnect_promotes_front_viewer() {
        let mut arbiter = RoleArbiter::new([1]);
        let c = conn();
        let v1 = conn();
        let v2 = conn();
        arbiter.join(1, c, "c@x".into());
        arbiter.join(1, v1, "v1@x".into());
        arbiter.join(1, v2, "v2@x".into());

        let outcome = arbiter.leave(1, c);
        let LeaveOutcome::ControllerLeft {
            promoted: Some(seat),
        } = outcome
        else {
            panic!("expected promotion, got {outcome:?}");
        };

        assert_eq!(seat.connection, v1);
        assert_eq!(seat.identity, "v1@x");
        assert!(arbiter.is_controller(1, v1));
        assert_eq!(arbiter.controller_identity(1), Some("v1@x"));
        assert_eq!(arbiter.viewer_count(1), 1);
    }

    #[test]
    fn controller_disconnect_with_no_viewers_leaves_team_open() {
        let mut arbiter = RoleArbiter::new([1]);
        let c = conn();
        arbiter.join(1, c, "c@x".into());

        assert_eq!(
            arbiter.leave(1, c),
            LeaveOutcome::ControllerLeft { promoted: None }
        );
        assert_eq!(arbiter.controller_identity(1), None);

        // Next joiner takes the controller seat again.
        let next = conn();
        assert_eq!(arbiter.join(1, next, "next@x".into()), Role::Controller);
    }

    #[test]
    fn viewer_leave_removes_without_promotion() {
        let mut arbiter = RoleArbiter::new([1]);
        let c = conn();
        let v1 = conn();
        let v2 = conn();
        arbiter.join(1, c, "c@x".into());
        arbiter.join(1, v1, "v1@x".into());
        arbiter.join(1, v2, "v2@x".into());

        assert_eq!(arbiter.leave(1, v1), LeaveOutcome::ViewerLeft);
        assert!(arbiter.is_controller(1, c));
        assert_eq!(arbiter.viewer_count(1), 1);
        assert_eq!(arbiter.connections(1), vec![c, v2]);
    }

    #[test]
    fn unseated_connection_is_reported_as_such() {
        let mut arbiter = RoleArbiter::new([1]);
        assert_eq!(arbiter.leave(1, conn()), LeaveOutcome::NotSeated);
        assert_eq!(arbiter.leave(42, conn()), LeaveOutcome::NotSeated);
    }

    #[test]
    fn clear_empties_every_seat() {
        let mut arbiter = RoleArbiter::new([1, 2]);
        arbiter.join(1, conn(), "a@x".into());
        arbiter.join(1, conn(), "b@x".into());
        arbiter.join(2, conn(), "c@x".into());

        arbiter.clear();

        assert_eq!(arbiter.controller_identity(1), None);
        assert_eq!(arbiter.viewer_count(1), 0);
        assert_eq!(arbiter.controller_identity(2), None);
    }
}
