//! Traffic state snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::Position;
use crate::velocity::Velocity;

/// Role of an aircraft within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AircraftRole {
    Ownship,
    Intruder,
}

/// State of one aircraft at a time of applicability.
///
/// Immutable once built: a new snapshot replaces the whole state, it is never
/// mutated in place. The engine extrapolates states submitted at a different
/// time than the current ownship time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficState {
    pub id: String,
    pub position: Position,
    pub velocity: Velocity,
    /// Time of applicability of position and velocity.
    pub time: DateTime<Utc>,
    pub role: AircraftRole,
    valid: bool,
}

impl TrafficState {
    pub fn new(
        id: impl Into<String>,
        position: Position,
        velocity: Velocity,
        time: DateTime<Utc>,
        role: AircraftRole,
    ) -> Self {
        let valid = position.is_finite() && velocity.is_finite();
        Self {
            id: id.into(),
            position,
            velocity,
            time,
            role,
            valid,
        }
    }

    /// The explicit "no aircraft" sentinel returned by queries that have
    /// nothing to report. Never alerts and never participates in geometry.
    pub fn invalid() -> Self {
        Self {
            id: "INVALID".to_string(),
            position: Position::euclidean(f64::NAN, f64::NAN, f64::NAN),
            velocity: Velocity::ZERO,
            time: DateTime::<Utc>::UNIX_EPOCH,
            role: AircraftRole::Intruder,
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// State extrapolated `dt` seconds along its current velocity.
    pub fn linear(&self, dt: f64) -> Self {
        Self {
            position: self.position.linear(&self.velocity.vect3(), dt),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_position_is_invalid() {
        let s = TrafficState::new(
            "AC1",
            Position::euclidean(f64::NAN, 0.0, 0.0),
            Velocity::ZERO,
            Utc::now(),
            AircraftRole::Intruder,
        );
        assert!(!s.is_valid());
        assert!(!TrafficState::invalid().is_valid());
    }

    #[test]
    fn linear_extrapolation_moves_position() {
        let s = TrafficState::new(
            "AC1",
            Position::euclidean(0.0, 0.0, 100.0),
            Velocity::from_trk_gs_vs(0.0, 10.0, 0.0),
            Utc::now(),
            AircraftRole::Intruder,
        );
        let t = s.linear(5.0);
        assert_eq!(t.position, Position::euclidean(0.0, 50.0, 100.0));
        assert_eq!(t.velocity, s.velocity);
    }
}
