//! Detect-and-avoid core for uncrewed aircraft.
//!
//! Given an ownship and intruder snapshot, this crate decides whether a loss
//! of separation exists now or within a bounded lookahead, classifies the
//! severity into discrete alert levels, and computes per maneuver dimension
//! (track, ground speed, vertical speed, altitude) the ranges of values the
//! ownship must avoid, plus recovery ranges once already in conflict.

pub mod alert;
pub mod bands;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod geodesy;
pub mod interval;
pub mod params;
pub mod position;
pub mod traffic;
pub mod units;
pub mod vect;
pub mod velocity;

pub use alert::{AlertLevel, AlertThresholds};
pub use bands::{Band, BandsDim, BandsRegion, LocalIntruder, LocalScene};
pub use detect::{ConflictData, CylinderDetector, Detector, WellClearDetector};
pub use engine::DaaEngine;
pub use interval::{Interval, IntervalSet};
pub use params::{ParamError, Parameters};
pub use position::Position;
pub use traffic::{AircraftRole, TrafficState};
pub use vect::{Vect2, Vect3};
pub use velocity::Velocity;
