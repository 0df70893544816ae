//! Tower Crash - a physics-driven tower-clearing puzzle core
//!
//! Core modules:
//! - `sim`: Deterministic game core (tower model, match/clear engine, session state machine)
//! - `physics`: Collaborator interface to a rigid-body engine, plus a minimal
//!   ballistic stand-in for tests and the headless demo
//! - `tuning`: Data-driven game balance

pub mod physics;
pub mod sim;
pub mod tuning;

pub use tuning::Tuning;

use glam::{Quat, Vec3};

/// Game configuration constants
pub mod consts {
    /// Vertical spacing between tower stories
    pub const BLOCK_H: f32 = 2.5;
    /// Edge length of the triangular ring (thick tower)
    pub const BLOCK_EDGE: f32 = 1.5;
    /// Ring radius of the thin tower variant
    pub const THIN_RING_RADIUS: f32 = 0.8;
    /// Bounding radius of one block's collision shape
    pub const BLOCK_BOUND_RADIUS: f32 = 0.7;

    /// Displacement beyond which an active block counts as dropping
    pub const COLLAPSE_THRESHOLD: f32 = 1.5;
    /// Stories below this index never trigger a promotion when they collapse
    pub const ACTIVATION_FLOOR: usize = 8;
    /// Centers of adjacent-story blocks closer than this (in the horizontal
    /// plane) are flood-fill neighbors
    pub const NEIGHBOR_RADIUS: f32 = 1.5;

    /// Projectile defaults
    pub const BALL_FLIGHT_SECS: f32 = 0.5;
    pub const THROWS_PER_TOWER: u32 = 15;
    /// Odds per spawn of a multi-color / two-tone special ball
    pub const MULTI_ODDS: f64 = 0.1;
    pub const TWO_TONE_ODDS: f64 = 0.1;

    /// Camera rig
    pub const ORBIT_RADIUS: f32 = 40.0;
    pub const CAMERA_LOWEST_Z: f32 = 2.5;
    pub const CAMERA_DESCENT_SPEED: f32 = 10.0;
    pub const START_ORBIT_SPEED_DEG: f32 = 120.0;
    pub const START_LIFT_SPEED: f32 = 5.0;
    pub const CAMERA_FOV_DEG: f32 = 60.0;

    /// Rotation drag
    pub const DRAG_HOLD_FRAMES: u32 = 5;
    pub const DRAG_ROTATE_SPEED_DEG: f32 = 90.0;

    /// Round choreography
    pub const CLEAR_WAIT_SECS: f32 = 3.0;

    /// World placement
    pub const WATER_LEVEL: f32 = 0.0;
    pub const FOUNDATION_TOP: f32 = 1.0;
}

/// Rotate `point` about the axis through `center` by `angle` radians
#[inline]
pub fn rotate_about(point: Vec3, center: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    let q = Quat::from_axis_angle(axis.normalize(), angle);
    center + q * (point - center)
}

/// Horizontal (XY-plane) distance between two world positions
#[inline]
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    (a.truncate() - b.truncate()).length()
}
