//! Orbit camera rig choreography
//!
//! The rig orbits the tower at a fixed radius. Its motion is rate-limited:
//! the start-of-round ramps and the collapse-driven descent are consumed
//! gradually, never as instantaneous jumps, and descent is floored so the
//! camera can never sink below the waterline view.

use glam::{Vec2, Vec3};

use crate::consts::*;

#[derive(Debug, Clone)]
pub struct CameraRig {
    /// Point the rig orbits (tower center line)
    pub focus: Vec3,
    /// Orbit progress of the start choreography, degrees toward 360
    pub orbit_deg: f32,
    /// Current camera height
    pub height: f32,
    /// Descent distance owed by promoted stories, consumed over frames
    pub pending_descent: f32,
    /// Height floor
    pub lowest: f32,
}

impl CameraRig {
    pub fn new(focus: Vec3, start_height: f32) -> Self {
        Self {
            focus,
            orbit_deg: 0.0,
            height: start_height,
            pending_descent: 0.0,
            lowest: CAMERA_LOWEST_Z,
        }
    }

    /// Advance the two independent start-of-round ramps (orbit to 360°,
    /// height to the tower's top). Returns true once both complete.
    pub fn run_start_ramps(&mut self, top_height: f32, orbit_speed: f32, lift_speed: f32, dt: f32) -> bool {
        let mut done = true;
        if self.orbit_deg < 360.0 {
            self.orbit_deg = (self.orbit_deg + orbit_speed * dt).min(360.0);
            done = false;
        }
        if self.height < top_height {
            self.height = (self.height + lift_speed * dt).min(top_height);
            done = false;
        }
        done
    }

    /// Owe the camera more descent (promoted stories x story height)
    pub fn queue_descent(&mut self, distance: f32) {
        self.pending_descent += distance;
    }

    /// Consume pending descent at a fixed rate, bounded by the floor.
    /// Returns the height actually descended this frame so followers (the
    /// ready ball) can move by the same amount.
    pub fn apply_descent(&mut self, speed: f32, dt: f32) -> f32 {
        if self.pending_descent <= 0.0 || self.height <= self.lowest {
            return 0.0;
        }
        let step = (speed * dt)
            .min(self.pending_descent)
            .min(self.height - self.lowest);
        self.pending_descent -= step;
        self.height -= step;
        step
    }

    /// World position of the camera on its orbit
    pub fn position(&self) -> Vec3 {
        let theta = self.orbit_deg.to_radians();
        self.focus + Vec3::new(ORBIT_RADIUS * theta.cos(), ORBIT_RADIUS * theta.sin(), 0.0)
            + Vec3::new(0.0, 0.0, self.height - self.focus.z)
    }

    /// Where a ready ball hovers, just under the camera toward the tower
    pub fn ball_anchor(&self) -> Vec3 {
        let pos = self.position();
        let toward = (self.focus.truncate() - pos.truncate()).normalize_or_zero() * 4.0;
        Vec3::new(pos.x + toward.x, pos.y + toward.y, pos.z - 1.5)
    }

    /// Aim ray through a pointer position (NDC, x right, y up). Returns
    /// (from, to) spanning the whole playfield.
    pub fn ray_through(&self, pointer: Vec2) -> (Vec3, Vec3) {
        let from = self.position();
        let look_at = Vec3::new(self.focus.x, self.focus.y, self.height);
        let forward = (look_at - from).normalize();
        let right = forward.cross(Vec3::Z).normalize();
        let up = right.cross(forward);

        let half_fov = (CAMERA_FOV_DEG / 2.0).to_radians().tan();
        let dir = (forward + right * pointer.x * half_fov + up * pointer.y * half_fov).normalize();
        (from, from + dir * ORBIT_RADIUS * 4.0)
    }
}
