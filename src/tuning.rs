//! Data-driven game balance
//!
//! Every threshold the algorithms depend on is a tunable loaded from a JSON
//! file, with compiled-in defaults as fallback. The activation floor and the
//! collapse threshold in particular are played-in values, not derived ones,
//! so they live here rather than hard-wired in the algorithms.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Tunable game-balance parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Displacement beyond which an active block counts as dropping
    pub collapse_threshold: f32,
    /// Collapsed stories below this index never trigger a promotion
    pub activation_floor: usize,
    /// Throws granted per tower
    pub throws_per_tower: u32,
    /// Projectile travel time, aim to impact
    pub flight_secs: f32,
    /// Camera descent rate while consuming promoted-story distance
    pub descent_speed: f32,
    /// Start choreography: orbit ramp (deg/s) and height ramp (units/s)
    pub orbit_speed_deg: f32,
    pub lift_speed: f32,
    /// Hold between tower clear and the next round
    pub clear_wait_secs: f32,
    /// Frames a drag must persist before rotation applies
    pub drag_hold_frames: u32,
    /// Tower rotation speed under drag, deg/s
    pub drag_rotate_speed_deg: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            collapse_threshold: COLLAPSE_THRESHOLD,
            activation_floor: ACTIVATION_FLOOR,
            throws_per_tower: THROWS_PER_TOWER,
            flight_secs: BALL_FLIGHT_SECS,
            descent_speed: CAMERA_DESCENT_SPEED,
            orbit_speed_deg: START_ORBIT_SPEED_DEG,
            lift_speed: START_LIFT_SPEED,
            clear_wait_secs: CLEAR_WAIT_SECS,
            drag_hold_frames: DRAG_HOLD_FRAMES,
            drag_rotate_speed_deg: DRAG_ROTATE_SPEED_DEG,
        }
    }
}

impl Tuning {
    /// Load tuning from a JSON file, falling back to defaults on any
    /// failure (missing file, malformed JSON)
    pub fn load_or_default(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(tuning) => {
                    log::info!("loaded tuning from {path}");
                    tuning
                }
                Err(e) => {
                    log::warn!("malformed tuning file {path}: {e}; using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no tuning file at {path}; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_consts() {
        let t = Tuning::default();
        assert_eq!(t.activation_floor, ACTIVATION_FLOOR);
        assert_eq!(t.collapse_threshold, COLLAPSE_THRESHOLD);
        assert_eq!(t.throws_per_tower, THROWS_PER_TOWER);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let t: Tuning = serde_json::from_str(r#"{ "throws_per_tower": 3 }"#).unwrap();
        assert_eq!(t.throws_per_tower, 3);
        assert_eq!(t.activation_floor, ACTIVATION_FLOOR);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let t = Tuning::load_or_default("/nonexistent/tuning.json");
        assert_eq!(t.throws_per_tower, THROWS_PER_TOWER);
    }
}
