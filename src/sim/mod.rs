//! Deterministic game core
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (story-major grid, id-ordered physics)
//! - No rendering or platform dependencies; physics behind the
//!   [`crate::physics::PhysicsWorld`] trait, presentation behind the
//!   [`event::GameEvent`] queue

pub mod ball;
pub mod block;
pub mod camera;
pub mod event;
pub mod scene;
pub mod session;
pub mod tower;

pub use ball::{resolve_impact, Ball, BallKind, BallState, Impact};
pub use block::{Block, BlockColor, BlockFlags, BlockGrid};
pub use camera::CameraRig;
pub use event::GameEvent;
pub use scene::Scene;
pub use session::{FrameInput, GamePhase, GameSession, TOWER_ROSTER};
pub use tower::{Tower, TowerKind};
