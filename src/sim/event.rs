//! Events the session emits for presentation collaborators
//!
//! The core never calls into effects or UI directly: it pushes events onto
//! a queue the embedding drains once per frame. Effects are fire-and-forget;
//! nothing here is awaited.

use glam::Vec3;

use super::block::BlockColor;
use super::session::GamePhase;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// Play a bubble-dissolve effect at a world position
    Dissolve { color: BlockColor, pos: Vec3 },
    /// A block was cleared by a color match
    BlockCleared { color: BlockColor, pos: Vec3 },
    /// A fallen block sank out of play
    BlockSunk { pos: Vec3 },
    /// Dormant rings were promoted; the camera owes this much descent
    StoriesPromoted { count: u32 },
    /// The whole tower came down - play the foundation-clear effect
    FoundationCleared,
    PhaseChanged { phase: GamePhase },
    /// Progression moved to the next tower variant
    TowerAdvanced { index: usize },
}
