//! Projectile variants and the match/clear rule set
//!
//! All three ball kinds share one aim/travel/impact state machine; the only
//! varying behavior is which blocks a hit clears, so that rule is a single
//! pure function ([`resolve_impact`]) dispatched on the kind.

use std::collections::VecDeque;

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use super::block::{BlockColor, BlockGrid};
use crate::consts::*;
use crate::horizontal_distance;

/// Which clear rule a hit applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallKind {
    /// Clears the connected same-color component around the hit block
    Normal,
    /// Clears every block matching the hit block's color, tower-wide
    Multi,
    /// Clears every block NOT matching the hit block's color, tower-wide
    TwoTone,
}

impl BallKind {
    /// Roll the kind for a fresh spawn. Specials are rare.
    pub fn roll(rng: &mut Pcg32) -> Self {
        let r: f64 = rng.random();
        if r < MULTI_ODDS {
            BallKind::Multi
        } else if r < MULTI_ODDS + TWO_TONE_ODDS {
            BallKind::TwoTone
        } else {
            BallKind::Normal
        }
    }
}

/// Flight completion: the block that was aimed at and the hit point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub story: usize,
    pub slot: usize,
    pub point: Vec3,
}

/// Projectile lifecycle. `Move` is an explicit timed state advanced by the
/// per-frame dt; it completes exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BallState {
    /// Idle, following the camera, accepting aims
    Ready,
    /// In flight toward a target block; no game interaction until impact
    Move {
        elapsed: f32,
        duration: f32,
        from: Vec3,
        impact: Impact,
    },
    /// Consumed; pending respawn or round end
    Deleted,
}

/// The player's projectile
#[derive(Debug, Clone)]
pub struct Ball {
    pub kind: BallKind,
    /// Palette color for normal balls; specials are colorless
    pub color: Option<BlockColor>,
    pub state: BallState,
    /// Throws left this tower
    pub remaining: u32,
    pub pos: Vec3,
}

impl Ball {
    pub fn new(remaining: u32) -> Self {
        Self {
            kind: BallKind::Normal,
            color: None,
            state: BallState::Deleted,
            remaining,
            pos: Vec3::ZERO,
        }
    }

    /// Rearm at the camera anchor with a fresh kind and color
    pub fn setup(&mut self, anchor: Vec3, rng: &mut Pcg32) {
        self.kind = BallKind::roll(rng);
        self.color = match self.kind {
            BallKind::Normal => Some(BlockColor::select(rng)),
            _ => None,
        };
        self.pos = anchor;
        self.state = BallState::Ready;
    }

    /// Begin a throw toward an accepted target. Consumes one charge.
    pub fn throw(&mut self, impact: Impact, duration: f32) {
        assert!(
            matches!(self.state, BallState::Ready),
            "throw while not ready"
        );
        assert!(self.remaining > 0, "throw with empty pool");
        self.remaining -= 1;
        self.state = BallState::Move {
            elapsed: 0.0,
            duration,
            from: self.pos,
            impact,
        };
    }

    /// Advance the flight interpolation. Returns the impact exactly once,
    /// on the frame the flight completes; the ball is then deleted.
    pub fn advance(&mut self, dt: f32) -> Option<Impact> {
        let BallState::Move {
            mut elapsed,
            duration,
            from,
            impact,
        } = self.state
        else {
            return None;
        };

        elapsed += dt;
        if elapsed >= duration {
            self.pos = impact.point;
            self.state = BallState::Deleted;
            return Some(impact);
        }
        let t = elapsed / duration;
        self.pos = from.lerp(impact.point, t);
        self.state = BallState::Move {
            elapsed,
            duration,
            from,
            impact,
        };
        None
    }
}

/// Decide which blocks a hit clears. Pure: inspects the grid, mutates
/// nothing. Returns (story, slot) pairs; empty on a color miss or when the
/// target left the grid mid-flight.
pub fn resolve_impact(
    kind: BallKind,
    ball_color: Option<BlockColor>,
    target: (usize, usize),
    grid: &BlockGrid,
) -> Vec<(usize, usize)> {
    let Some(hit) = grid.get(target.0, target.1) else {
        // Target sank while the ball was in flight
        return Vec::new();
    };

    match kind {
        BallKind::Normal => {
            if ball_color == Some(hit.color) {
                flood_fill(target, hit.color, grid)
            } else {
                Vec::new()
            }
        }
        BallKind::Multi => grid
            .iter()
            .filter(|b| b.color == hit.color)
            .map(|b| (b.story, b.slot))
            .collect(),
        BallKind::TwoTone => grid
            .iter()
            .filter(|b| b.color != hit.color)
            .map(|b| (b.story, b.slot))
            .collect(),
    }
}

/// BFS over grid adjacency collecting the connected component of `color`
/// containing `start`. Neighbors are ring-adjacent slots of the same story
/// and geometrically overlapping slots of adjacent stories.
fn flood_fill(start: (usize, usize), color: BlockColor, grid: &BlockGrid) -> Vec<(usize, usize)> {
    let slots = grid.slots_per_story();
    let stories = grid.stories();
    let mut visited = vec![false; stories * slots];
    let mut out = Vec::new();
    let mut queue = VecDeque::new();

    visited[start.0 * slots + start.1] = true;
    queue.push_back(start);

    while let Some((story, slot)) = queue.pop_front() {
        let Some(block) = grid.get(story, slot) else {
            continue;
        };
        if block.color != color {
            continue;
        }
        out.push((story, slot));
        let origin = block.original_pos;

        // Ring neighbors in the same story
        for other in 0..slots {
            if other != slot && !visited[story * slots + other] {
                visited[story * slots + other] = true;
                queue.push_back((story, other));
            }
        }

        // Overlapping slots one story up and down
        for adj in [story.wrapping_sub(1), story + 1] {
            if adj >= stories {
                continue;
            }
            for other in 0..slots {
                if visited[adj * slots + other] {
                    continue;
                }
                let Some(candidate) = grid.get(adj, other) else {
                    continue;
                };
                if horizontal_distance(candidate.original_pos, origin) <= NEIGHBOR_RADIUS {
                    visited[adj * slots + other] = true;
                    queue.push_back((adj, other));
                }
            }
        }
    }

    out
}
