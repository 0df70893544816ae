//! Tower layout and erosion algorithms
//!
//! A tower is a ring-stack of blocks: each story is a ring of slots on a
//! regular polygon, with the ring's orientation alternated every story so
//! consecutive rings interlock. The bottom two thirds start dormant (gray,
//! mass 0) and are promoted ring by ring as the standing structure above
//! them falls away.

use glam::{Vec2, Vec3};
use rand_pcg::Pcg32;

use super::block::{Block, BlockColor, BlockFlags, BlockGrid};
use crate::consts::*;
use crate::physics::{mask, BodyDesc, PhysicsWorld, Shape};
use crate::rotate_about;

/// Layout variant. Both share the same erosion/match core and differ only
/// in per-story slot count and ring geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TowerKind {
    /// Triangular ring, three slots per story
    Cylinder,
    /// Narrow two-slot ring
    Thin,
}

impl TowerKind {
    pub fn slots_per_story(self) -> usize {
        match self {
            TowerKind::Cylinder => 3,
            TowerKind::Thin => 2,
        }
    }

    /// Local ring offsets for story `i`. Odd stories are flipped so rings
    /// interlock instead of stacking directly.
    fn ring_points(self, i: usize) -> Vec<Vec2> {
        match self {
            TowerKind::Cylinder => {
                let edge = BLOCK_EDGE;
                // Apothem of an equilateral triangle with this edge
                let ok = edge / 2.0 / 3.0_f32.sqrt();
                if i % 2 == 0 {
                    vec![
                        Vec2::new(edge / 2.0, -ok),
                        Vec2::new(-edge / 2.0, -ok),
                        Vec2::new(0.0, ok * 2.0),
                    ]
                } else {
                    vec![
                        Vec2::new(-edge / 2.0, ok),
                        Vec2::new(edge / 2.0, ok),
                        Vec2::new(0.0, -ok * 2.0),
                    ]
                }
            }
            TowerKind::Thin => {
                let r = THIN_RING_RADIUS;
                if i % 2 == 0 {
                    vec![Vec2::new(r, 0.0), Vec2::new(-r, 0.0)]
                } else {
                    vec![Vec2::new(0.0, r), Vec2::new(0.0, -r)]
                }
            }
        }
    }
}

/// A multi-story ring-stack of blocks
#[derive(Debug)]
pub struct Tower {
    pub kind: TowerKind,
    /// Story count at build time (fixed)
    pub stories: usize,
    /// Highest story index still standing; monotonically non-increasing.
    /// Negative once the whole structure is gone.
    pub tower_top: isize,
    /// Highest story index still dormant; monotonically non-increasing
    pub inactive_top: isize,
    pub block_h: f32,
    /// World placement; rotation changes orientation only, never `center`
    pub center: Vec3,
    pub axis: Vec3,
    /// Accumulated rotation (radians)
    pub heading: f32,
    pub blocks: BlockGrid,
    built: bool,
}

impl Tower {
    pub fn new(kind: TowerKind, stories: usize, center: Vec3) -> Self {
        assert!(stories > 0, "tower needs at least one story");
        Self {
            kind,
            stories,
            tower_top: stories as isize - 1,
            inactive_top: (stories * 2 / 3) as isize - 1,
            block_h: BLOCK_H,
            center,
            axis: Vec3::Z,
            heading: 0.0,
            blocks: BlockGrid::new(stories, kind.slots_per_story()),
            built: false,
        }
    }

    /// Color and state for a freshly built story
    fn attrib(&self, story: usize, rng: &mut Pcg32) -> (BlockColor, BlockFlags) {
        if story as isize <= self.inactive_top {
            (BlockColor::Gray, BlockFlags::INACTIVE)
        } else {
            (BlockColor::select(rng), BlockFlags::ACTIVE)
        }
    }

    /// Populate the grid and register every block with the physics world.
    /// One-shot: building the same tower twice is a programming error.
    pub fn build(&mut self, physics: &mut impl PhysicsWorld, rng: &mut Pcg32) {
        assert!(!self.built, "tower already built");
        self.built = true;

        for i in 0..self.stories {
            let h = self.block_h * (i + 1) as f32;
            for (j, pt) in self.kind.ring_points(i).into_iter().enumerate() {
                let (color, flags) = self.attrib(i, rng);
                let pos = self.center + Vec3::new(pt.x, pt.y, h);
                let mass = if flags.contains(BlockFlags::INACTIVE) {
                    0.0
                } else {
                    1.0
                };
                let body = physics.attach(BodyDesc {
                    pos,
                    mass,
                    shape: Shape::Cylinder {
                        radius: BLOCK_BOUND_RADIUS,
                        half_height: self.block_h / 2.0,
                    },
                    layers: mask::AIM | mask::TERRAIN,
                });
                self.blocks.place(Block {
                    body,
                    story: i,
                    slot: j,
                    color,
                    flags,
                    original_pos: pos,
                });
            }
        }

        log::info!(
            "built {:?} tower: {} stories, dormant through story {}",
            self.kind,
            self.stories,
            self.inactive_top,
        );
    }

    /// Per-frame collapse detection: any active block displaced beyond
    /// `threshold` from its build position is marked dropping. Idempotent.
    pub fn detect_collapse(&mut self, physics: &impl PhysicsWorld, threshold: f32) {
        for block in self.blocks.iter_mut() {
            if !block.flags.contains(BlockFlags::ACTIVE) {
                continue;
            }
            let pos = physics
                .position(block.body)
                .unwrap_or_else(|| panic!("block {:?} missing from physics world", block.body));
            if (pos - block.original_pos).length() > threshold {
                block.set_dropping();
            }
        }
    }

    /// True if story `i` has live blocks and every one of them is dropping.
    /// A story emptied by color matches is cleared, not collapsed, and never
    /// consumes `tower_top`.
    fn story_collapsed(&self, i: usize) -> bool {
        let mut any = false;
        for block in self.blocks.story(i) {
            if !block.flags.contains(BlockFlags::DROPPING) {
                return false;
            }
            any = true;
        }
        any
    }

    /// Cascading activation: walk down from `tower_top`, consuming fully
    /// collapsed stories and promoting one dormant ring per consumed story
    /// while above the activation floor. Returns the number of promotions
    /// this frame; the caller descends the camera by that many story
    /// heights.
    pub fn set_active(
        &mut self,
        physics: &mut impl PhysicsWorld,
        rng: &mut Pcg32,
        activation_floor: usize,
    ) -> u32 {
        let mut promoted = 0;

        while self.tower_top >= 0 {
            if !self.story_collapsed(self.tower_top as usize) {
                break;
            }
            if self.tower_top as usize >= activation_floor && self.inactive_top >= 0 {
                self.promote_story(self.inactive_top as usize, physics, rng);
                self.inactive_top -= 1;
                promoted += 1;
            }
            self.tower_top -= 1;
        }

        if promoted > 0 {
            log::info!(
                "promoted {} stories, tower_top={} inactive_top={}",
                promoted,
                self.tower_top,
                self.inactive_top,
            );
        }
        promoted
    }

    /// Wake one dormant ring: fresh random color, dynamic mass
    fn promote_story(&mut self, story: usize, physics: &mut impl PhysicsWorld, rng: &mut Pcg32) {
        // Colors drawn first to avoid borrowing the grid across the rng call
        let fresh: Vec<BlockColor> = self
            .blocks
            .story(story)
            .map(|_| BlockColor::select(rng))
            .collect();

        for (block, color) in self.blocks.story_mut(story).zip(fresh) {
            block.flags.remove(BlockFlags::INACTIVE);
            block.flags.insert(BlockFlags::ACTIVE);
            block.color = color;
            physics.set_mass(block.body, 1.0);
        }
    }

    /// Rotate the standing structure about its axis. Only anchored
    /// (rotatable) blocks follow; dropped blocks are left to physics.
    pub fn rotate_around(&mut self, physics: &mut impl PhysicsWorld, angle: f32) {
        self.heading += angle;

        for block in self.blocks.iter_mut() {
            if !block.is_rotatable() {
                continue;
            }
            let pos = physics
                .position(block.body)
                .unwrap_or_else(|| panic!("block {:?} missing from physics world", block.body));
            physics.set_position(block.body, rotate_about(pos, self.center, self.axis, angle));
            // Keep the zero-displacement reference in the rotated frame so
            // turning the tower never reads as a collapse
            block.original_pos = rotate_about(block.original_pos, self.center, self.axis, angle);
        }
    }

    /// Terminal removal: detach from physics, mark deleted, drop from the
    /// live grid. Panics if the slot is already empty.
    pub fn remove_block(
        &mut self,
        story: usize,
        slot: usize,
        physics: &mut impl PhysicsWorld,
    ) -> Block {
        let mut block = self
            .blocks
            .take(story, slot)
            .unwrap_or_else(|| panic!("removing empty slot ({story}, {slot})"));
        physics.detach(block.body);
        block.flags.insert(BlockFlags::DELETED);
        block
    }

    /// True once the structure is gone: every standing story consumed, or
    /// every block matched or sunk out of the grid
    pub fn is_cleared(&self) -> bool {
        self.tower_top < 0 || self.blocks.live_count() == 0
    }

    /// World height of the current top story
    pub fn top_height(&self) -> f32 {
        self.center.z + self.block_h * (self.tower_top.max(0) + 1) as f32
    }

    /// World height of the dormant band's top, the camera's start height
    pub fn dormant_height(&self) -> f32 {
        self.center.z + self.block_h * (self.inactive_top.max(0) + 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BallisticWorld;
    use rand::SeedableRng;

    fn build_tower(kind: TowerKind, stories: usize) -> (Tower, BallisticWorld, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut world = BallisticWorld::new();
        let mut tower = Tower::new(kind, stories, Vec3::new(-2.0, 12.0, 1.0));
        tower.build(&mut world, &mut rng);
        (tower, world, rng)
    }

    fn collapse_story(tower: &mut Tower, story: usize) {
        for block in tower.blocks.story_mut(story) {
            block.set_dropping();
        }
    }

    #[test]
    fn test_build_band_invariant() {
        let (tower, world, _) = build_tower(TowerKind::Cylinder, 9);
        assert_eq!(tower.inactive_top, 5);
        assert_eq!(tower.tower_top, 8);
        assert_eq!(tower.blocks.live_count(), 27);

        for block in tower.blocks.iter() {
            if block.story as isize <= tower.inactive_top {
                assert!(block.flags.contains(BlockFlags::INACTIVE));
                assert_eq!(block.color, BlockColor::Gray);
                assert_eq!(world.mass(block.body), Some(0.0));
            } else {
                assert!(block.flags.contains(BlockFlags::ACTIVE));
                assert_ne!(block.color, BlockColor::Gray);
                assert_eq!(world.mass(block.body), Some(1.0));
            }
        }
    }

    #[test]
    fn test_rings_alternate_orientation() {
        let (tower, _, _) = build_tower(TowerKind::Cylinder, 4);
        let even = tower.blocks.get(0, 0).unwrap().original_pos;
        let odd = tower.blocks.get(1, 0).unwrap().original_pos;
        // Same slot on consecutive stories must not stack directly
        assert!((even.truncate() - odd.truncate()).length() > 0.1);
    }

    #[test]
    #[should_panic(expected = "already built")]
    fn test_double_build_panics() {
        let (mut tower, mut world, mut rng) = build_tower(TowerKind::Thin, 6);
        tower.build(&mut world, &mut rng);
    }

    #[test]
    fn test_detect_collapse_threshold() {
        let (mut tower, mut world, _) = build_tower(TowerKind::Cylinder, 9);
        let near = tower.blocks.get(8, 0).unwrap().body;
        let far = tower.blocks.get(8, 1).unwrap().body;
        let near_pos = tower.blocks.get(8, 0).unwrap().original_pos;
        let far_pos = tower.blocks.get(8, 1).unwrap().original_pos;

        world.set_position(near, near_pos + Vec3::new(1.0, 0.0, 0.0));
        world.set_position(far, far_pos + Vec3::new(0.0, 2.0, 0.0));
        tower.detect_collapse(&world, 1.5);

        assert!(!tower.blocks.get(8, 0).unwrap().flags.contains(BlockFlags::DROPPING));
        assert!(tower.blocks.get(8, 1).unwrap().flags.contains(BlockFlags::DROPPING));

        // Idempotent on a second pass
        tower.detect_collapse(&world, 1.5);
        assert!(tower.blocks.get(8, 1).unwrap().flags.contains(BlockFlags::DROPPING));
    }

    #[test]
    fn test_set_active_promotes_one_ring_per_story() {
        let (mut tower, mut world, mut rng) = build_tower(TowerKind::Cylinder, 24);
        assert_eq!(tower.inactive_top, 15);

        collapse_story(&mut tower, 23);
        let promoted = tower.set_active(&mut world, &mut rng, ACTIVATION_FLOOR);
        assert_eq!(promoted, 1);
        assert_eq!(tower.tower_top, 22);
        assert_eq!(tower.inactive_top, 14);

        // Promoted ring is now colored, dynamic, and active
        for block in tower.blocks.story(15) {
            assert!(block.flags.contains(BlockFlags::ACTIVE));
            assert!(!block.flags.contains(BlockFlags::INACTIVE));
            assert_ne!(block.color, BlockColor::Gray);
            assert_eq!(world.mass(block.body), Some(1.0));
        }
    }

    #[test]
    fn test_set_active_stops_at_standing_story() {
        let (mut tower, mut world, mut rng) = build_tower(TowerKind::Cylinder, 24);

        // Stories 23 and 21 collapsed, 22 standing: only 23 is consumed
        collapse_story(&mut tower, 23);
        collapse_story(&mut tower, 21);
        let promoted = tower.set_active(&mut world, &mut rng, ACTIVATION_FLOOR);
        assert_eq!(promoted, 1);
        assert_eq!(tower.tower_top, 22);
    }

    #[test]
    fn test_set_active_cascades_multiple_stories() {
        let (mut tower, mut world, mut rng) = build_tower(TowerKind::Cylinder, 24);

        for story in 21..24 {
            collapse_story(&mut tower, story);
        }
        let promoted = tower.set_active(&mut world, &mut rng, ACTIVATION_FLOOR);
        assert_eq!(promoted, 3);
        assert_eq!(tower.tower_top, 20);
        assert_eq!(tower.inactive_top, 12);
    }

    #[test]
    fn test_activation_floor_respected() {
        let (mut tower, mut world, mut rng) = build_tower(TowerKind::Cylinder, 9);

        // Both top stories collapse; only story 8 sits at the floor
        collapse_story(&mut tower, 8);
        collapse_story(&mut tower, 7);
        let promoted = tower.set_active(&mut world, &mut rng, ACTIVATION_FLOOR);
        assert_eq!(promoted, 1);
        assert_eq!(tower.tower_top, 6);
        assert_eq!(tower.inactive_top, 4);

        // Below the floor nothing ever promotes, but collapsed stories are
        // still consumed
        collapse_story(&mut tower, 6);
        let promoted = tower.set_active(&mut world, &mut rng, ACTIVATION_FLOOR);
        assert_eq!(promoted, 0);
        assert_eq!(tower.tower_top, 5);
        assert_eq!(tower.inactive_top, 4);
    }

    #[test]
    fn test_cleared_story_is_not_collapsed() {
        let (mut tower, mut world, mut rng) = build_tower(TowerKind::Cylinder, 9);

        // Match-clear the whole top story
        for slot in 0..3 {
            tower.remove_block(8, slot, &mut world);
        }
        let promoted = tower.set_active(&mut world, &mut rng, ACTIVATION_FLOOR);
        assert_eq!(promoted, 0);
        assert_eq!(tower.tower_top, 8);
        assert!(!tower.is_cleared());

        // A fully emptied grid still ends the tower
        let rest: Vec<(usize, usize)> =
            tower.blocks.iter().map(|b| (b.story, b.slot)).collect();
        for (story, slot) in rest {
            tower.remove_block(story, slot, &mut world);
        }
        assert!(tower.is_cleared());
    }

    #[test]
    fn test_set_active_monotonic() {
        let (mut tower, mut world, mut rng) = build_tower(TowerKind::Cylinder, 24);
        let mut last_top = tower.tower_top;
        let mut last_inactive = tower.inactive_top;

        for story in (8..24).rev() {
            collapse_story(&mut tower, story);
            tower.set_active(&mut world, &mut rng, ACTIVATION_FLOOR);
            assert!(tower.tower_top <= last_top);
            assert!(tower.inactive_top <= last_inactive);
            last_top = tower.tower_top;
            last_inactive = tower.inactive_top;
        }
    }

    #[test]
    fn test_rotation_moves_anchored_blocks_only() {
        let (mut tower, mut world, _) = build_tower(TowerKind::Cylinder, 9);

        let dropped = tower.blocks.get(8, 0).unwrap().body;
        tower.blocks.get_mut(8, 0).unwrap().flags = BlockFlags::DROPPING;
        let dropped_pos = world.position(dropped).unwrap();
        let anchored = tower.blocks.get(4, 0).unwrap().body;
        let anchored_pos = world.position(anchored).unwrap();

        tower.rotate_around(&mut world, std::f32::consts::FRAC_PI_2);

        assert_eq!(world.position(dropped).unwrap(), dropped_pos);
        let moved = world.position(anchored).unwrap();
        assert!((moved - anchored_pos).length() > 0.1);
        assert!((moved.z - anchored_pos.z).abs() < 1e-5);

        // Rotation is not a collapse signal
        tower.detect_collapse(&world, COLLAPSE_THRESHOLD);
        for block in tower.blocks.iter() {
            if block.body != dropped {
                assert!(!block.flags.contains(BlockFlags::DROPPING));
            }
        }
    }

    #[test]
    fn test_remove_block_is_terminal() {
        let (mut tower, mut world, _) = build_tower(TowerKind::Cylinder, 9);
        let count = world.body_count();

        let removed = tower.remove_block(8, 1, &mut world);
        assert!(removed.flags.contains(BlockFlags::DELETED));
        assert_eq!(world.body_count(), count - 1);
        assert!(tower.blocks.find_body(removed.body).is_none());
    }

    #[test]
    #[should_panic(expected = "removing empty slot")]
    fn test_remove_block_twice_panics() {
        let (mut tower, mut world, _) = build_tower(TowerKind::Cylinder, 9);
        tower.remove_block(8, 1, &mut world);
        tower.remove_block(8, 1, &mut world);
    }

    #[test]
    fn test_thin_tower_shares_core() {
        let (mut tower, mut world, mut rng) = build_tower(TowerKind::Thin, 16);
        assert_eq!(tower.blocks.slots_per_story(), 2);
        assert_eq!(tower.inactive_top, 9);

        collapse_story(&mut tower, 15);
        let promoted = tower.set_active(&mut world, &mut rng, ACTIVATION_FLOOR);
        assert_eq!(promoted, 1);
        assert_eq!(tower.tower_top, 14);
    }
}
