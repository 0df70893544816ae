//! Block model: colors, state flags, and the story-major grid
//!
//! A block's `flags` field is a bitset, not a single tag - a block resting
//! on the foundation is simultaneously `ON_STONE` and still a throw target.
//! The composite predicates (`ROTATABLE`, `TARGET`, `MOVABLE`) are bit
//! unions and membership is tested by intersection.

use std::ops::BitOr;

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::physics::BodyId;

/// Block state flag set (u8 bitset)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFlags(u8);

impl BlockFlags {
    /// Colored, dynamic, part of the standing structure
    pub const ACTIVE: Self = Self(1);
    /// Dormant gray band, kinematically fixed (mass 0)
    pub const INACTIVE: Self = Self(1 << 1);
    /// Touched the water surface, about to leave play
    pub const IN_WATER: Self = Self(1 << 2);
    /// Resting on the static foundation
    pub const ON_STONE: Self = Self(1 << 3);
    /// Displaced past the collapse threshold
    pub const DROPPING: Self = Self(1 << 4);
    /// Cleared or sunk; terminal
    pub const DELETED: Self = Self(1 << 5);

    /// Blocks that follow tower rotation
    pub const ROTATABLE: Self = Self(Self::ACTIVE.0 | Self::INACTIVE.0 | Self::ON_STONE.0);
    /// Blocks a throw may hit
    pub const TARGET: Self = Self(Self::ACTIVE.0 | Self::ON_STONE.0 | Self::DROPPING.0);
    /// Blocks no longer rigidly anchored (candidates for sinking)
    pub const MOVABLE: Self = Self(Self::ON_STONE.0 | Self::DROPPING.0);

    pub const fn empty() -> Self {
        Self(0)
    }

    /// True if every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for BlockFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Block colors. `Gray` marks the dormant band and never appears in the
/// match palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockColor {
    Red,
    Blue,
    Yellow,
    Green,
    Violet,
    Magenta,
    Gray,
}

impl BlockColor {
    /// Colors eligible for active blocks and normal balls
    pub const PALETTE: [BlockColor; 6] = [
        BlockColor::Red,
        BlockColor::Blue,
        BlockColor::Yellow,
        BlockColor::Green,
        BlockColor::Violet,
        BlockColor::Magenta,
    ];

    /// Pick a random palette color
    pub fn select(rng: &mut Pcg32) -> Self {
        Self::PALETTE[rng.random_range(0..Self::PALETTE.len())]
    }

    /// RGBA for presentation
    pub fn rgba(self) -> [f32; 4] {
        match self {
            BlockColor::Red => [1.0, 0.0, 0.0, 1.0],
            BlockColor::Blue => [0.0, 0.0, 1.0, 1.0],
            BlockColor::Yellow => [1.0, 1.0, 0.0, 1.0],
            BlockColor::Green => [0.0, 0.5, 0.0, 1.0],
            BlockColor::Violet => [0.54, 0.16, 0.88, 1.0],
            BlockColor::Magenta => [1.0, 0.0, 1.0, 1.0],
            BlockColor::Gray => [0.25, 0.25, 0.25, 1.0],
        }
    }
}

/// One collidable tower segment
#[derive(Debug, Clone)]
pub struct Block {
    /// Physics-body identity, also the grid lookup key
    pub body: BodyId,
    /// Story index, 0 = bottom
    pub story: usize,
    /// Slot index within the story's ring
    pub slot: usize,
    pub color: BlockColor,
    pub flags: BlockFlags,
    /// World position at build time; zero-displacement reference
    pub original_pos: Vec3,
}

impl Block {
    pub fn is_target(&self) -> bool {
        self.flags.intersects(BlockFlags::TARGET)
    }

    pub fn is_rotatable(&self) -> bool {
        self.flags.intersects(BlockFlags::ROTATABLE)
    }

    pub fn is_movable(&self) -> bool {
        self.flags.intersects(BlockFlags::MOVABLE)
    }

    /// Mark the block as dropping. Idempotent.
    pub fn set_dropping(&mut self) {
        assert!(
            !self.flags.contains(BlockFlags::DELETED),
            "mutating deleted block {:?}",
            self.body
        );
        self.flags.insert(BlockFlags::DROPPING);
    }
}

/// Story-major collection of blocks, indexed by (story, slot) and by
/// physics-body identity. Owned exclusively by one tower.
#[derive(Debug, Clone)]
pub struct BlockGrid {
    slots_per_story: usize,
    data: Vec<Vec<Option<Block>>>,
}

impl BlockGrid {
    pub fn new(stories: usize, slots_per_story: usize) -> Self {
        Self {
            slots_per_story,
            data: vec![vec![None; slots_per_story]; stories],
        }
    }

    pub fn stories(&self) -> usize {
        self.data.len()
    }

    pub fn slots_per_story(&self) -> usize {
        self.slots_per_story
    }

    /// Insert a freshly built block into its (story, slot) cell
    pub fn place(&mut self, block: Block) {
        let cell = &mut self.data[block.story][block.slot];
        assert!(
            cell.is_none(),
            "slot ({}, {}) already occupied",
            block.story,
            block.slot
        );
        *cell = Some(block);
    }

    pub fn get(&self, story: usize, slot: usize) -> Option<&Block> {
        self.data.get(story)?.get(slot)?.as_ref()
    }

    pub fn get_mut(&mut self, story: usize, slot: usize) -> Option<&mut Block> {
        self.data.get_mut(story)?.get_mut(slot)?.as_mut()
    }

    /// Remove a block from the live set
    pub fn take(&mut self, story: usize, slot: usize) -> Option<Block> {
        self.data.get_mut(story)?.get_mut(slot)?.take()
    }

    /// Live blocks in story-major order
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.data.iter().flatten().filter_map(|b| b.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.data.iter_mut().flatten().filter_map(|b| b.as_mut())
    }

    /// Live blocks of one story
    pub fn story(&self, i: usize) -> impl Iterator<Item = &Block> {
        self.data[i].iter().filter_map(|b| b.as_ref())
    }

    pub fn story_mut(&mut self, i: usize) -> impl Iterator<Item = &mut Block> {
        self.data[i].iter_mut().filter_map(|b| b.as_mut())
    }

    /// Resolve a ray/contact result back to a block
    pub fn find_body(&self, body: BodyId) -> Option<&Block> {
        self.iter().find(|b| b.body == body)
    }

    pub fn live_count(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn block(body: u32, story: usize, slot: usize) -> Block {
        Block {
            body: BodyId::from_raw(body),
            story,
            slot,
            color: BlockColor::Red,
            flags: BlockFlags::ACTIVE,
            original_pos: Vec3::ZERO,
        }
    }

    #[test]
    fn test_composite_flag_membership() {
        let mut flags = BlockFlags::ACTIVE;
        assert!(flags.intersects(BlockFlags::ROTATABLE));
        assert!(flags.intersects(BlockFlags::TARGET));
        assert!(!flags.intersects(BlockFlags::MOVABLE));

        flags.insert(BlockFlags::DROPPING);
        assert!(flags.intersects(BlockFlags::MOVABLE));
        assert!(flags.contains(BlockFlags::ACTIVE | BlockFlags::DROPPING));

        // Dormant blocks rotate with the tower but are never targets
        let inactive = BlockFlags::INACTIVE;
        assert!(inactive.intersects(BlockFlags::ROTATABLE));
        assert!(!inactive.intersects(BlockFlags::TARGET));
    }

    #[test]
    fn test_on_stone_remains_target() {
        let on_stone = BlockFlags::ON_STONE;
        assert!(on_stone.intersects(BlockFlags::TARGET));
        assert!(on_stone.intersects(BlockFlags::MOVABLE));
    }

    #[test]
    fn test_grid_story_major_iteration() {
        let mut grid = BlockGrid::new(2, 3);
        for story in 0..2 {
            for slot in 0..3 {
                grid.place(block((story * 3 + slot) as u32, story, slot));
            }
        }
        let ids: Vec<u32> = grid.iter().map(|b| b.body.raw()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_grid_find_body() {
        let mut grid = BlockGrid::new(3, 3);
        grid.place(block(7, 2, 1));
        let found = grid.find_body(BodyId::from_raw(7)).unwrap();
        assert_eq!((found.story, found.slot), (2, 1));
        assert!(grid.find_body(BodyId::from_raw(8)).is_none());
    }

    #[test]
    fn test_taken_block_absent_from_iteration() {
        let mut grid = BlockGrid::new(1, 3);
        for slot in 0..3 {
            grid.place(block(slot as u32, 0, slot));
        }
        let removed = grid.take(0, 1).unwrap();
        assert_eq!(removed.body.raw(), 1);
        assert!(grid.find_body(BodyId::from_raw(1)).is_none());
        assert_eq!(grid.live_count(), 2);
        // Second take of the same slot yields nothing
        assert!(grid.take(0, 1).is_none());
    }

    #[test]
    #[should_panic(expected = "already occupied")]
    fn test_double_place_panics() {
        let mut grid = BlockGrid::new(1, 3);
        grid.place(block(0, 0, 0));
        grid.place(block(1, 0, 0));
    }

    #[test]
    fn test_color_select_draws_from_palette() {
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..32 {
            let c = BlockColor::select(&mut rng);
            assert!(BlockColor::PALETTE.contains(&c));
            assert_ne!(c, BlockColor::Gray);
        }
    }
}
