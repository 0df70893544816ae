//! Top-level game session state machine
//!
//! Drives one round at a time: Start (camera choreography), Play (throws,
//! erosion, rotation), Clear (round-end hold), GameOver (progression and
//! rebuild). The session owns the tower, the projectile, the camera rig and
//! the seeded RNG; everything mutates from the single per-frame `update`.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::ball::{resolve_impact, Ball, BallState, Impact};
use super::block::{BlockColor, BlockFlags};
use super::camera::CameraRig;
use super::event::GameEvent;
use super::scene::Scene;
use super::tower::{Tower, TowerKind};
use crate::physics::{mask, PhysicsWorld, RayHit};
use crate::tuning::Tuning;

/// Round phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Camera orbits and climbs to the tower top
    Start,
    /// Active gameplay
    Play,
    /// Round over, holding before progression
    Clear,
    /// Teardown and rebuild
    GameOver,
}

/// Input snapshot for a single frame (deterministic)
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// Pointer went down this frame
    pub pointer_pressed: bool,
    /// Pointer went up this frame
    pub pointer_released: bool,
    /// Pointer position in NDC (x right, y up, [-1, 1])
    pub pointer: Vec2,
}

/// Tower variants played in order, wrapping after the last
pub const TOWER_ROSTER: [(TowerKind, usize); 2] =
    [(TowerKind::Cylinder, 24), (TowerKind::Thin, 16)];

/// World placement of every tower
const TOWER_CENTER: Vec3 = Vec3::new(-2.0, 12.0, 1.0);

/// One game session: the active tower, projectile, camera and progression
#[derive(Debug)]
pub struct GameSession {
    pub phase: GamePhase,
    /// Index into the tower roster
    pub tower_index: usize,
    pub tower: Tower,
    pub ball: Ball,
    pub camera: CameraRig,
    roster: Vec<(TowerKind, usize)>,
    tuning: Tuning,
    rng: Pcg32,
    scene: Scene,
    events: Vec<GameEvent>,
    /// Frames the current pointer drag has persisted (0 = no drag)
    drag_frames: u32,
    last_pointer_x: f32,
    clear_timer: f32,
    /// Whether the ending round fully emptied its tower
    round_cleared: bool,
}

impl GameSession {
    pub fn new(seed: u64, tuning: Tuning, physics: &mut impl PhysicsWorld) -> Self {
        Self::with_roster(seed, tuning, physics, TOWER_ROSTER.to_vec())
    }

    pub fn with_roster(
        seed: u64,
        tuning: Tuning,
        physics: &mut impl PhysicsWorld,
        roster: Vec<(TowerKind, usize)>,
    ) -> Self {
        assert!(!roster.is_empty(), "empty tower roster");
        let mut rng = Pcg32::seed_from_u64(seed);
        let scene = Scene::setup(TOWER_CENTER, physics);

        let (kind, stories) = roster[0];
        let mut tower = Tower::new(kind, stories, TOWER_CENTER);
        tower.build(physics, &mut rng);
        let camera = CameraRig::new(TOWER_CENTER, tower.dormant_height());
        let ball = Ball::new(tuning.throws_per_tower);

        log::info!("session start, seed {seed}");
        Self {
            phase: GamePhase::Start,
            tower_index: 0,
            tower,
            ball,
            camera,
            roster,
            tuning,
            rng,
            scene,
            events: vec![GameEvent::PhaseChanged {
                phase: GamePhase::Start,
            }],
            drag_frames: 0,
            last_pointer_x: 0.0,
            clear_timer: 0.0,
            round_cleared: false,
        }
    }

    /// Events accumulated since the last drain, for presentation
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance the session by one frame
    pub fn update(&mut self, physics: &mut impl PhysicsWorld, input: &FrameInput, dt: f32) {
        match self.phase {
            GamePhase::Start => {
                let top = self.tower.top_height();
                if self.camera.run_start_ramps(
                    top,
                    self.tuning.orbit_speed_deg,
                    self.tuning.lift_speed,
                    dt,
                ) {
                    self.ball.setup(self.camera.ball_anchor(), &mut self.rng);
                    self.set_phase(GamePhase::Play);
                }
            }
            GamePhase::Play => self.update_play(physics, input, dt),
            GamePhase::Clear => {
                self.clear_timer -= dt;
                if self.clear_timer <= 0.0 {
                    self.set_phase(GamePhase::GameOver);
                }
            }
            GamePhase::GameOver => self.next_round(physics),
        }

        physics.step(dt);
    }

    fn update_play(&mut self, physics: &mut impl PhysicsWorld, input: &FrameInput, dt: f32) {
        // A press is either an accepted throw (at most one per frame) or
        // the start of a rotation drag
        if input.pointer_pressed {
            if !self.try_throw(physics, input.pointer) {
                self.drag_frames = 1;
                self.last_pointer_x = input.pointer.x;
            }
        } else if input.pointer_released {
            self.drag_frames = 0;
        } else if self.drag_frames > 0 {
            let delta = input.pointer.x - self.last_pointer_x;
            self.last_pointer_x = input.pointer.x;
            self.drag_frames += 1;

            // Drags shorter than the hold count apply nothing
            if self.drag_frames >= self.tuning.drag_hold_frames && delta != 0.0 {
                let velocity = self.tuning.drag_rotate_speed_deg * delta.signum();
                self.tower
                    .rotate_around(physics, (velocity * dt).to_radians());
            }
        }

        // In-flight ball; impact resolves synchronously on completion
        if let Some(impact) = self.ball.advance(dt) {
            self.apply_impact(physics, impact);
        }

        // Erosion: collapse, sink, cascade
        self.tower
            .detect_collapse(physics, self.tuning.collapse_threshold);
        self.detect_sunk(physics);
        let promoted = self
            .tower
            .set_active(physics, &mut self.rng, self.tuning.activation_floor);
        if promoted > 0 {
            self.camera
                .queue_descent(promoted as f32 * self.tower.block_h);
            self.events
                .push(GameEvent::StoriesPromoted { count: promoted });
        }

        // Bounded camera descent; a ready ball follows the camera down
        let dz = self.camera.apply_descent(self.tuning.descent_speed, dt);
        if dz > 0.0 && matches!(self.ball.state, BallState::Ready) {
            self.ball.pos.z -= dz;
        }

        // Rearm from the pool
        if matches!(self.ball.state, BallState::Deleted) && self.ball.remaining > 0 {
            self.ball.setup(self.camera.ball_anchor(), &mut self.rng);
        }

        // Round end: structure gone, or pool exhausted
        let exhausted =
            self.ball.remaining == 0 && matches!(self.ball.state, BallState::Deleted);
        if self.tower.is_cleared() || exhausted {
            self.round_cleared = self.tower.is_cleared();
            if self.round_cleared {
                self.events.push(GameEvent::FoundationCleared);
            }
            self.clear_timer = self.tuning.clear_wait_secs;
            self.set_phase(GamePhase::Clear);
        }
    }

    /// Cast the aim ray and begin a throw if it lands on a target block.
    /// Rejected aims (no hit, non-target block) are silent no-ops.
    fn try_throw(&mut self, physics: &mut impl PhysicsWorld, pointer: Vec2) -> bool {
        if !matches!(self.ball.state, BallState::Ready) {
            return false;
        }
        let (from, to) = self.camera.ray_through(pointer);
        let Some(hit) = physics.ray_test_closest(from, to, mask::AIM) else {
            return false;
        };
        let Some(impact) = self.resolve_aim(hit) else {
            return false;
        };
        self.ball.throw(impact, self.tuning.flight_secs);
        true
    }

    /// Accept an aim only if the hit body resolves to a live target block
    fn resolve_aim(&self, hit: RayHit) -> Option<Impact> {
        let block = self.tower.blocks.find_body(hit.body)?;
        block.is_target().then_some(Impact {
            story: block.story,
            slot: block.slot,
            point: hit.point,
        })
    }

    /// Impact resolution: dissolve effect, then either a clear or a rattle
    fn apply_impact(&mut self, physics: &mut impl PhysicsWorld, impact: Impact) {
        let target = (impact.story, impact.slot);
        let effect_color = self
            .ball
            .color
            .or_else(|| self.tower.blocks.get(target.0, target.1).map(|b| b.color))
            .unwrap_or(BlockColor::Gray);
        // The dissolve plays at the hit point whether or not anything clears
        self.events.push(GameEvent::Dissolve {
            color: effect_color,
            pos: impact.point,
        });

        let cleared = resolve_impact(self.ball.kind, self.ball.color, target, &self.tower.blocks);
        if cleared.is_empty() {
            // A color miss still rattles the structure
            if let Some(block) = self.tower.blocks.get(target.0, target.1) {
                let Some(block_pos) = physics.position(block.body) else {
                    return;
                };
                let dir = (impact.point - self.camera.position()).normalize_or_zero();
                let magnitude = self.rng.random_range(1..=5) as f32;
                physics.apply_impulse(block.body, dir * magnitude, impact.point - block_pos);
            }
            return;
        }

        for (story, slot) in cleared {
            let pos = self
                .tower
                .blocks
                .get(story, slot)
                .and_then(|b| physics.position(b.body));
            let block = self.tower.remove_block(story, slot, physics);
            self.events.push(GameEvent::BlockCleared {
                color: block.color,
                pos: pos.unwrap_or(block.original_pos),
            });
        }
    }

    /// Contact-test unanchored blocks against the terrain statics: landing
    /// on the foundation marks `ON_STONE`, touching the water removes the
    /// block from play.
    fn detect_sunk(&mut self, physics: &mut impl PhysicsWorld) {
        let mut sunk = Vec::new();
        for block in self.tower.blocks.iter_mut() {
            if !block.is_movable() {
                continue;
            }
            for contact in physics.contact_test(block.body) {
                if contact.other == self.scene.surface {
                    block.flags.insert(BlockFlags::IN_WATER);
                } else if contact.other == self.scene.foundation {
                    block.flags.insert(BlockFlags::ON_STONE);
                }
            }
            if block.flags.contains(BlockFlags::IN_WATER) {
                sunk.push((block.story, block.slot));
            }
        }

        for (story, slot) in sunk {
            let pos = self
                .tower
                .blocks
                .get(story, slot)
                .and_then(|b| physics.position(b.body));
            let block = self.tower.remove_block(story, slot, physics);
            self.events.push(GameEvent::BlockSunk {
                pos: pos.unwrap_or(block.original_pos),
            });
        }
    }

    /// Progression: advance the roster only if the tower was emptied, then
    /// tear down and rebuild for the next round
    fn next_round(&mut self, physics: &mut impl PhysicsWorld) {
        let leftovers: Vec<(usize, usize)> = self
            .tower
            .blocks
            .iter()
            .map(|b| (b.story, b.slot))
            .collect();
        for (story, slot) in leftovers {
            self.tower.remove_block(story, slot, physics);
        }

        if self.round_cleared {
            self.tower_index = (self.tower_index + 1) % self.roster.len();
            self.events.push(GameEvent::TowerAdvanced {
                index: self.tower_index,
            });
        }

        let (kind, stories) = self.roster[self.tower_index];
        log::info!(
            "next round: tower {} ({:?}, {} stories)",
            self.tower_index,
            kind,
            stories
        );
        self.tower = Tower::new(kind, stories, TOWER_CENTER);
        self.tower.build(physics, &mut self.rng);
        self.ball = Ball::new(self.tuning.throws_per_tower);
        self.camera = CameraRig::new(TOWER_CENTER, self.tower.dormant_height());
        self.round_cleared = false;
        self.drag_frames = 0;
        self.set_phase(GamePhase::Start);
    }

    fn set_phase(&mut self, phase: GamePhase) {
        log::debug!("phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.events.push(GameEvent::PhaseChanged { phase });
    }
}
