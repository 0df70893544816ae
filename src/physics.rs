//! Physics collaborator interface
//!
//! The game core treats rigid-body simulation as a black box: bodies are
//! attached and detached, masses set, impulses applied, and the world is
//! queried with synchronous ray casts and contact tests. Bodies are referred
//! to by opaque [`BodyId`] keys so the grid never holds engine internals.
//!
//! [`BallisticWorld`] is a minimal deterministic implementation (gravity on
//! disturbed dynamic bodies, bounding-sphere ray casts, plane contacts)
//! used by the test suite and the headless demo. It is a stand-in, not a
//! dynamics engine.

use std::collections::BTreeMap;

use glam::Vec3;

/// Opaque physics-body key, also used as block identity for grid lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u32);

impl BodyId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Collision layer bits
pub mod mask {
    /// Bodies hittable by aim ray casts (tower blocks)
    pub const AIM: u32 = 1 << 1;
    /// Static terrain bodies (water surface, foundation)
    pub const TERRAIN: u32 = 1 << 2;
}

/// Collision shape for a body. Bounding volumes only - visual assets and
/// their extents live outside the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    Cylinder { radius: f32, half_height: f32 },
    /// Infinite horizontal plane at the body's z position
    Plane,
}

impl Shape {
    /// Conservative bounding-sphere radius
    pub fn bound_radius(&self) -> f32 {
        match *self {
            Shape::Sphere { radius } => radius,
            Shape::Cylinder {
                radius,
                half_height,
            } => radius.max(half_height),
            Shape::Plane => 0.0,
        }
    }
}

/// Everything needed to register a rigid body
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub pos: Vec3,
    /// 0 = static / kinematically fixed
    pub mass: f32,
    pub shape: Shape,
    /// Collision layers this body belongs to (`mask` bits)
    pub layers: u32,
}

/// A single contact reported by [`PhysicsWorld::contact_test`]
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub other: BodyId,
}

/// Result of a closest-hit ray cast
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub body: BodyId,
    pub point: Vec3,
}

/// The narrow interface the game core needs from a rigid-body engine.
///
/// Lifecycle contract: a body is detached at most once and never queried
/// after. Implementations may treat violations as fatal.
pub trait PhysicsWorld {
    fn attach(&mut self, desc: BodyDesc) -> BodyId;
    fn detach(&mut self, body: BodyId);
    fn set_mass(&mut self, body: BodyId, mass: f32);
    /// Kinematic reposition (tower rotation moves anchored blocks directly)
    fn set_position(&mut self, body: BodyId, pos: Vec3);
    fn position(&self, body: BodyId) -> Option<Vec3>;
    fn apply_impulse(&mut self, body: BodyId, impulse: Vec3, rel_point: Vec3);
    /// First body hit between `from` and `to` whose layers intersect `mask`
    fn ray_test_closest(&self, from: Vec3, to: Vec3, mask: u32) -> Option<RayHit>;
    /// All bodies currently in contact with `body`
    fn contact_test(&self, body: BodyId) -> Vec<Contact>;
    fn step(&mut self, dt: f32);
}

const GRAVITY: f32 = -9.81;

#[derive(Debug, Clone)]
struct BodyState {
    pos: Vec3,
    vel: Vec3,
    mass: f32,
    shape: Shape,
    layers: u32,
}

/// Minimal deterministic physics stand-in.
///
/// There is no stacking solver: a dynamic body rests in place until
/// something disturbs it (an impulse, or [`BallisticWorld::set_velocity`]),
/// then falls ballistically. Static bodies never move. Iteration order is
/// stable (BTreeMap keyed by id) so runs with the same inputs produce the
/// same results.
#[derive(Debug, Default)]
pub struct BallisticWorld {
    bodies: BTreeMap<BodyId, BodyState>,
    next_id: u32,
}

impl BallisticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body(&self, id: BodyId) -> &BodyState {
        self.bodies
            .get(&id)
            .unwrap_or_else(|| panic!("stale body handle {:?}", id))
    }

    fn body_mut(&mut self, id: BodyId) -> &mut BodyState {
        self.bodies
            .get_mut(&id)
            .unwrap_or_else(|| panic!("stale body handle {:?}", id))
    }

    /// Directly set a body's velocity (test hook for displacing blocks)
    pub fn set_velocity(&mut self, id: BodyId, vel: Vec3) {
        self.body_mut(id).vel = vel;
    }

    pub fn mass(&self, id: BodyId) -> Option<f32> {
        self.bodies.get(&id).map(|b| b.mass)
    }
}

impl PhysicsWorld for BallisticWorld {
    fn attach(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.bodies.insert(
            id,
            BodyState {
                pos: desc.pos,
                vel: Vec3::ZERO,
                mass: desc.mass,
                shape: desc.shape,
                layers: desc.layers,
            },
        );
        id
    }

    fn detach(&mut self, body: BodyId) {
        let removed = self.bodies.remove(&body);
        assert!(removed.is_some(), "detach of unknown body {:?}", body);
    }

    fn set_mass(&mut self, body: BodyId, mass: f32) {
        self.body_mut(body).mass = mass;
    }

    fn set_position(&mut self, body: BodyId, pos: Vec3) {
        self.body_mut(body).pos = pos;
    }

    fn position(&self, body: BodyId) -> Option<Vec3> {
        self.bodies.get(&body).map(|b| b.pos)
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vec3, _rel_point: Vec3) {
        let state = self.body_mut(body);
        if state.mass > 0.0 {
            state.vel += impulse / state.mass;
        }
    }

    fn ray_test_closest(&self, from: Vec3, to: Vec3, mask: u32) -> Option<RayHit> {
        let dir = to - from;
        let len = dir.length();
        if len <= f32::EPSILON {
            return None;
        }
        let dir = dir / len;

        let mut best: Option<(f32, BodyId, Vec3)> = None;
        for (&id, state) in &self.bodies {
            if state.layers & mask == 0 {
                continue;
            }
            let t = match state.shape {
                Shape::Plane => {
                    if dir.z.abs() <= f32::EPSILON {
                        continue;
                    }
                    (state.pos.z - from.z) / dir.z
                }
                _ => {
                    // Bounding-sphere intersection, nearest root
                    let r = state.shape.bound_radius();
                    let oc = from - state.pos;
                    let b = oc.dot(dir);
                    let c = oc.length_squared() - r * r;
                    let disc = b * b - c;
                    if disc < 0.0 {
                        continue;
                    }
                    -b - disc.sqrt()
                }
            };
            if t < 0.0 || t > len {
                continue;
            }
            if best.map(|(bt, _, _)| t < bt).unwrap_or(true) {
                best = Some((t, id, from + dir * t));
            }
        }

        best.map(|(_, body, point)| RayHit { body, point })
    }

    fn contact_test(&self, body: BodyId) -> Vec<Contact> {
        let probe = self.body(body);
        let probe_r = probe.shape.bound_radius();

        let mut contacts = Vec::new();
        for (&other_id, other) in &self.bodies {
            if other_id == body {
                continue;
            }
            let touching = match other.shape {
                Shape::Plane => probe.pos.z - probe_r <= other.pos.z,
                _ => {
                    let r = probe_r + other.shape.bound_radius();
                    (probe.pos - other.pos).length_squared() <= r * r
                }
            };
            if touching {
                contacts.push(Contact { other: other_id });
            }
        }
        contacts
    }

    fn step(&mut self, dt: f32) {
        for state in self.bodies.values_mut() {
            if state.mass > 0.0 && state.vel != Vec3::ZERO {
                state.vel.z += GRAVITY * dt;
                state.pos += state.vel * dt;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(pos: Vec3, layers: u32) -> BodyDesc {
        BodyDesc {
            pos,
            mass: 1.0,
            shape: Shape::Sphere { radius: 0.5 },
            layers,
        }
    }

    #[test]
    fn test_ray_hits_closest_body() {
        let mut world = BallisticWorld::new();
        let near = world.attach(sphere(Vec3::new(5.0, 0.0, 0.0), mask::AIM));
        let _far = world.attach(sphere(Vec3::new(10.0, 0.0, 0.0), mask::AIM));

        let hit = world
            .ray_test_closest(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0), mask::AIM)
            .unwrap();
        assert_eq!(hit.body, near);
        assert!((hit.point.x - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_ray_respects_mask() {
        let mut world = BallisticWorld::new();
        let _terrain = world.attach(sphere(Vec3::new(5.0, 0.0, 0.0), mask::TERRAIN));

        let hit = world.ray_test_closest(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0), mask::AIM);
        assert!(hit.is_none());
    }

    #[test]
    fn test_static_body_ignores_step() {
        let mut world = BallisticWorld::new();
        let id = world.attach(BodyDesc {
            pos: Vec3::new(0.0, 0.0, 5.0),
            mass: 0.0,
            shape: Shape::Cylinder {
                radius: 0.7,
                half_height: 1.0,
            },
            layers: mask::AIM,
        });

        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(world.position(id).unwrap(), Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_dynamic_body_falls_to_plane_contact() {
        let mut world = BallisticWorld::new();
        let plane = world.attach(BodyDesc {
            pos: Vec3::ZERO,
            mass: 0.0,
            shape: Shape::Plane,
            layers: mask::TERRAIN,
        });
        let ball = world.attach(sphere(Vec3::new(0.0, 0.0, 3.0), mask::AIM));

        assert!(world.contact_test(ball).is_empty());
        // At rest the body stays put; a nudge starts the fall
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(world.position(ball).unwrap(), Vec3::new(0.0, 0.0, 3.0));

        world.apply_impulse(ball, Vec3::new(0.0, 0.0, -0.5), Vec3::ZERO);
        for _ in 0..120 {
            world.step(1.0 / 60.0);
        }
        let contacts = world.contact_test(ball);
        assert!(contacts.iter().any(|c| c.other == plane));
    }

    #[test]
    #[should_panic(expected = "detach of unknown body")]
    fn test_double_detach_panics() {
        let mut world = BallisticWorld::new();
        let id = world.attach(sphere(Vec3::ZERO, mask::AIM));
        world.detach(id);
        world.detach(id);
    }
}
