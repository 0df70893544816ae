//! Static terrain bodies the tower interacts with
//!
//! Only the two bodies the core algorithms query are modeled: the water
//! surface fallen blocks sink into, and the stone foundation the tower
//! stands on. Everything decorative lives outside the core.

use glam::Vec3;

use crate::consts::*;
use crate::physics::{mask, BodyDesc, BodyId, PhysicsWorld, Shape};

/// Radius of the foundation stone's collision shape
const FOUNDATION_RADIUS: f32 = 4.9;

#[derive(Debug, Clone, Copy)]
pub struct Scene {
    /// Water surface plane; contact means a block leaves play
    pub surface: BodyId,
    /// Stone foundation; contact marks a dropped block `ON_STONE`
    pub foundation: BodyId,
}

impl Scene {
    /// Register both static bodies with the physics collaborator
    pub fn setup(tower_center: Vec3, physics: &mut impl PhysicsWorld) -> Self {
        let surface = physics.attach(BodyDesc {
            pos: Vec3::new(0.0, 0.0, WATER_LEVEL),
            mass: 0.0,
            shape: Shape::Plane,
            layers: mask::TERRAIN,
        });
        let foundation = physics.attach(BodyDesc {
            pos: Vec3::new(tower_center.x, tower_center.y, FOUNDATION_TOP / 2.0),
            mass: 0.0,
            shape: Shape::Cylinder {
                radius: FOUNDATION_RADIUS,
                half_height: FOUNDATION_TOP / 2.0,
            },
            layers: mask::TERRAIN,
        });
        Self {
            surface,
            foundation,
        }
    }
}
