//! # Collision System
//!
//! Fixed-timestep kinematics for an observer bounded by a vertical cylinder.
//!
//! Each step:
//! - gravity is applied to the vertical velocity,
//! - the movement model integrates position,
//! - broad phase gathers every occupied cell under the observer's AABB,
//! - narrow phase tests each cell's closest point against the cylinder,
//! - contacts are resolved smallest overlap first.
//!
//! Blocks are unit cubes centered on integer coordinates. The observer's
//! `position` is the top of the cylinder; its feet are `height` below.

use strata_procedural::BlockId;
use strata_shared::{PhysicsParams, Vec3};

use crate::chunk_store::BlockQuery;
use crate::movement::MovementModel;

/// Observer radius used by the walking demo (blocks).
pub const OBSERVER_RADIUS: f32 = 0.3;

/// Observer height used by the walking demo (blocks).
pub const OBSERVER_HEIGHT: f32 = 1.8;

/// Kinematic state of the observer. Owned by the caller; the collision
/// system only reads and corrects it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KinematicState {
    /// Top of the bounding cylinder (world space).
    pub position: Vec3,
    /// Blocks per second.
    pub velocity: Vec3,
    /// Cylinder radius.
    pub radius: f32,
    /// Cylinder height.
    pub height: f32,
    /// Standing on something since the last step.
    pub grounded: bool,
}

impl KinematicState {
    /// Creates a state at rest.
    #[must_use]
    pub const fn new(position: Vec3, radius: f32, height: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            radius,
            height,
            grounded: false,
        }
    }

    /// Creates a state whose feet stand at `feet`.
    #[must_use]
    pub fn standing_at(feet: Vec3, radius: f32, height: f32) -> Self {
        Self::new(feet + Vec3::new(0.0, height, 0.0), radius, height)
    }

    /// Y of the bottom of the cylinder.
    #[inline]
    #[must_use]
    pub fn feet(&self) -> f32 {
        self.position.y - self.height
    }

    /// Center of the cylinder.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            self.position.x,
            self.position.y - self.height * 0.5,
            self.position.z,
        )
    }

    /// Returns true if `point` lies strictly inside the cylinder.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        let d = point - self.center();
        d.y.abs() < self.height * 0.5 && d.horizontal_length() < self.radius
    }
}

/// One narrow-phase hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Cell of the block hit.
    pub block: [i32; 3],
    /// Closest point on the block to the cylinder center.
    pub point: Vec3,
    /// Direction the observer is pushed.
    pub normal: Vec3,
    /// Push distance.
    pub overlap: f32,
}

/// What one step saw, for debug overlays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionReport {
    /// Broad-phase candidates.
    pub candidates: Vec<[i32; 3]>,
    /// Narrow-phase contacts in resolution order.
    pub contacts: Vec<Contact>,
}

/// Fixed-timestep collision simulation.
pub struct CollisionSystem {
    timestep: f32,
    gravity: f32,
    max_frame_time: f32,
    max_steps: u32,
    accumulator: f32,
    debug: bool,
    report: Option<CollisionReport>,
}

impl CollisionSystem {
    /// Creates a system from physics parameters.
    #[must_use]
    pub fn new(params: &PhysicsParams) -> Self {
        let timestep = 1.0 / params.simulation_rate;
        Self {
            timestep,
            gravity: params.gravity,
            max_frame_time: params.max_frame_time,
            max_steps: (params.max_frame_time / timestep).ceil() as u32 + 1,
            accumulator: 0.0,
            debug: false,
            report: None,
        }
    }

    /// Seconds per step.
    #[inline]
    #[must_use]
    pub const fn timestep(&self) -> f32 {
        self.timestep
    }

    /// Unconsumed time carried into the next frame.
    #[inline]
    #[must_use]
    pub const fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Enables or disables [`CollisionReport`] recording.
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
        if !enabled {
            self.report = None;
        }
    }

    /// Report of the last step, if debugging is enabled.
    #[must_use]
    pub fn last_report(&self) -> Option<&CollisionReport> {
        self.report.as_ref()
    }

    /// Advances by `dt` seconds in whole timesteps. Returns the number of
    /// steps run.
    pub fn update<M, Q>(&mut self, dt: f32, state: &mut KinematicState, movement: &mut M, world: &Q) -> u32
    where
        M: MovementModel + ?Sized,
        Q: BlockQuery + ?Sized,
    {
        if !dt.is_finite() {
            tracing::warn!(dt, "non-finite frame time ignored");
            return 0;
        }
        self.accumulator += dt.clamp(0.0, self.max_frame_time);

        let mut steps = 0;
        while self.accumulator >= self.timestep && steps < self.max_steps {
            self.step(state, movement, world);
            self.accumulator -= self.timestep;
            steps += 1;
        }

        if self.accumulator >= self.timestep {
            tracing::warn!(
                steps,
                dropped_s = self.accumulator,
                "physics step clamp hit, dropping time"
            );
            self.accumulator %= self.timestep;
        }
        steps
    }

    /// Runs exactly one timestep.
    pub fn step<M, Q>(&mut self, state: &mut KinematicState, movement: &mut M, world: &Q)
    where
        M: MovementModel + ?Sized,
        Q: BlockQuery + ?Sized,
    {
        state.velocity.y -= self.gravity * self.timestep;
        movement.apply_inputs(state, self.timestep);
        state.grounded = false;

        let candidates = broad_phase(state, world);
        let mut contacts: Vec<Contact> = candidates
            .iter()
            .filter_map(|&block| narrow_phase(state, block))
            .collect();
        contacts.sort_by(|a, b| a.overlap.total_cmp(&b.overlap));
        resolve(state, &contacts);

        if self.debug {
            self.report = Some(CollisionReport {
                candidates,
                contacts,
            });
        }
    }
}

/// Every occupied cell overlapping the observer's AABB.
#[must_use]
pub fn broad_phase<Q: BlockQuery + ?Sized>(state: &KinematicState, world: &Q) -> Vec<[i32; 3]> {
    let p = state.position;
    let (min_x, max_x) = ((p.x - state.radius).floor() as i32, (p.x + state.radius).ceil() as i32);
    let (min_y, max_y) = ((p.y - state.height).floor() as i32, p.y.ceil() as i32);
    let (min_z, max_z) = ((p.z - state.radius).floor() as i32, (p.z + state.radius).ceil() as i32);

    let mut candidates = Vec::new();
    for y in min_y..=max_y {
        for z in min_z..=max_z {
            for x in min_x..=max_x {
                if world.is_occupied(x, y, z) {
                    candidates.push([x, y, z]);
                }
            }
        }
    }
    candidates
}

/// Tests one candidate cell against the cylinder.
#[must_use]
pub fn narrow_phase(state: &KinematicState, block: [i32; 3]) -> Option<Contact> {
    let center = state.center();
    let clamp = |c: f32, b: i32| c.clamp(b as f32 - 0.5, b as f32 + 0.5);
    let point = Vec3::new(
        clamp(center.x, block[0]),
        clamp(center.y, block[1]),
        clamp(center.z, block[2]),
    );
    if !state.contains(point) {
        return None;
    }

    let d = point - center;
    let half_height = state.height * 0.5;
    let horizontal = d.horizontal_length();
    let overlap_y = half_height - d.y.abs();
    let overlap_xz = state.radius - horizontal;

    let (normal, overlap) = if overlap_y < overlap_xz || horizontal <= f32::EPSILON {
        let up = if d.y > 0.0 { -1.0 } else { 1.0 };
        (Vec3::new(0.0, up, 0.0), overlap_y)
    } else {
        (Vec3::new(-d.x, 0.0, -d.z).normalize_or_zero(), overlap_xz)
    };

    Some(Contact {
        block,
        point,
        normal,
        overlap,
    })
}

/// Penetration below this is treated as touching.
const CONTACT_EPSILON: f32 = 1e-4;

/// How deep `contact.point` currently sits inside the cylinder along the
/// contact's axis. Zero or less means it is no longer inside.
fn penetration(state: &KinematicState, contact: &Contact) -> f32 {
    if !state.contains(contact.point) {
        return 0.0;
    }
    let d = contact.point - state.center();
    if contact.normal.y == 0.0 {
        state.radius - d.horizontal_length()
    } else {
        state.height * 0.5 - d.y.abs()
    }
}

/// Applies contacts in order, skipping any no longer inside the cylinder.
pub fn resolve(state: &mut KinematicState, contacts: &[Contact]) {
    for contact in contacts {
        if penetration(state, contact) <= CONTACT_EPSILON {
            continue;
        }
        state.position += contact.normal * contact.overlap;
        state.velocity = state.velocity.reject(contact.normal);
        if contact.normal.y > 0.0 {
            state.grounded = true;
        }
    }
}

/// Result of a voxel raycast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    /// Cell that was hit.
    pub block: [i32; 3],
    /// Block id in that cell.
    pub id: BlockId,
    /// Face normal of the hit (`[0, 0, 0]` if the ray started inside).
    pub normal: [i32; 3],
    /// Distance from origin to the hit face.
    pub distance: f32,
    /// Hit position in world space.
    pub point: Vec3,
}

impl RaycastHit {
    /// Cell in front of the hit face, where a placed block would go.
    #[must_use]
    pub const fn place_target(&self) -> [i32; 3] {
        [
            self.block[0] + self.normal[0],
            self.block[1] + self.normal[1],
            self.block[2] + self.normal[2],
        ]
    }
}

/// Casts a ray through the voxel grid (DDA).
///
/// Cells that are out of range or in unloaded chunks are passed through.
#[must_use]
pub fn raycast<Q: BlockQuery + ?Sized>(
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    world: &Q,
) -> Option<RaycastHit> {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
        return None;
    }
    let dir = dir.to_array();
    // Cells are centered on integers, so shift by half a block to walk a
    // grid whose cells start at integers.
    let start = [origin.x + 0.5, origin.y + 0.5, origin.z + 0.5];

    let mut cell = [
        start[0].floor() as i32,
        start[1].floor() as i32,
        start[2].floor() as i32,
    ];
    let mut step = [0i32; 3];
    let mut t_max = [f32::MAX; 3];
    let mut t_delta = [f32::MAX; 3];
    for axis in 0..3 {
        if dir[axis].abs() < 1e-6 {
            continue;
        }
        step[axis] = if dir[axis] > 0.0 { 1 } else { -1 };
        t_delta[axis] = (1.0 / dir[axis]).abs();
        let boundary = if dir[axis] > 0.0 {
            (cell[axis] + 1) as f32
        } else {
            cell[axis] as f32
        };
        t_max[axis] = (boundary - start[axis]) / dir[axis];
    }

    let mut distance = 0.0;
    let mut normal = [0i32; 3];
    while distance <= max_distance {
        if let Some(id) = world.block_at(cell[0], cell[1], cell[2]).filter(|id| !id.is_empty()) {
            return Some(RaycastHit {
                block: cell,
                id,
                normal,
                distance,
                point: origin + Vec3::from_array(dir) * distance,
            });
        }

        let axis = if t_max[0] < t_max[1] && t_max[0] < t_max[2] {
            0
        } else if t_max[1] < t_max[2] {
            1
        } else {
            2
        };
        if t_max[axis] == f32::MAX {
            break;
        }
        distance = t_max[axis];
        t_max[axis] += t_delta[axis];
        cell[axis] += step[axis];
        normal = [0; 3];
        normal[axis] = -step[axis];
    }

    None
}

/// Look direction from yaw and pitch in degrees. Yaw 0 looks toward -Z.
#[must_use]
pub fn look_direction(yaw: f32, pitch: f32) -> Vec3 {
    let (yaw, pitch) = (yaw.to_radians(), pitch.to_radians());
    Vec3::new(
        yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
}
