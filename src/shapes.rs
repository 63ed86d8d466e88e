//! Body generators: ropes, cubes, lattices, sphere shells and shape-matched
//! blobs.
//!
//! Generators build the whole body synchronously. Rest lengths are taken
//! from the generated positions, so a fresh body starts at rest.

use alloc::vec::Vec as AllocVec;

use crate::body::Body;
use crate::constraint::DistanceConstraint;
use crate::error::PhysicsError;
use crate::float::Float;
use crate::particle::{Particle, DEFAULT_RADIUS};
use crate::shape_matching::{ShapeMatchingConstraint, MIN_PARTICLES};
use crate::vec::{Vec, Vec3};

fn check_mass<F: Float>(mass: F) -> Result<(), PhysicsError> {
    if mass.is_finite() && mass > F::zero() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidMass)
    }
}

fn check_stiffness<F: Float>(stiffness: F) -> Result<(), PhysicsError> {
    if stiffness.is_finite() && stiffness >= F::zero() && stiffness <= F::one() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidStiffness)
    }
}

fn connect<F: Float>(body: &mut Body<F>, a: usize, b: usize, stiffness: F) {
    let c = DistanceConstraint::from_particles(a, b, body.particles(), stiffness);
    body.push_constraint(c);
}

/// Configuration for [`Body::rope`].
#[derive(Clone, Debug, PartialEq)]
pub struct RopeConfig<F: Float> {
    pub particle_mass: F,
    pub stiffness: F,
    pub particle_radius: F,
}

impl<F: Float> Default for RopeConfig<F> {
    fn default() -> Self {
        RopeConfig {
            particle_mass: F::one(),
            stiffness: F::one(),
            particle_radius: F::from_f32(DEFAULT_RADIUS),
        }
    }
}

/// Configuration for [`Body::cube`].
#[derive(Clone, Debug, PartialEq)]
pub struct CubeConfig<F: Float> {
    /// Edge length.
    pub size: F,
    pub particle_mass: F,
    pub stiffness: F,
    /// Two diagonals on each of the six faces.
    pub face_diagonals: bool,
    /// The four corner-to-corner diagonals through the centre.
    pub internal_diagonals: bool,
    pub particle_radius: F,
}

impl<F: Float> Default for CubeConfig<F> {
    fn default() -> Self {
        CubeConfig {
            size: F::one(),
            particle_mass: F::one(),
            stiffness: F::one(),
            face_diagonals: true,
            internal_diagonals: true,
            particle_radius: F::from_f32(DEFAULT_RADIUS),
        }
    }
}

/// Configuration for [`Body::lattice`].
#[derive(Clone, Debug, PartialEq)]
pub struct LatticeConfig<F: Float> {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub spacing: F,
    pub particle_mass: F,
    pub structural_stiffness: F,
    pub shear_stiffness: F,
    pub bend_stiffness: F,
    pub particle_radius: F,
}

impl<F: Float> Default for LatticeConfig<F> {
    fn default() -> Self {
        LatticeConfig {
            nx: 3,
            ny: 3,
            nz: 3,
            spacing: F::from_f32(0.25),
            particle_mass: F::one(),
            structural_stiffness: F::one(),
            shear_stiffness: F::from_f32(0.8),
            bend_stiffness: F::from_f32(0.5),
            particle_radius: F::from_f32(DEFAULT_RADIUS),
        }
    }
}

/// Configuration for [`Body::sphere`].
#[derive(Clone, Debug, PartialEq)]
pub struct SphereConfig<F: Float> {
    pub radius: F,
    /// Number of surface points.
    pub points: usize,
    pub particle_mass: F,
    /// Stiffness of the springs between neighbouring surface points.
    pub surface_stiffness: F,
    /// Scales the mean point spacing to get the surface connection distance.
    pub connection_multiplier: F,
    /// Add a centre particle tied to every surface point.
    pub center_particle: bool,
    /// Centre particle mass relative to `particle_mass`.
    pub center_mass_scale: F,
    pub volume_stiffness: F,
    pub particle_radius: F,
}

impl<F: Float> Default for SphereConfig<F> {
    fn default() -> Self {
        SphereConfig {
            radius: F::half(),
            points: 42,
            particle_mass: F::one(),
            surface_stiffness: F::one(),
            connection_multiplier: F::two(),
            center_particle: true,
            center_mass_scale: F::two(),
            volume_stiffness: F::half(),
            particle_radius: F::from_f32(DEFAULT_RADIUS),
        }
    }
}

/// Configuration for [`Body::blob`].
#[derive(Clone, Debug, PartialEq)]
pub struct BlobConfig<F: Float> {
    pub radius: F,
    /// Grid steps from the centre to the surface along each axis.
    pub resolution: usize,
    pub particle_mass: F,
    /// Shape-matching stiffness.
    pub stiffness: F,
    pub particle_radius: F,
}

impl<F: Float> Default for BlobConfig<F> {
    fn default() -> Self {
        BlobConfig {
            radius: F::half(),
            resolution: 2,
            particle_mass: F::one(),
            stiffness: F::half(),
            particle_radius: F::from_f32(DEFAULT_RADIUS),
        }
    }
}

/// Corner order: bottom face counter-clockwise from (-,-,-), then the top
/// face in the same order.
const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1), (1, 2), (2, 3), (3, 0),
    (4, 5), (5, 6), (6, 7), (7, 4),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

const CUBE_FACE_DIAGONALS: [(usize, usize); 12] = [
    (0, 2), (1, 3), (4, 6), (5, 7),
    (0, 5), (1, 4), (3, 6), (2, 7),
    (0, 7), (3, 4), (1, 6), (2, 5),
];

const CUBE_INTERNAL_DIAGONALS: [(usize, usize); 4] = [(0, 6), (1, 7), (2, 4), (3, 5)];

impl<F: Float> Body<F> {
    /// A rope of `segments` springs from `start` to `end`.
    pub fn rope(
        start: Vec3<F>,
        end: Vec3<F>,
        segments: usize,
        config: &RopeConfig<F>,
    ) -> Result<Self, PhysicsError> {
        check_mass(config.particle_mass)?;
        check_stiffness(config.stiffness)?;
        let mut body = Body::new();
        if segments == 0 {
            log::warn!("rope with zero segments is empty");
            return Ok(body);
        }

        let n = F::from_usize(segments);
        for i in 0..=segments {
            let pos = start.lerp(end, F::from_usize(i) / n);
            body.add_particle(
                Particle::new(pos, config.particle_mass).with_radius(config.particle_radius),
            );
        }
        for i in 0..segments {
            connect(&mut body, i, i + 1, config.stiffness);
        }
        Ok(body)
    }

    /// A spring cube: 8 corners, 12 edges, plus optional face and internal
    /// diagonals.
    pub fn cube(center: Vec3<F>, config: &CubeConfig<F>) -> Result<Self, PhysicsError> {
        check_mass(config.particle_mass)?;
        check_stiffness(config.stiffness)?;
        let half = config.size * F::half();
        let mut body = Body::new();
        for c in CUBE_CORNERS.iter() {
            let offset = Vec3::new(F::from_f32(c[0]), F::from_f32(c[1]), F::from_f32(c[2]));
            body.add_particle(
                Particle::new(center + offset.scale(half), config.particle_mass)
                    .with_radius(config.particle_radius),
            );
        }

        let mut pairs: AllocVec<(usize, usize)> = CUBE_EDGES.to_vec();
        if config.face_diagonals {
            pairs.extend_from_slice(&CUBE_FACE_DIAGONALS);
        }
        if config.internal_diagonals {
            pairs.extend_from_slice(&CUBE_INTERNAL_DIAGONALS);
        }
        for (a, b) in pairs {
            connect(&mut body, a, b, config.stiffness);
        }
        Ok(body)
    }

    /// A box lattice growing from `origin` along +X, +Y and +Z.
    ///
    /// Particle `(i, j, k)` has index `(k * ny + j) * nx + i`. Springs:
    /// - structural: axis neighbours
    /// - shear: both diagonals of every lattice face
    /// - bend: skip-one along each axis
    pub fn lattice(origin: Vec3<F>, config: &LatticeConfig<F>) -> Result<Self, PhysicsError> {
        check_mass(config.particle_mass)?;
        check_stiffness(config.structural_stiffness)?;
        check_stiffness(config.shear_stiffness)?;
        check_stiffness(config.bend_stiffness)?;
        let (nx, ny, nz) = (config.nx, config.ny, config.nz);
        let mut body = Body::new();
        if nx == 0 || ny == 0 || nz == 0 {
            log::warn!("lattice {}x{}x{} is empty", nx, ny, nz);
            return Ok(body);
        }

        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let offset = Vec3::new(F::from_usize(i), F::from_usize(j), F::from_usize(k));
                    body.add_particle(
                        Particle::new(origin + offset.scale(config.spacing), config.particle_mass)
                            .with_radius(config.particle_radius),
                    );
                }
            }
        }

        let idx = |i: usize, j: usize, k: usize| (k * ny + j) * nx + i;
        let axes = [(1, 0, 0), (0, 1, 0), (0, 0, 1)];

        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let a = idx(i, j, k);
                    for &(dx, dy, dz) in &axes {
                        if i + dx < nx && j + dy < ny && k + dz < nz {
                            connect(&mut body, a, idx(i + dx, j + dy, k + dz), config.structural_stiffness);
                        }
                        if i + 2 * dx < nx && j + 2 * dy < ny && k + 2 * dz < nz {
                            connect(&mut body, a, idx(i + 2 * dx, j + 2 * dy, k + 2 * dz), config.bend_stiffness);
                        }
                    }
                    // Shear: XY, XZ and YZ faces anchored at (i, j, k).
                    if i + 1 < nx && j + 1 < ny {
                        connect(&mut body, a, idx(i + 1, j + 1, k), config.shear_stiffness);
                        connect(&mut body, idx(i + 1, j, k), idx(i, j + 1, k), config.shear_stiffness);
                    }
                    if i + 1 < nx && k + 1 < nz {
                        connect(&mut body, a, idx(i + 1, j, k + 1), config.shear_stiffness);
                        connect(&mut body, idx(i + 1, j, k), idx(i, j, k + 1), config.shear_stiffness);
                    }
                    if j + 1 < ny && k + 1 < nz {
                        connect(&mut body, a, idx(i, j + 1, k + 1), config.shear_stiffness);
                        connect(&mut body, idx(i, j + 1, k), idx(i, j, k + 1), config.shear_stiffness);
                    }
                }
            }
        }
        Ok(body)
    }

    /// A hollow sphere of Fibonacci-distributed surface points.
    ///
    /// Surface points closer than the mean point spacing times
    /// `0.8 * connection_multiplier` are linked. With `center_particle` a
    /// heavier particle is appended last and tied to every surface point.
    pub fn sphere(center: Vec3<F>, config: &SphereConfig<F>) -> Result<Self, PhysicsError> {
        check_mass(config.particle_mass)?;
        check_stiffness(config.surface_stiffness)?;
        check_stiffness(config.volume_stiffness)?;
        let n = config.points;
        let mut body = Body::new();
        if n == 0 {
            log::warn!("sphere with zero surface points is empty");
            return Ok(body);
        }

        let golden_angle = F::pi() * (F::from_f32(3.0) - F::from_f32(5.0).sqrt());
        let denom = F::from_usize(n.saturating_sub(1).max(1));
        for i in 0..n {
            let fi = F::from_usize(i);
            let y = F::one() - fi / denom * F::two();
            let ring = (F::one() - y * y).max(F::zero()).sqrt();
            let theta = golden_angle * fi;
            let dir = Vec3::new(theta.cos() * ring, y, theta.sin() * ring);
            body.add_particle(
                Particle::new(center + dir.scale(config.radius), config.particle_mass)
                    .with_radius(config.particle_radius),
            );
        }

        let area = F::from_f32(4.0) * F::pi() * config.radius * config.radius;
        let spacing = (area / F::from_usize(n)).sqrt();
        let reach = spacing * F::from_f32(0.8) * config.connection_multiplier;
        body.connect_within(reach, config.surface_stiffness);

        if config.center_particle {
            let c = body.add_particle(
                Particle::new(center, config.particle_mass * config.center_mass_scale)
                    .with_radius(config.particle_radius),
            );
            for i in 0..n {
                connect(&mut body, c, i, config.volume_stiffness);
            }
        }
        Ok(body)
    }

    /// A solid ball of grid points held together by one shape-matching
    /// constraint over every particle.
    ///
    /// Points on a cubic grid with `resolution` steps per radius are kept
    /// when within `1.05 * radius` of the centre.
    pub fn blob(center: Vec3<F>, config: &BlobConfig<F>) -> Result<Self, PhysicsError> {
        check_mass(config.particle_mass)?;
        check_stiffness(config.stiffness)?;
        let res = config.resolution.max(1) as i32;
        let step = config.radius / F::from_usize(res as usize);
        let limit = config.radius * F::from_f32(1.05);
        let limit_sq = limit * limit;

        let mut body = Body::new();
        for i in -res..=res {
            for j in -res..=res {
                for k in -res..=res {
                    let offset = Vec3::new(
                        F::from_f32(i as f32),
                        F::from_f32(j as f32),
                        F::from_f32(k as f32),
                    )
                    .scale(step);
                    if offset.length_sq() <= limit_sq {
                        body.add_particle(
                            Particle::new(center + offset, config.particle_mass)
                                .with_radius(config.particle_radius),
                        );
                    }
                }
            }
        }

        if body.particle_count() < MIN_PARTICLES {
            return Err(PhysicsError::InsufficientParticles {
                required: MIN_PARTICLES,
                actual: body.particle_count(),
            });
        }
        let indices: AllocVec<usize> = (0..body.particle_count()).collect();
        let c = ShapeMatchingConstraint::new(indices, body.particles(), config.stiffness);
        body.push_constraint(c);
        Ok(body)
    }
}
