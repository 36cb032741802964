//! Procedural particle field
//!
//! Particles are seeded once inside a cube of half-size `extent`. After that
//! every position is a pure function of elapsed time: each particle
//! oscillates around its home point with amplitudes no larger than the
//! drift, and homes are kept `drift` away from the faces, so no particle ever
//! leaves the cube no matter how long the field runs or how uneven the frame
//! deltas are.

use crate::error::{AnimationError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Particle density presets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    #[default]
    Medium,
    High,
}

impl Intensity {
    pub fn particle_count(self) -> usize {
        match self {
            Intensity::Low => 300,
            Intensity::Medium => 600,
            Intensity::High => 1200,
        }
    }
}

/// Particle field parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleFieldConfig {
    pub count: usize,
    /// Half-size of the bounding cube
    pub extent: f32,
    /// Horizontal oscillation amplitude
    pub drift_x: f32,
    /// Vertical oscillation amplitude
    pub drift_y: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub size_min: f32,
    pub size_max: f32,
    pub seed: u64,
    /// Include the slowly turning wireframe shapes
    pub show_geometry: bool,
}

impl Default for ParticleFieldConfig {
    fn default() -> Self {
        Self {
            count: Intensity::Medium.particle_count(),
            extent: 10.0,
            drift_x: 0.15,
            drift_y: 0.3,
            speed_min: 0.1,
            speed_max: 0.6,
            size_min: 0.5,
            size_max: 2.5,
            seed: 0x5EED,
            show_geometry: true,
        }
    }
}

impl ParticleFieldConfig {
    pub fn with_intensity(intensity: Intensity) -> Self {
        Self {
            count: intensity.particle_count(),
            ..Default::default()
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    fn max_drift(&self) -> f32 {
        self.drift_x.max(self.drift_y)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(AnimationError::InvalidParticleField(msg.to_string()));
        let values = [
            self.extent,
            self.drift_x,
            self.drift_y,
            self.speed_min,
            self.speed_max,
            self.size_min,
            self.size_max,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return invalid("parameters must be finite");
        }
        if self.extent <= 0.0 {
            return invalid("extent must be positive");
        }
        if self.drift_x < 0.0 || self.drift_y < 0.0 {
            return invalid("drift must not be negative");
        }
        if self.max_drift() >= self.extent {
            return invalid("drift must be smaller than extent");
        }
        if self.speed_min < 0.0 || self.speed_min > self.speed_max {
            return invalid("speed range is empty or negative");
        }
        if self.size_min < 0.0 || self.size_min > self.size_max {
            return invalid("size range is empty or negative");
        }
        Ok(())
    }
}

/// One seeded particle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub home: [f32; 3],
    pub phase: f32,
    pub speed: f32,
    pub size: f32,
}

/// Whole-field rotation in radians
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldPose {
    pub rotation_x: f32,
    pub rotation_y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Torus,
    Octahedron,
    Icosahedron,
}

/// Pose of one floating wireframe shape
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapePose {
    pub kind: ShapeKind,
    pub position: [f32; 3],
    /// Euler rotation in radians
    pub rotation: [f32; 3],
}

/// Deterministic particle simulation stepped once per frame
pub struct ParticleField {
    config: ParticleFieldConfig,
    particles: Vec<Particle>,
    positions: Vec<[f32; 3]>,
    pose: FieldPose,
    light: [f32; 2],
    shapes: Vec<ShapePose>,
    elapsed: f32,
}

impl ParticleField {
    pub fn new(config: ParticleFieldConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let reach = config.extent - config.max_drift();
        let particles: Vec<Particle> = (0..config.count)
            .map(|i| Particle {
                home: [
                    rng.gen_range(-reach..=reach),
                    rng.gen_range(-reach..=reach),
                    rng.gen_range(-config.extent..=config.extent),
                ],
                phase: i as f32,
                speed: rng.gen_range(config.speed_min..=config.speed_max),
                size: rng.gen_range(config.size_min..=config.size_max),
            })
            .collect();

        let positions = particles.iter().map(|p| p.home).collect();
        tracing::debug!(count = config.count, seed = config.seed, "particle field seeded");

        let mut field = Self {
            config,
            particles,
            positions,
            pose: FieldPose::default(),
            light: [0.0, 0.0],
            shapes: Vec::new(),
            elapsed: 0.0,
        };
        field.step(0.0);
        Ok(field)
    }

    /// Position of particle `index` at `elapsed` seconds
    pub fn position_at(&self, index: usize, elapsed: f32) -> Option<[f32; 3]> {
        self.particles
            .get(index)
            .map(|p| particle_position(p, elapsed, &self.config))
    }

    /// Recompute every particle, the field pose and the light for `elapsed`
    pub fn step(&mut self, elapsed: f32) {
        self.elapsed = elapsed;
        for (slot, particle) in self.positions.iter_mut().zip(&self.particles) {
            *slot = particle_position(particle, elapsed, &self.config);
        }
        self.pose = FieldPose {
            rotation_x: (elapsed * 0.1).sin() * 0.1,
            rotation_y: elapsed * 0.05,
        };
        self.light = [(elapsed * 0.3).sin() * 5.0, (elapsed * 0.2).cos() * 5.0];
        self.shapes.clear();
        if self.config.show_geometry {
            self.shapes.extend(floating_shapes(elapsed));
        }
    }

    pub fn config(&self) -> &ParticleFieldConfig {
        &self.config
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn pose(&self) -> FieldPose {
        self.pose
    }

    /// Orbiting light position (x, y)
    pub fn light_position(&self) -> [f32; 2] {
        self.light
    }

    pub fn shapes(&self) -> &[ShapePose] {
        &self.shapes
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Whether `point` lies inside the bounding cube
    pub fn contains(&self, point: [f32; 3]) -> bool {
        point.iter().all(|c| c.abs() <= self.config.extent)
    }
}

fn particle_position(p: &Particle, t: f32, config: &ParticleFieldConfig) -> [f32; 3] {
    [
        p.home[0] + (t * p.speed * 0.5 + p.phase).cos() * config.drift_x,
        p.home[1] + (t * p.speed + p.phase).sin() * config.drift_y,
        p.home[2],
    ]
}

fn floating_shapes(t: f32) -> [ShapePose; 3] {
    let group_y = t * 0.03;
    [
        ShapePose {
            kind: ShapeKind::Torus,
            position: [-4.0, 1.0 + (t * 0.5).sin() * 0.5, -3.0],
            rotation: [t * 0.2, group_y, t * 0.15],
        },
        ShapePose {
            kind: ShapeKind::Octahedron,
            position: [4.0, -1.0 + (t * 0.4).cos() * 0.3, -2.0],
            rotation: [t * 0.15, group_y + t * 0.25, 0.0],
        },
        ShapePose {
            kind: ShapeKind::Icosahedron,
            position: [0.0, 2.0 + (t * 0.6 + 1.0).sin() * 0.4, -4.0],
            rotation: [t * 0.2, group_y, t * 0.1],
        },
    ]
}
