//! Per-cell simulation state buffers
//!
//! All fields are flat row-major arrays (`i = y * width + x`, no wraparound).
//! The engine keeps two [`CellBuffers`] in a ping-pong arrangement: within a
//! step the active buffer is read-only "current" and the other is the
//! write-only "next"; the active index flips after the final pass.
//!
//! Outflow flux component convention (fixed here, used everywhere):
//! `x` = left (x-1), `y` = right (x+1), `z` = top (y-1), `w` = bottom (y+1).

use nalgebra::{Vector2, Vector4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// One complete grid state: terrain, water, sediment, flux, velocity.
#[derive(Debug, Clone)]
pub struct CellBuffers {
    /// Terrain height per cell, never negative.
    pub terrain: Vec<f32>,
    /// Water depth per cell, never negative.
    pub water: Vec<f32>,
    /// Suspended sediment per cell, never negative.
    pub sediment: Vec<f32>,
    /// 4-directional outflow flux, fully recomputed each step.
    pub flux: Vec<Vector4<f32>>,
    /// Net-flow velocity estimate per cell.
    pub velocity: Vec<Vector2<f32>>,
}

impl CellBuffers {
    /// Allocate a buffer with the given terrain and everything else zeroed.
    #[must_use]
    pub fn from_terrain(terrain: &[f32]) -> Self {
        let cells = terrain.len();
        Self {
            terrain: terrain.to_vec(),
            water: vec![0.0; cells],
            sediment: vec![0.0; cells],
            flux: vec![Vector4::zeros(); cells],
            velocity: vec![Vector2::zeros(); cells],
        }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terrain.len()
    }

    /// Whether the grid is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terrain.is_empty()
    }

    /// Restore the post-construction state: the original terrain, with
    /// water, sediment, flux and velocity all cleared.
    pub fn reset(&mut self, terrain: &[f32]) {
        self.terrain.copy_from_slice(terrain);
        self.water.fill(0.0);
        self.sediment.fill(0.0);
        self.flux.fill(Vector4::zeros());
        self.velocity.fill(Vector2::zeros());
    }
}

/// Shape of the fixed per-cell rain-rate field.
///
/// The mask is materialized once at engine construction and reapplied by
/// `reset()`; it never changes during a run. Cells outside a masked region
/// receive exactly zero rain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum RainMask {
    /// Every cell receives the same rate.
    Uniform(f32),
    /// Rain only inside an axis-aligned rectangle of cells.
    Region {
        x0: usize,
        y0: usize,
        width: usize,
        height: usize,
        rate: f32,
    },
    /// Seeded random speckle: each cell independently receives `rate` with
    /// probability `coverage`, else zero. Deterministic for a given seed.
    Speckled { seed: u64, coverage: f32, rate: f32 },
}

impl Default for RainMask {
    fn default() -> Self {
        RainMask::Uniform(1.0)
    }
}

impl RainMask {
    /// Materialize the per-cell rain-rate array.
    #[must_use]
    pub fn build(&self, width: usize, height: usize) -> Vec<f32> {
        match *self {
            RainMask::Uniform(rate) => vec![rate; width * height],
            RainMask::Region {
                x0,
                y0,
                width: rw,
                height: rh,
                rate,
            } => {
                let mut rates = vec![0.0; width * height];
                for y in y0..(y0 + rh).min(height) {
                    for x in x0..(x0 + rw).min(width) {
                        rates[y * width + x] = rate;
                    }
                }
                rates
            }
            RainMask::Speckled {
                seed,
                coverage,
                rate,
            } => {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..width * height)
                    .map(|_| {
                        if rng.random::<f32>() < coverage {
                            rate
                        } else {
                            0.0
                        }
                    })
                    .collect()
            }
        }
    }
}
