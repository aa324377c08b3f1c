//! Tiled parallel dispatch backend
//!
//! Conceptually one unit of work per cell, grouped into row-band tiles and
//! fanned out across the rayon worker pool. Every tile runs the same row
//! kernels as the sequential backend, so per-cell arithmetic is identical in
//! identical order; the rayon join at the end of each `run_pass` is the
//! inter-pass barrier.

use super::passes;
use super::r#trait::{Backend, PassContext, StepPass};
use nalgebra::Vector2;
use rayon::prelude::*;

/// Default number of rows per tile.
pub const DEFAULT_TILE_ROWS: usize = 8;

/// Rayon-backed backend dispatching fixed-size row bands.
#[derive(Debug, Clone, Copy)]
pub struct TiledBackend {
    tile_rows: usize,
}

impl TiledBackend {
    /// Create a backend with the given tile height in rows (minimum 1).
    #[must_use]
    pub fn new(tile_rows: usize) -> Self {
        Self {
            tile_rows: tile_rows.max(1),
        }
    }

    /// Rows per tile.
    #[must_use]
    pub fn tile_rows(&self) -> usize {
        self.tile_rows
    }
}

impl Default for TiledBackend {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_ROWS)
    }
}

impl Backend for TiledBackend {
    fn run_pass(&self, pass: StepPass, ctx: &mut PassContext<'_>) {
        let w = ctx.width;
        let h = ctx.height;
        let p = ctx.params;
        let tile_rows = self.tile_rows;
        let band = tile_rows * w;

        match pass {
            StepPass::Rainfall => {
                let water_in = ctx.water_in;
                let rain_rate = ctx.rain_rate;
                ctx.rained
                    .par_chunks_mut(band)
                    .enumerate()
                    .for_each(|(b, chunk)| {
                        for (j, row) in chunk.chunks_mut(w).enumerate() {
                            passes::rainfall_row(b * tile_rows + j, w, water_in, rain_rate, row, p);
                        }
                    });
            }
            StepPass::OutflowFlux => {
                let terrain_in = ctx.terrain_in;
                let flux_in = ctx.flux_in;
                let rained: &[f32] = ctx.rained;
                ctx.flux_out
                    .par_chunks_mut(band)
                    .enumerate()
                    .for_each(|(b, chunk)| {
                        for (j, row) in chunk.chunks_mut(w).enumerate() {
                            passes::outflow_flux_row(
                                b * tile_rows + j,
                                w,
                                h,
                                terrain_in,
                                rained,
                                flux_in,
                                row,
                                p,
                            );
                        }
                    });
            }
            StepPass::WaterHeight => {
                let rained: &[f32] = ctx.rained;
                let flux: &[_] = ctx.flux_out;
                ctx.water_out
                    .par_chunks_mut(band)
                    .enumerate()
                    .for_each(|(b, chunk)| {
                        for (j, row) in chunk.chunks_mut(w).enumerate() {
                            passes::water_height_row(b * tile_rows + j, w, h, rained, flux, row, p);
                        }
                    });
            }
            StepPass::Velocity => {
                let flux: &[_] = ctx.flux_out;
                ctx.velocity_out
                    .par_chunks_mut(band)
                    .enumerate()
                    .for_each(|(b, chunk)| {
                        for (j, row) in chunk.chunks_mut(w).enumerate() {
                            passes::velocity_row(b * tile_rows + j, w, h, flux, row);
                        }
                    });
            }
            StepPass::ErosionDeposition => {
                let terrain_in = ctx.terrain_in;
                let sediment_in = ctx.sediment_in;
                let rained: &[f32] = ctx.rained;
                let velocity: &[Vector2<f32>] = ctx.velocity_out;
                ctx.terrain_out
                    .par_chunks_mut(band)
                    .zip(ctx.staged_sediment.par_chunks_mut(band))
                    .zip(ctx.water_out.par_chunks_mut(band))
                    .enumerate()
                    .for_each(|(b, ((terrain_chunk, staged_chunk), water_chunk))| {
                        let rows = terrain_chunk
                            .chunks_mut(w)
                            .zip(staged_chunk.chunks_mut(w))
                            .zip(water_chunk.chunks_mut(w));
                        for (j, ((terrain_row, staged_row), water_row)) in rows.enumerate() {
                            passes::erode_deposit_row(
                                b * tile_rows + j,
                                w,
                                h,
                                terrain_in,
                                rained,
                                sediment_in,
                                velocity,
                                terrain_row,
                                staged_row,
                                water_row,
                                p,
                            );
                        }
                    });
            }
            StepPass::SedimentAdvection => {
                let staged: &[f32] = ctx.staged_sediment;
                let velocity: &[Vector2<f32>] = ctx.velocity_out;
                ctx.sediment_out
                    .par_chunks_mut(band)
                    .enumerate()
                    .for_each(|(b, chunk)| {
                        for (j, row) in chunk.chunks_mut(w).enumerate() {
                            passes::advect_sediment_row(
                                b * tile_rows + j,
                                w,
                                h,
                                staged,
                                velocity,
                                row,
                                p,
                            );
                        }
                    });
            }
        }
    }

    fn name(&self) -> &'static str {
        "tiled"
    }

    fn is_parallel(&self) -> bool {
        true
    }
}
