//! Sequential dispatch backend
//!
//! Row-major per-cell iteration on the calling thread. This is the reference
//! execution order; the tiled backend must match it bitwise.

use super::passes;
use super::r#trait::{Backend, PassContext, StepPass};

/// Single-threaded row-major backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialBackend;

impl Backend for SequentialBackend {
    fn run_pass(&self, pass: StepPass, ctx: &mut PassContext<'_>) {
        let w = ctx.width;
        let h = ctx.height;
        match pass {
            StepPass::Rainfall => {
                for (y, row) in ctx.rained.chunks_mut(w).enumerate() {
                    passes::rainfall_row(y, w, ctx.water_in, ctx.rain_rate, row, ctx.params);
                }
            }
            StepPass::OutflowFlux => {
                for (y, row) in ctx.flux_out.chunks_mut(w).enumerate() {
                    passes::outflow_flux_row(
                        y,
                        w,
                        h,
                        ctx.terrain_in,
                        ctx.rained,
                        ctx.flux_in,
                        row,
                        ctx.params,
                    );
                }
            }
            StepPass::WaterHeight => {
                for (y, row) in ctx.water_out.chunks_mut(w).enumerate() {
                    passes::water_height_row(y, w, h, ctx.rained, ctx.flux_out, row, ctx.params);
                }
            }
            StepPass::Velocity => {
                for (y, row) in ctx.velocity_out.chunks_mut(w).enumerate() {
                    passes::velocity_row(y, w, h, ctx.flux_out, row);
                }
            }
            StepPass::ErosionDeposition => {
                let rows = ctx
                    .terrain_out
                    .chunks_mut(w)
                    .zip(ctx.staged_sediment.chunks_mut(w))
                    .zip(ctx.water_out.chunks_mut(w));
                for (y, ((terrain_row, staged_row), water_row)) in rows.enumerate() {
                    passes::erode_deposit_row(
                        y,
                        w,
                        h,
                        ctx.terrain_in,
                        ctx.rained,
                        ctx.sediment_in,
                        ctx.velocity_out,
                        terrain_row,
                        staged_row,
                        water_row,
                        ctx.params,
                    );
                }
            }
            StepPass::SedimentAdvection => {
                for (y, row) in ctx.sediment_out.chunks_mut(w).enumerate() {
                    passes::advect_sediment_row(
                        y,
                        w,
                        h,
                        ctx.staged_sediment,
                        ctx.velocity_out,
                        row,
                        ctx.params,
                    );
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "sequential"
    }

    fn is_parallel(&self) -> bool {
        false
    }
}
