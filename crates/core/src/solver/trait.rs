//! Dispatch backend trait definition
//!
//! This module defines the `Backend` trait, the backend-agnostic interface
//! for executing the six erosion passes. The sequential and tiled
//! implementations run identical per-cell arithmetic (the shared kernels in
//! [`super::passes`]); only cross-cell execution order differs, so their
//! results match bitwise.

use crate::params::SimulationParameters;
use nalgebra::{Vector2, Vector4};

/// One dispatch of the per-step pipeline.
///
/// Passes are ordered; each pass reads the previous passes' outputs, so the
/// engine runs them in this order with a barrier in between (a backend's
/// `run_pass` returns only once every cell is written, which is the
/// barrier).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPass {
    /// Add rain to the water column.
    Rainfall,
    /// Recompute the 4-directional outflow flux.
    OutflowFlux,
    /// Apply flux divergence and evaporation to the water column.
    WaterHeight,
    /// Estimate the net-flow velocity field.
    Velocity,
    /// Exchange material between terrain and suspended sediment.
    ErosionDeposition,
    /// Semi-Lagrangian transport of the suspended sediment.
    SedimentAdvection,
}

impl StepPass {
    /// The full pipeline, in execution order.
    pub const ALL: [StepPass; 6] = [
        StepPass::Rainfall,
        StepPass::OutflowFlux,
        StepPass::WaterHeight,
        StepPass::Velocity,
        StepPass::ErosionDeposition,
        StepPass::SedimentAdvection,
    ];
}

/// Borrowed view of one step's inputs and outputs.
///
/// `*_in` slices belong to the read-only "current" buffer, `*_out` to the
/// write-only "next" buffer. `rained` and `staged_sediment` are engine-owned
/// scratch: rained water is the working water depth produced by the rainfall
/// pass, staged sediment is the post-erosion field the advection pass
/// samples. Within a pass every cell writes only its own index, so units of
/// work never race.
pub struct PassContext<'a> {
    pub width: usize,
    pub height: usize,
    pub terrain_in: &'a [f32],
    pub water_in: &'a [f32],
    pub sediment_in: &'a [f32],
    pub flux_in: &'a [Vector4<f32>],
    pub rain_rate: &'a [f32],
    pub terrain_out: &'a mut [f32],
    pub water_out: &'a mut [f32],
    pub sediment_out: &'a mut [f32],
    pub flux_out: &'a mut [Vector4<f32>],
    pub velocity_out: &'a mut [Vector2<f32>],
    pub rained: &'a mut [f32],
    pub staged_sediment: &'a mut [f32],
    pub params: &'a SimulationParameters,
}

/// Backend-agnostic execution of one erosion pass.
///
/// Implementations must execute the shared per-cell kernels for every cell
/// of the grid and return only when all writes are visible; the engine
/// relies on that return as the inter-pass barrier. The double buffer in the
/// context is the sole concurrency-safety mechanism, so implementations may
/// order or parallelize cells freely.
pub trait Backend: Send + Sync {
    /// Execute `pass` over the whole grid. Synchronous; returning is the
    /// barrier.
    fn run_pass(&self, pass: StepPass, ctx: &mut PassContext<'_>);

    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;

    /// Whether cells are dispatched across a worker pool.
    fn is_parallel(&self) -> bool;
}
