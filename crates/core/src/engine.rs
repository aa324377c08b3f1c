//! Erosion engine: state ownership and the per-step pipeline
//!
//! The engine owns two ping-pong [`CellBuffers`]: within a step the active
//! buffer is the read-only "current" snapshot and the other is the
//! write-only "next"; the active index flips after the six passes, exposing
//! the fresh state through the read accessors. Double buffering is the sole
//! concurrency-safety mechanism — per-cell units of work never race because
//! "next" writes land only on the writer's own cell.
//!
//! Parameters are read during a step and may be mutated externally between
//! steps; `step(&mut self)` makes the "not while in flight" contract hold
//! within a process.

use crate::heightfield::HeightSource;
use crate::params::SimulationParameters;
use crate::solver::{create_backend, Backend, PassContext, StepPass, Strategy};
use crate::state::{CellBuffers, RainMask};
use nalgebra::{Vector2, Vector4};
use tracing::{info, trace};

/// Hydraulic erosion simulation over a regular height grid.
pub struct ErosionEngine {
    width: usize,
    height: usize,
    original_terrain: Vec<f32>,
    rain_mask: RainMask,
    rain_rate: Vec<f32>,
    params: SimulationParameters,
    buffers: [CellBuffers; 2],
    active: usize,
    rained: Vec<f32>,
    staged_sediment: Vec<f32>,
    backend: Box<dyn Backend>,
    running: bool,
    iterations: u64,
}

impl ErosionEngine {
    /// Build an engine with uniform rain and the default dispatch strategy.
    ///
    /// The provider's elevation array is deep-copied; the provider is never
    /// mutated.
    ///
    /// # Panics
    ///
    /// Panics if the provider's array length does not match its dimensions,
    /// or if either dimension is zero. Both are programming errors, not
    /// recoverable runtime conditions.
    #[must_use]
    pub fn new(provider: &dyn HeightSource, params: SimulationParameters) -> Self {
        Self::with_config(provider, params, RainMask::default(), Strategy::default())
    }

    /// Build an engine with an explicit rain mask and dispatch strategy.
    ///
    /// # Panics
    ///
    /// Same preconditions as [`ErosionEngine::new`].
    #[must_use]
    pub fn with_config(
        provider: &dyn HeightSource,
        params: SimulationParameters,
        rain_mask: RainMask,
        strategy: Strategy,
    ) -> Self {
        let (width, height) = provider.dimensions();
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        let heights = provider.heights();
        assert_eq!(
            heights.len(),
            width * height,
            "height field length must equal width * height"
        );

        let original_terrain = heights.to_vec();
        let buffers = [
            CellBuffers::from_terrain(&original_terrain),
            CellBuffers::from_terrain(&original_terrain),
        ];
        let rain_rate = rain_mask.build(width, height);
        let backend = create_backend(strategy);
        info!(
            width,
            height,
            backend = backend.name(),
            "erosion engine ready"
        );

        Self {
            width,
            height,
            original_terrain,
            rain_mask,
            rain_rate,
            params,
            buffers,
            active: 0,
            rained: vec![0.0; width * height],
            staged_sediment: vec![0.0; width * height],
            backend,
            running: false,
            iterations: 0,
        }
    }

    /// Reinitialize both buffers from the original height field and reapply
    /// the rain mask. Reproduces the exact post-construction state no matter
    /// how often or when it is called.
    pub fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.reset(&self.original_terrain);
        }
        self.rain_rate = self.rain_mask.build(self.width, self.height);
        self.rained.fill(0.0);
        self.staged_sediment.fill(0.0);
        self.active = 0;
        self.running = false;
        self.iterations = 0;
        info!("erosion state reset");
    }

    /// Advance the simulation by exactly one timestep.
    ///
    /// Runs the six ordered passes through the dispatch backend (each pass
    /// returns only when fully complete, which is the inter-pass barrier),
    /// then flips the active buffer. Always externally invocable, also while
    /// paused, for manual single-stepping.
    pub fn step(&mut self) {
        let (head, tail) = self.buffers.split_at_mut(1);
        let (current, next) = if self.active == 0 {
            (&head[0], &mut tail[0])
        } else {
            (&tail[0], &mut head[0])
        };

        let mut ctx = PassContext {
            width: self.width,
            height: self.height,
            terrain_in: &current.terrain,
            water_in: &current.water,
            sediment_in: &current.sediment,
            flux_in: &current.flux,
            rain_rate: &self.rain_rate,
            terrain_out: &mut next.terrain,
            water_out: &mut next.water,
            sediment_out: &mut next.sediment,
            flux_out: &mut next.flux,
            velocity_out: &mut next.velocity,
            rained: &mut self.rained,
            staged_sediment: &mut self.staged_sediment,
            params: &self.params,
        };

        for pass in StepPass::ALL {
            self.backend.run_pass(pass, &mut ctx);
        }

        self.active = 1 - self.active;
        self.iterations += 1;
        trace!(iterations = self.iterations, "simulation step");
    }

    /// Flip between running and paused.
    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    /// Whether continuous stepping is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance one step if running, otherwise do nothing.
    pub fn update(&mut self) {
        if self.running {
            self.step();
        }
    }

    fn current(&self) -> &CellBuffers {
        &self.buffers[self.active]
    }

    /// Current terrain heights, row-major.
    #[must_use]
    pub fn terrain(&self) -> &[f32] {
        &self.current().terrain
    }

    /// Current water depths, row-major.
    #[must_use]
    pub fn water(&self) -> &[f32] {
        &self.current().water
    }

    /// Current suspended sediment, row-major.
    #[must_use]
    pub fn sediment(&self) -> &[f32] {
        &self.current().sediment
    }

    /// Current outflow flux, row-major.
    #[must_use]
    pub fn flux(&self) -> &[Vector4<f32>] {
        &self.current().flux
    }

    /// Current velocity field, row-major.
    #[must_use]
    pub fn velocity(&self) -> &[Vector2<f32>] {
        &self.current().velocity
    }

    /// Fixed per-cell rain rates.
    #[must_use]
    pub fn rain_rate(&self) -> &[f32] {
        &self.rain_rate
    }

    /// Grid width in cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Steps taken since construction or the last reset.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Shared simulation parameters.
    #[must_use]
    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Mutate parameters between steps.
    pub fn params_mut(&mut self) -> &mut SimulationParameters {
        &mut self.params
    }

    /// Name of the active dispatch backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
