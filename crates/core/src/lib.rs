//! Hydraulic Erosion Simulation Core
//!
//! Simulates rainfall, shallow-water flow, sediment transport, and terrain
//! deformation over a regular height grid using the virtual-pipe model, in
//! discrete time steps suitable for driving a real-time terrain visualizer.
//!
//! The per-step pipeline is six ordered passes (rainfall, outflow flux,
//! water height, velocity, erosion/deposition, sediment advection) over a
//! ping-pong pair of state buffers. Two interchangeable dispatch backends
//! execute the same per-cell kernels: sequential row-major iteration and
//! tiled parallel dispatch across the rayon worker pool. Both yield
//! bitwise-identical results.
//!
//! Rendering, UI, and height-field generation are external collaborators:
//! the engine consumes any [`HeightSource`] and exposes read-only views of
//! the current terrain, water, and sediment arrays.

// Engine and per-cell state
pub mod engine;
pub mod heightfield;
pub mod params;
pub mod state;

// Dispatch strategies and pass kernels
pub mod solver;

// Re-export the primary API surface
pub use engine::ErosionEngine;
pub use heightfield::{GridHeightField, HeightSource};
pub use params::{ParameterError, ParameterKey, ParameterMap, SimulationParameters};
pub use solver::{Backend, SequentialBackend, StepPass, Strategy, TiledBackend};
pub use state::{CellBuffers, RainMask};
