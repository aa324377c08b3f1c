//! Dispatch strategies for the erosion pipeline
//!
//! Within a pass, each cell's "next" write depends only on "current" reads
//! (never on another cell's concurrent write), so per-pass cell updates are
//! embarrassingly parallel. Two interchangeable strategies exploit that:
//! sequential row-major iteration, and tiled dispatch across the rayon
//! worker pool with a barrier between the ordered passes. Both execute the
//! shared kernels in [`passes`], so they agree bitwise.
//!
//! # Example
//!
//! ```rust,ignore
//! use erosion_sim_core::solver::{create_backend, Strategy};
//!
//! let backend = create_backend(Strategy::Tiled { tile_rows: 8 });
//! ```

pub mod passes;
mod sequential;
mod tiled;
#[allow(clippy::module_name_repetitions)]
mod r#trait;

// Re-exports
pub use r#trait::{Backend, PassContext, StepPass};
pub use sequential::SequentialBackend;
pub use tiled::{TiledBackend, DEFAULT_TILE_ROWS};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Which dispatch backend the engine should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Row-major iteration on the calling thread.
    Sequential,
    /// Row bands of `tile_rows` rows dispatched across the rayon pool.
    Tiled { tile_rows: usize },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Tiled {
            tile_rows: DEFAULT_TILE_ROWS,
        }
    }
}

/// Instantiate the backend for a strategy.
///
/// Both backends compute identical per-cell results; the choice only affects
/// how cells are scheduled.
pub fn create_backend(strategy: Strategy) -> Box<dyn Backend> {
    match strategy {
        Strategy::Sequential => {
            info!("using sequential backend");
            Box::new(SequentialBackend)
        }
        Strategy::Tiled { tile_rows } => {
            let backend = TiledBackend::new(tile_rows);
            info!(tile_rows = backend.tile_rows(), "using tiled backend");
            Box::new(backend)
        }
    }
}
