use clap::Parser;
use erosion_sim_core::{ErosionEngine, GridHeightField, RainMask, SimulationParameters, Strategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Headless erosion demo: generates a fractal height field, runs the engine
/// for a fixed number of steps, and reports volume statistics.
#[derive(Parser, Debug)]
#[command(name = "erosion-demo")]
#[command(about = "Hydraulic erosion simulation demo", long_about = None)]
struct Args {
    /// Grid size exponent; the grid is (2^n + 1) cells on a side
    #[arg(short, long, default_value_t = 7)]
    size_exp: u32,

    /// Number of simulation steps
    #[arg(short = 'n', long, default_value_t = 500)]
    steps: u64,

    /// Dispatch backend (sequential, tiled)
    #[arg(short, long, default_value = "tiled")]
    backend: String,

    /// Rows per tile for the tiled backend
    #[arg(long, default_value_t = 8)]
    tile_rows: usize,

    /// Height-field and rain-mask seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Initial displacement amplitude of the fractal terrain
    #[arg(long, default_value_t = 1.0)]
    roughness: f32,

    /// Fraction of cells receiving rain (1.0 = everywhere)
    #[arg(long, default_value_t = 1.0)]
    rain_coverage: f32,

    /// Report statistics every this many steps
    #[arg(short, long, default_value_t = 50)]
    report_interval: u64,
}

/// Midpoint-displacement (diamond-square) height field.
///
/// Grid is `(2^exp + 1)` cells square; output is shifted to be non-negative.
/// Deterministic for a given seed.
fn midpoint_displacement(exp: u32, seed: u64, roughness: f32) -> GridHeightField {
    let size = (1usize << exp) + 1;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut heights = vec![0.0_f32; size * size];

    for (x, y) in [(0, 0), (size - 1, 0), (0, size - 1), (size - 1, size - 1)] {
        heights[y * size + x] = rng.random::<f32>() * roughness;
    }

    let mut step = size - 1;
    let mut spread = roughness;
    while step > 1 {
        let half = step / 2;

        // Diamond: center of each square from its four corners.
        for y in (half..size).step_by(step) {
            for x in (half..size).step_by(step) {
                let avg = (heights[(y - half) * size + (x - half)]
                    + heights[(y - half) * size + (x + half)]
                    + heights[(y + half) * size + (x - half)]
                    + heights[(y + half) * size + (x + half)])
                    / 4.0;
                heights[y * size + x] = avg + (rng.random::<f32>() - 0.5) * spread;
            }
        }

        // Square: edge midpoints from their in-grid diamond neighbors.
        for y in (0..size).step_by(half) {
            let x_start = if (y / half) % 2 == 0 { half } else { 0 };
            for x in (x_start..size).step_by(step) {
                let mut sum = 0.0;
                let mut count = 0.0;
                if x >= half {
                    sum += heights[y * size + (x - half)];
                    count += 1.0;
                }
                if x + half < size {
                    sum += heights[y * size + (x + half)];
                    count += 1.0;
                }
                if y >= half {
                    sum += heights[(y - half) * size + x];
                    count += 1.0;
                }
                if y + half < size {
                    sum += heights[(y + half) * size + x];
                    count += 1.0;
                }
                heights[y * size + x] = sum / count + (rng.random::<f32>() - 0.5) * spread;
            }
        }

        spread *= 0.5;
        step = half;
    }

    // Terrain heights are non-negative by contract.
    let min = heights.iter().copied().fold(f32::INFINITY, f32::min);
    for h in &mut heights {
        *h -= min;
    }
    GridHeightField::new(size, size, heights)
}

fn total(values: &[f32]) -> f64 {
    values.iter().map(|&v| f64::from(v)).sum()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let strategy = match args.backend.to_lowercase().as_str() {
        "sequential" | "seq" => Strategy::Sequential,
        "tiled" => Strategy::Tiled {
            tile_rows: args.tile_rows,
        },
        other => {
            eprintln!("Unknown backend '{other}', using tiled");
            Strategy::Tiled {
                tile_rows: args.tile_rows,
            }
        }
    };

    let field = midpoint_displacement(args.size_exp, args.seed, args.roughness);
    let mask = if args.rain_coverage >= 1.0 {
        RainMask::Uniform(1.0)
    } else {
        RainMask::Speckled {
            seed: args.seed,
            coverage: args.rain_coverage,
            rate: 1.0,
        }
    };

    let mut engine =
        ErosionEngine::with_config(&field, SimulationParameters::default(), mask, strategy);
    info!(
        backend = engine.backend_name(),
        width = engine.width(),
        height = engine.height(),
        steps = args.steps,
        "starting erosion run"
    );

    let report_interval = args.report_interval.max(1);
    engine.toggle();
    for step in 1..=args.steps {
        engine.update();
        if step % report_interval == 0 || step == args.steps {
            let terrain = engine.terrain();
            let min = terrain.iter().copied().fold(f32::INFINITY, f32::min);
            let max = terrain.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            info!(
                step,
                water = total(engine.water()),
                sediment = total(engine.sediment()),
                terrain_min = min,
                terrain_max = max,
                "report"
            );
        }
    }

    info!(iterations = engine.iterations(), "done");
}
