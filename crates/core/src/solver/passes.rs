//! Per-cell pass kernels shared by every dispatch backend
//!
//! Each step is six ordered passes over the grid: rainfall, outflow flux,
//! water height, velocity, erosion/deposition, sediment advection. Every
//! kernel here computes one output row from read-only input slices, writing
//! only its own row, so cells within a pass are independent and a backend is
//! free to order or parallelize them however it likes. Both backends call
//! these exact functions; cross-cell execution order is the only freedom.
//!
//! Flux components follow the convention in [`crate::state`]:
//! `x`=left, `y`=right, `z`=top, `w`=bottom. A neighbor's complementary
//! component is this cell's inflow (the left neighbor's `y` flows in from
//! the left, and so on). Flux toward a missing neighbor is structurally
//! zero, which closes the grid boundary.

use crate::params::SimulationParameters;
use nalgebra::{Vector2, Vector3, Vector4};

/// Upper clamp on the surface tilt factor used by carry capacity.
pub const MAX_TILT: f32 = 0.05;

/// Pass 1: rainfall.
///
/// `rained[i] = water[i] + dt * rain_rate[i] * increment` while raining,
/// otherwise a straight copy. The result is the working water depth for the
/// rest of the step.
pub fn rainfall_row(
    y: usize,
    width: usize,
    water: &[f32],
    rain_rate: &[f32],
    rained_row: &mut [f32],
    p: &SimulationParameters,
) {
    let base = y * width;
    for x in 0..width {
        let i = base + x;
        rained_row[x] = if p.raining {
            water[i] + p.time_step * rain_rate[i] * p.water_increment_rate
        } else {
            water[i]
        };
    }
}

/// Pass 2: outflow flux.
///
/// Per direction with an in-grid neighbor, the candidate flux is the previous
/// step's flux plus a pressure term proportional to the hydraulic-head
/// difference, floored at zero. Candidates are then scaled so the cell never
/// exports more water than it holds: `scale = min(1, water / (sum * dt))`,
/// with an all-zero result when the candidate sum vanishes (explicit
/// divide-by-zero guard).
pub fn outflow_flux_row(
    y: usize,
    width: usize,
    height: usize,
    terrain: &[f32],
    rained: &[f32],
    flux_prev: &[Vector4<f32>],
    flux_row: &mut [Vector4<f32>],
    p: &SimulationParameters,
) {
    let pressure = p.time_step * p.pipe_cross_sectional_area * p.gravitational_constant;
    let base = y * width;
    for x in 0..width {
        let i = base + x;
        let head = terrain[i] + rained[i];
        let prev = flux_prev[i];

        let candidate = |n: usize, prev_dir: f32| -> f32 {
            let head_diff = head - (terrain[n] + rained[n]);
            (prev_dir + pressure * head_diff).max(0.0)
        };

        let left = if x > 0 { candidate(i - 1, prev.x) } else { 0.0 };
        let right = if x + 1 < width {
            candidate(i + 1, prev.y)
        } else {
            0.0
        };
        let top = if y > 0 { candidate(i - width, prev.z) } else { 0.0 };
        let bottom = if y + 1 < height {
            candidate(i + width, prev.w)
        } else {
            0.0
        };

        let sum = left + right + top + bottom;
        if sum <= 0.0 {
            flux_row[x] = Vector4::zeros();
            continue;
        }
        let scale = (rained[i] / (sum * p.time_step)).min(1.0);
        flux_row[x] = Vector4::new(
            (left * scale).max(0.0),
            (right * scale).max(0.0),
            (top * scale).max(0.0),
            (bottom * scale).max(0.0),
        );
    }
}

/// Pass 3: water height.
///
/// `water[i] = rained[i] + dt * (inflow - outflow)`, then evaporation and a
/// non-negativity clamp. Inflow reads only this step's flux (pass 2 output),
/// outflow is the cell's own four components, so the pre-clamp value is
/// already non-negative thanks to the pass-2 scale.
pub fn water_height_row(
    y: usize,
    width: usize,
    height: usize,
    rained: &[f32],
    flux: &[Vector4<f32>],
    water_row: &mut [f32],
    p: &SimulationParameters,
) {
    let base = y * width;
    for x in 0..width {
        let i = base + x;
        let own = flux[i];
        let outflow = own.x + own.y + own.z + own.w;

        let mut inflow = 0.0;
        if x > 0 {
            inflow += flux[i - 1].y;
        }
        if x + 1 < width {
            inflow += flux[i + 1].x;
        }
        if y > 0 {
            inflow += flux[i - width].w;
        }
        if y + 1 < height {
            inflow += flux[i + width].z;
        }

        let mut water = rained[i] + p.time_step * (inflow - outflow);
        water *= 1.0 - p.evaporation_rate * p.time_step;
        water_row[x] = water.max(0.0);
    }
}

/// Pass 4: velocity field.
///
/// Central-difference net-flow estimate over this step's flux, not an
/// integrated physical velocity.
pub fn velocity_row(
    y: usize,
    width: usize,
    height: usize,
    flux: &[Vector4<f32>],
    velocity_row: &mut [Vector2<f32>],
) {
    let base = y * width;
    for x in 0..width {
        let i = base + x;
        let own = flux[i];

        let left_in = if x > 0 { flux[i - 1].y } else { 0.0 };
        let right_in = if x + 1 < width { flux[i + 1].x } else { 0.0 };
        let top_in = if y > 0 { flux[i - width].w } else { 0.0 };
        let bottom_in = if y + 1 < height { flux[i + width].z } else { 0.0 };

        let vx = 0.5 * (left_in - own.x + own.y - right_in);
        let vy = 0.5 * (top_in - own.z + own.w - bottom_in);
        velocity_row[x] = Vector2::new(vx, vy);
    }
}

/// Pass 5: erosion and deposition.
///
/// Carry capacity combines flow speed, the local surface tilt (derived from
/// a cross-product surface normal over the 4-neighborhood, clamped to
/// [`MAX_TILT`]) and a depth ramp that is 0 when dry and 1 at
/// `maximal_erode_depth`. Undersaturated water erodes terrain into the
/// staged sediment field; oversaturated water deposits. The pass-3 water is
/// adjusted by the same delta, evaporated once more, and both terrain and
/// water are clamped non-negative.
pub fn erode_deposit_row(
    y: usize,
    width: usize,
    height: usize,
    terrain_in: &[f32],
    rained: &[f32],
    sediment_in: &[f32],
    velocity: &[Vector2<f32>],
    terrain_row: &mut [f32],
    staged_row: &mut [f32],
    water_row: &mut [f32],
    p: &SimulationParameters,
) {
    let base = y * width;
    for x in 0..width {
        let i = base + x;
        let center = terrain_in[i];

        // Missing neighbors contribute the center height, flattening the
        // gradient at the boundary instead of inventing a cliff.
        let lh = if x > 0 { terrain_in[i - 1] } else { center };
        let rh = if x + 1 < width { terrain_in[i + 1] } else { center };
        let th = if y > 0 { terrain_in[i - width] } else { center };
        let bh = if y + 1 < height {
            terrain_in[i + width]
        } else {
            center
        };

        let dx = rh - lh;
        let dy = th - bh;
        let normal = Vector3::new(1.0, dx, 0.0).cross(&Vector3::new(0.0, dy, 1.0));
        // The normal's y component is -1, so its length is at least 1 and
        // the division cannot produce NaN.
        let tilt = (normal.y.abs() / normal.norm()).min(MAX_TILT);

        let depth = rained[i];
        let capacity_factor = if depth <= 0.0 {
            0.0
        } else if depth >= p.maximal_erode_depth {
            1.0
        } else {
            1.0 - (p.maximal_erode_depth - depth) / p.maximal_erode_depth
        };

        let capacity = p.sediment_carry_capacity * velocity[i].norm() * tilt * capacity_factor;
        let sediment = sediment_in[i];

        let mut terrain = center;
        let mut water = water_row[x];
        let staged;
        if sediment < capacity {
            let delta = p.time_step * p.soil_suspension_rate * (capacity - sediment);
            terrain -= delta;
            staged = sediment + delta;
            water += delta;
        } else {
            let delta = p.time_step * p.soil_deposition_rate * (sediment - capacity);
            terrain += delta;
            staged = sediment - delta;
            water -= delta;
        }

        water *= 1.0 - p.evaporation_rate * p.time_step;
        terrain_row[x] = terrain.max(0.0);
        staged_row[x] = staged.max(0.0);
        water_row[x] = water.max(0.0);
    }
}

/// Pass 6: semi-Lagrangian sediment advection.
///
/// Gather form: each destination back-traces `(x, y) - velocity * dt`,
/// clamps the source position to the grid, and bilinearly samples the staged
/// (post-erosion) sediment there. Gathering keeps every write on the
/// destination cell, so the pass stays independent per cell.
pub fn advect_sediment_row(
    y: usize,
    width: usize,
    height: usize,
    staged: &[f32],
    velocity: &[Vector2<f32>],
    sediment_row: &mut [f32],
    p: &SimulationParameters,
) {
    let base = y * width;
    for x in 0..width {
        let i = base + x;
        let v = velocity[i];
        let sx = x as f32 - v.x * p.time_step;
        let sy = y as f32 - v.y * p.time_step;
        sediment_row[x] = bilinear_sample(staged, width, height, sx, sy).max(0.0);
    }
}

/// Bilinear sample of a row-major field at a fractional grid position.
///
/// Coordinates are clamped to the grid, so out-of-range back-traces read the
/// nearest edge cell.
#[must_use]
pub fn bilinear_sample(field: &[f32], width: usize, height: usize, x: f32, y: f32) -> f32 {
    let x = x.clamp(0.0, (width - 1) as f32);
    let y = y.clamp(0.0, (height - 1) as f32);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let top = field[y0 * width + x0] * (1.0 - fx) + field[y0 * width + x1] * fx;
    let bottom = field[y1 * width + x0] * (1.0 - fx) + field[y1 * width + x1] * fx;
    top * (1.0 - fy) + bottom * fy
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn run_rows<T>(width: usize, out: &mut [T], mut f: impl FnMut(usize, &mut [T])) {
        for (y, row) in out.chunks_mut(width).enumerate() {
            f(y, row);
        }
    }

    #[test]
    fn test_rainfall_adds_rain_term() {
        let p = SimulationParameters {
            raining: true,
            water_increment_rate: 0.01,
            time_step: 0.02,
            ..SimulationParameters::default()
        };
        let water = vec![0.0; 16];
        let rain_rate = vec![1.0; 16];
        let mut rained = vec![0.0; 16];
        run_rows(4, &mut rained, |y, row| {
            rainfall_row(y, 4, &water, &rain_rate, row, &p);
        });
        for &w in &rained {
            assert_abs_diff_eq!(w, 0.0002, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rainfall_off_copies_water() {
        let p = SimulationParameters {
            raining: false,
            ..SimulationParameters::default()
        };
        let water = vec![0.25; 9];
        let rain_rate = vec![1.0; 9];
        let mut rained = vec![0.0; 9];
        run_rows(3, &mut rained, |y, row| {
            rainfall_row(y, 3, &water, &rain_rate, row, &p);
        });
        assert_eq!(rained, water);
    }

    #[test]
    fn test_flux_zero_on_flat_water() {
        // Uniform head means zero candidates; the sum guard must produce an
        // exact zero vector, not NaN from 0/0.
        let p = SimulationParameters::default();
        let terrain = vec![0.0; 16];
        let rained = vec![0.5; 16];
        let prev = vec![Vector4::zeros(); 16];
        let mut flux = vec![Vector4::repeat(9.9); 16];
        run_rows(4, &mut flux, |y, row| {
            outflow_flux_row(y, 4, 4, &terrain, &rained, &prev, row, &p);
        });
        assert!(flux.iter().all(|f| *f == Vector4::zeros()));
    }

    #[test]
    fn test_flux_mass_bound_on_random_field() {
        let p = SimulationParameters::default();
        let mut rng = StdRng::seed_from_u64(11);
        let cells = 32 * 32;
        let terrain: Vec<f32> = (0..cells).map(|_| rng.random::<f32>() * 5.0).collect();
        let rained: Vec<f32> = (0..cells).map(|_| rng.random::<f32>() * 0.3).collect();
        let prev: Vec<Vector4<f32>> = (0..cells)
            .map(|_| Vector4::repeat(rng.random::<f32>()))
            .collect();
        let mut flux = vec![Vector4::zeros(); cells];
        run_rows(32, &mut flux, |y, row| {
            outflow_flux_row(y, 32, 32, &terrain, &rained, &prev, row, &p);
        });
        for (i, f) in flux.iter().enumerate() {
            let total = (f.x + f.y + f.z + f.w) * p.time_step;
            assert!(
                total <= rained[i] + 1e-5,
                "cell {i} exports {total} with only {} water",
                rained[i]
            );
            assert!(f.x >= 0.0 && f.y >= 0.0 && f.z >= 0.0 && f.w >= 0.0);
        }
    }

    #[test]
    fn test_flux_boundary_components_zero() {
        let p = SimulationParameters::default();
        let mut rng = StdRng::seed_from_u64(3);
        let (w, h) = (8, 6);
        let terrain: Vec<f32> = (0..w * h).map(|_| rng.random::<f32>()).collect();
        let rained = vec![1.0; w * h];
        let prev = vec![Vector4::repeat(0.5); w * h];
        let mut flux = vec![Vector4::zeros(); w * h];
        run_rows(w, &mut flux, |y, row| {
            outflow_flux_row(y, w, h, &terrain, &rained, &prev, row, &p);
        });
        for y in 0..h {
            assert_eq!(flux[y * w].x, 0.0, "left edge leaks at y={y}");
            assert_eq!(flux[y * w + w - 1].y, 0.0, "right edge leaks at y={y}");
        }
        for x in 0..w {
            assert_eq!(flux[x].z, 0.0, "top edge leaks at x={x}");
            assert_eq!(flux[(h - 1) * w + x].w, 0.0, "bottom edge leaks at x={x}");
        }
    }

    #[test]
    fn test_water_height_moves_mass_downhill() {
        // Two-cell column of water on the left cell: its rightward flux must
        // show up as the right cell's inflow.
        let p = SimulationParameters {
            evaporation_rate: 0.0,
            ..SimulationParameters::default()
        };
        let terrain = vec![1.0, 0.0];
        let rained = vec![0.5, 0.0];
        let prev = vec![Vector4::zeros(); 2];
        let mut flux = vec![Vector4::zeros(); 2];
        run_rows(2, &mut flux, |y, row| {
            outflow_flux_row(y, 2, 1, &terrain, &rained, &prev, row, &p);
        });
        assert!(flux[0].y > 0.0);
        assert_eq!(flux[1].x, 0.0);

        let mut water = vec![0.0; 2];
        run_rows(2, &mut water, |y, row| {
            water_height_row(y, 2, 1, &rained, &flux, row, &p);
        });
        let moved = p.time_step * flux[0].y;
        assert_abs_diff_eq!(water[0], 0.5 - moved, epsilon = 1e-6);
        assert_abs_diff_eq!(water[1], moved, epsilon = 1e-6);
        // Transfer is conservative with evaporation off.
        assert_abs_diff_eq!(water[0] + water[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_velocity_follows_net_flow() {
        let mut flux = vec![Vector4::zeros(); 2];
        flux[0].y = 2.0; // left cell pushes right
        let mut velocity = vec![Vector2::zeros(); 2];
        run_rows(2, &mut velocity, |y, row| {
            velocity_row(y, 2, 1, &flux, row);
        });
        assert_eq!(velocity[0], Vector2::new(1.0, 0.0));
        assert_eq!(velocity[1], Vector2::new(1.0, 0.0));
    }

    #[test]
    fn test_erode_when_undersaturated() {
        let p = SimulationParameters {
            evaporation_rate: 0.0,
            ..SimulationParameters::default()
        };
        let (w, h) = (3, 1);
        // Sloped terrain, wet and fast-moving center cell, no sediment yet.
        let terrain = vec![2.0, 1.0, 0.0];
        let rained = vec![0.1; 3];
        let sediment = vec![0.0; 3];
        let velocity = vec![Vector2::new(1.0, 0.0); 3];
        let mut terrain_out = vec![0.0; 3];
        let mut staged = vec![0.0; 3];
        let mut water = vec![0.1; 3];

        for (y, ((t_row, s_row), w_row)) in terrain_out
            .chunks_mut(w)
            .zip(staged.chunks_mut(w))
            .zip(water.chunks_mut(w))
            .enumerate()
        {
            erode_deposit_row(
                y, w, h, &terrain, &rained, &sediment, &velocity, t_row, s_row, w_row, &p,
            );
        }

        // capacity = 0.2 * 1.0 * min(tilt, 0.05) * 1.0 > 0 = sediment
        assert!(terrain_out[1] < terrain[1], "terrain should erode");
        assert!(staged[1] > 0.0, "eroded soil becomes suspended sediment");
        assert!(water[1] > 0.1, "eroded volume joins the water column");
        let lost = terrain[1] - terrain_out[1];
        assert_abs_diff_eq!(lost, staged[1], epsilon = 1e-6);
    }

    #[test]
    fn test_deposit_when_oversaturated() {
        let p = SimulationParameters {
            evaporation_rate: 0.0,
            ..SimulationParameters::default()
        };
        // Still water carrying sediment: capacity is zero, everything heads
        // back to the terrain at the deposition rate.
        let terrain = vec![1.0];
        let rained = vec![0.0];
        let sediment = vec![0.4];
        let velocity = vec![Vector2::zeros()];
        let mut terrain_out = vec![0.0];
        let mut staged = vec![0.0];
        let mut water = vec![0.2];

        erode_deposit_row(
            0,
            1,
            1,
            &terrain,
            &rained,
            &sediment,
            &velocity,
            &mut terrain_out,
            &mut staged,
            &mut water,
            &p,
        );

        let delta = p.time_step * p.soil_deposition_rate * 0.4;
        assert_abs_diff_eq!(terrain_out[0], 1.0 + delta, epsilon = 1e-6);
        assert_abs_diff_eq!(staged[0], 0.4 - delta, epsilon = 1e-6);
        assert_abs_diff_eq!(water[0], 0.2 - delta, epsilon = 1e-6);
    }

    #[test]
    fn test_flat_terrain_tilt_clamps() {
        // Flat terrain gives a vertical normal, so the raw tilt factor is 1
        // and must clamp to MAX_TILT rather than disable erosion.
        let p = SimulationParameters {
            evaporation_rate: 0.0,
            ..SimulationParameters::default()
        };
        let terrain = vec![1.0; 9];
        let rained = vec![0.1; 9];
        let sediment = vec![0.0; 9];
        let velocity = vec![Vector2::new(2.0, 0.0); 9];
        let mut terrain_out = vec![0.0; 9];
        let mut staged = vec![0.0; 9];
        let mut water = vec![0.1; 9];

        for (y, ((t_row, s_row), w_row)) in terrain_out
            .chunks_mut(3)
            .zip(staged.chunks_mut(3))
            .zip(water.chunks_mut(3))
            .enumerate()
        {
            erode_deposit_row(
                y, 3, 3, &terrain, &rained, &sediment, &velocity, t_row, s_row, w_row, &p,
            );
        }

        let expected_capacity = p.sediment_carry_capacity * 2.0 * MAX_TILT;
        let expected_delta = p.time_step * p.soil_suspension_rate * expected_capacity;
        assert_abs_diff_eq!(staged[4], expected_delta, epsilon = 1e-6);
    }

    #[test]
    fn test_bilinear_sample_interpolates_and_clamps() {
        let field = vec![0.0, 1.0, 2.0, 3.0]; // 2x2
        assert_abs_diff_eq!(bilinear_sample(&field, 2, 2, 0.5, 0.0), 0.5);
        assert_abs_diff_eq!(bilinear_sample(&field, 2, 2, 0.0, 0.5), 1.0);
        assert_abs_diff_eq!(bilinear_sample(&field, 2, 2, 0.5, 0.5), 1.5);
        // Out-of-range positions clamp to the nearest edge.
        assert_abs_diff_eq!(bilinear_sample(&field, 2, 2, -3.0, -3.0), 0.0);
        assert_abs_diff_eq!(bilinear_sample(&field, 2, 2, 9.0, 9.0), 3.0);
    }

    #[test]
    fn test_advection_pulls_from_upstream() {
        let p = SimulationParameters {
            time_step: 1.0,
            ..SimulationParameters::default()
        };
        // Velocity +x of one cell per unit time: each cell samples its left
        // neighbor's staged sediment.
        let staged = vec![1.0, 2.0, 3.0, 4.0];
        let velocity = vec![Vector2::new(1.0, 0.0); 4];
        let mut sediment = vec![0.0; 4];
        run_rows(4, &mut sediment, |y, row| {
            advect_sediment_row(y, 4, 1, &staged, &velocity, row, &p);
        });
        assert_eq!(sediment, vec![1.0, 1.0, 2.0, 3.0]);
    }
}
