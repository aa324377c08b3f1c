//! Height-field provider interface
//!
//! The erosion engine does not generate terrain itself. It consumes an
//! elevation array from any provider implementing [`HeightSource`] and deep
//! copies it at construction, so the provider's data is never mutated.

/// Source of the initial per-cell elevation grid.
///
/// Any generation algorithm is acceptable; the engine only needs a readable
/// row-major array of `width * height` elevations.
pub trait HeightSource {
    /// Grid dimensions as `(width, height)` in cells.
    fn dimensions(&self) -> (usize, usize);

    /// Row-major elevation array, indexed `y * width + x`.
    ///
    /// Must have exactly `width * height` entries. A mismatch is a
    /// programming error and aborts engine construction.
    fn heights(&self) -> &[f32];
}

/// Plain buffer-backed height source.
///
/// Used by tests and the headless demo; real applications typically wrap
/// their own fractal generator instead.
#[derive(Debug, Clone)]
pub struct GridHeightField {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl GridHeightField {
    /// Wrap an existing elevation array.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != width * height`.
    #[must_use]
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "elevation array length must equal width * height"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Flat grid of the given elevation.
    #[must_use]
    pub fn flat(width: usize, height: usize, elevation: f32) -> Self {
        Self::new(width, height, vec![elevation; width * height])
    }

    /// Build a grid from a per-cell function of `(x, y)`.
    #[must_use]
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    /// Mutable access to the elevation array, for providers built in stages.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

impl HeightSource for GridHeightField {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn heights(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_field_dimensions() {
        let field = GridHeightField::flat(8, 4, 2.5);
        assert_eq!(field.dimensions(), (8, 4));
        assert_eq!(field.heights().len(), 32);
        assert!(field.heights().iter().all(|&h| h == 2.5));
    }

    #[test]
    fn test_from_fn_row_major_layout() {
        let field = GridHeightField::from_fn(3, 2, |x, y| (y * 10 + x) as f32);
        assert_eq!(field.heights(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    #[should_panic(expected = "elevation array length")]
    fn test_length_mismatch_panics() {
        let _ = GridHeightField::new(4, 4, vec![0.0; 15]);
    }
}
