//! Cyclic shift matrix model.
//!
//! A matrix is an `R x C` grid of shift codes. Flattened row-major it
//! becomes the *snake*: a cyclic sequence of length `R * C` that employees
//! traverse day by day. Row r, offset o, day d reads the snake at
//! `(r * C + o + d) mod (R * C)`, so schedules repeat with the cycle and
//! stay recognisable month over month.

use serde::{Deserialize, Serialize};

/// A cyclic base pattern for a group of employees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftMatrix {
    /// Unique matrix identifier.
    pub id: String,
    /// Row-major grid of shift codes.
    pub grid: Vec<Vec<String>>,
}

impl ShiftMatrix {
    /// Creates a matrix from a grid.
    pub fn new<I, R, S>(id: impl Into<String>, grid: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            grid: grid
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.grid.len()
    }

    /// Cycle length (columns). 0 for an empty grid.
    #[inline]
    pub fn cols(&self) -> usize {
        self.grid.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Snake length (`rows * cols`).
    #[inline]
    pub fn snake_len(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Reads the snake at a cyclic index.
    ///
    /// # Panics
    /// Panics if the grid is empty; configurations are validated before use.
    pub fn snake_at(&self, index: usize) -> &str {
        let len = self.snake_len();
        let idx = index % len;
        let cols = self.cols();
        &self.grid[idx / cols][idx % cols]
    }

    /// The grid cell backing a cyclic snake index, as `(row, col)`.
    pub fn snake_cell(&self, index: usize) -> (usize, usize) {
        let idx = index % self.snake_len();
        (idx / self.cols(), idx % self.cols())
    }

    /// Rotates a row left by `k` positions.
    pub fn rotate_row(&mut self, row: usize, k: usize) {
        let cols = self.cols();
        if cols > 0 {
            self.grid[row].rotate_left(k % cols);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ShiftMatrix {
        ShiftMatrix::new("mx", [["M", "P", "N"], ["SN", "RP", "M"]])
    }

    #[test]
    fn test_dimensions() {
        let m = sample();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.snake_len(), 6);
    }

    #[test]
    fn test_snake_is_row_major_and_cyclic() {
        let m = sample();
        let unravelled: Vec<&str> = (0..8).map(|i| m.snake_at(i)).collect();
        assert_eq!(unravelled, vec!["M", "P", "N", "SN", "RP", "M", "M", "P"]);
    }

    #[test]
    fn test_snake_cell() {
        let m = sample();
        assert_eq!(m.snake_cell(4), (1, 1));
        assert_eq!(m.snake_cell(6), (0, 0)); // wraps
    }

    #[test]
    fn test_rotate_row() {
        let mut m = sample();
        m.rotate_row(0, 1);
        assert_eq!(m.grid[0], vec!["P", "N", "M"]);
        m.rotate_row(0, 3); // full cycle is a no-op
        assert_eq!(m.grid[0], vec!["P", "N", "M"]);
    }

    #[test]
    fn test_empty_grid_dimensions() {
        let m = ShiftMatrix::new("empty", Vec::<Vec<String>>::new());
        assert_eq!(m.rows(), 0);
        assert_eq!(m.cols(), 0);
        assert_eq!(m.snake_len(), 0);
    }
}
