//! Sweep output storage.

use serde::{Deserialize, Serialize};

/// N-dimensional grid with a flat backing array.
///
/// Row-major: the last dimension (the innermost swept axis) varies fastest.
/// Dimension 0 is the x axis, 1 is y and 2 is z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid<T> {
    data: Vec<T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<T: Clone> SweepGrid<T> {
    pub fn new(shape: Vec<usize>, fill: T) -> Self {
        let len = shape.iter().product();
        let strides = strides_for(&shape);
        Self {
            data: vec![fill; len],
            shape,
            strides,
        }
    }

    /// `None` when `data` does not match the shape
    pub fn from_data(shape: Vec<usize>, data: Vec<T>) -> Option<Self> {
        if data.len() != shape.iter().product::<usize>() {
            return None;
        }
        let strides = strides_for(&shape);
        Some(Self {
            data,
            shape,
            strides,
        })
    }

    /// Every `(dim0, dim1)` plane at a fixed trailing index, copied out in
    /// row-major order. For a 3D cube, `slice_2d(k)` is the (x, y) section at
    /// the k-th z sample; for a 2D grid only `k = 0` is valid and returns the
    /// whole grid.
    pub fn slice_2d(&self, k: usize) -> Option<Vec<T>> {
        match self.shape.as_slice() {
            [_, _] if k == 0 => Some(self.data.clone()),
            [_, _, nz] if k < *nz => Some(self.data.iter().skip(k).step_by(*nz).cloned().collect()),
            _ => None,
        }
    }
}

impl<T> SweepGrid<T> {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn dim_x(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn dim_y(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(0)
    }

    /// Zero for 2D grids
    pub fn dim_z(&self) -> usize {
        self.shape.get(2).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        indices
            .iter()
            .zip(&self.shape)
            .zip(&self.strides)
            .try_fold(0, |flat, ((&i, &n), &stride)| (i < n).then_some(flat + i * stride))
    }

    pub fn multi_index(&self, flat: usize) -> Option<Vec<usize>> {
        if flat >= self.data.len() {
            return None;
        }
        let mut rest = flat;
        Some(
            self.strides
                .iter()
                .map(|&stride| {
                    let i = rest / stride;
                    rest %= stride;
                    i
                })
                .collect(),
        )
    }

    pub fn get(&self, indices: &[usize]) -> Option<&T> {
        self.flat_index(indices).map(|i| &self.data[i])
    }

    pub fn set(&mut self, indices: &[usize], value: T) -> bool {
        match self.flat_index(indices) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// All index tuples in storage order
    pub fn indices(&self) -> GridIndices {
        GridIndices {
            shape: self.shape.clone(),
            current: vec![0; self.shape.len()],
            done: self.data.is_empty(),
        }
    }
}

impl SweepGrid<f64> {
    /// Smallest and largest finite values, skipping unwritten (NaN) slots
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Number of slots holding a value
    pub fn written(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

fn strides_for(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Row-major walk over a grid's index tuples
#[derive(Debug, Clone)]
pub struct GridIndices {
    shape: Vec<usize>,
    current: Vec<usize>,
    done: bool,
}

impl Iterator for GridIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let out = self.current.clone();

        self.done = true;
        for (i, n) in self.current.iter_mut().zip(&self.shape).rev() {
            *i += 1;
            if *i < *n {
                self.done = false;
                break;
            }
            *i = 0;
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let grid = SweepGrid::from_data(vec![2, 3, 4], (0..24).map(f64::from).collect()).unwrap();
        assert_eq!(grid.flat_index(&[1, 2, 3]), Some(23));
        assert_eq!(grid.flat_index(&[0, 1, 0]), Some(4));
        assert_eq!(grid.flat_index(&[0, 3, 0]), None);
        assert_eq!(grid.multi_index(17), Some(vec![1, 1, 1]));
        assert_eq!(grid.get(&[1, 0, 2]), Some(&14.0));
        assert_eq!((grid.dim_x(), grid.dim_y(), grid.dim_z()), (2, 3, 4));
    }

    #[test]
    fn test_indices_follow_storage_order() {
        let grid = SweepGrid::new(vec![3, 2], 0u8);
        let all: Vec<_> = grid.indices().collect();
        assert_eq!(all.len(), 6);
        for (flat, idx) in all.iter().enumerate() {
            assert_eq!(grid.flat_index(idx), Some(flat));
        }
    }

    #[test]
    fn test_slice_2d() {
        let cube = SweepGrid::from_data(vec![2, 2, 3], (0..12).map(f64::from).collect()).unwrap();
        assert_eq!(cube.slice_2d(1), Some(vec![1.0, 4.0, 7.0, 10.0]));
        assert_eq!(cube.slice_2d(3), None);

        let square = SweepGrid::new(vec![2, 2], 1.0);
        assert_eq!(square.slice_2d(0), Some(vec![1.0; 4]));
        assert_eq!(square.slice_2d(1), None);
    }

    #[test]
    fn test_min_max_skips_nan() {
        let mut grid = SweepGrid::new(vec![2, 2], f64::NAN);
        assert_eq!(grid.min_max(), None);
        grid.set(&[0, 1], 0.5);
        grid.set(&[1, 1], -1.0);
        assert_eq!(grid.min_max(), Some((-1.0, 0.5)));
        assert_eq!(grid.written(), 2);
    }
}
