//! Dense column-major matrix used as the evaluation buffer
//!
//! Rows are the dimensions of a value, columns are independent samples:
//! a batch of `k` points in `R^3` is a `3 x k` matrix.

use std::fmt;

use crate::traits::Scalar;

#[derive(Clone, Debug, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy> Matrix<T> {
    /// Matrix filled with `value`
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for col in 0..cols {
            for row in 0..rows {
                data.push(f(row, col));
            }
        }
        Matrix { rows, cols, data }
    }

    /// Single-column matrix
    pub fn from_column(values: &[T]) -> Self {
        Matrix {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    /// Matrix whose columns are the given slices, all of length `rows`
    pub fn from_columns<C: AsRef<[T]>>(rows: usize, columns: &[C]) -> Option<Self> {
        let mut data = Vec::with_capacity(rows * columns.len());
        for column in columns {
            let column = column.as_ref();
            if column.len() != rows {
                return None;
            }
            data.extend_from_slice(column);
        }
        Some(Matrix {
            rows,
            cols: columns.len(),
            data,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[col * self.rows + row]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[col * self.rows + row] = value;
    }

    #[inline]
    pub fn column(&self, col: usize) -> &[T] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }

    #[inline]
    pub fn column_mut(&mut self, col: usize) -> &mut [T] {
        &mut self.data[col * self.rows..(col + 1) * self.rows]
    }

    pub fn columns(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact panics on a zero chunk size
        let rows = self.rows.max(1);
        self.data.chunks_exact(rows).take(self.cols)
    }

    pub fn row(&self, row: usize) -> Vec<T> {
        (0..self.cols).map(|col| self.get(row, col)).collect()
    }

    pub fn map<U: Copy>(&self, f: impl FnMut(T) -> U) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().copied().map(f).collect(),
        }
    }

    pub fn transpose(&self) -> Self {
        Matrix::from_fn(self.cols, self.rows, |row, col| self.get(col, row))
    }

    /// Rows `start..start + count` of every column
    pub fn row_block(&self, start: usize, count: usize) -> Self {
        Matrix::from_fn(count, self.cols, |row, col| self.get(start + row, col))
    }

    /// Stack `self` on top of `other`; both must have the same column count
    pub fn stacked(&self, other: &Matrix<T>) -> Self {
        let rows = self.rows + other.rows;
        Matrix::from_fn(rows, self.cols, |row, col| {
            if row < self.rows {
                self.get(row, col)
            } else {
                other.get(row - self.rows, col)
            }
        })
    }
}

impl<T: Scalar> Matrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix::filled(rows, cols, T::zero())
    }

    pub fn identity(size: usize) -> Self {
        Matrix::from_fn(size, size, |row, col| {
            if row == col { T::one() } else { T::zero() }
        })
    }

    /// Matrix product `self * rhs`; panics if the inner dimensions differ
    pub fn matmul(&self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_eq!(self.cols, rhs.rows, "matrix product dimension mismatch");
        let mut result = Matrix::zeros(self.rows, rhs.cols);
        for col in 0..rhs.cols {
            for k in 0..self.cols {
                let factor = rhs.get(k, col);
                for row in 0..self.rows {
                    let index = col * self.rows + row;
                    result.data[index] = result.data[index] + self.get(row, k) * factor;
                }
            }
        }
        result
    }

    pub fn scaled(&self, factor: T) -> Matrix<T> {
        self.map(|x| x * factor)
    }

    pub fn zip_with(&self, other: &Matrix<T>, f: impl Fn(T, T) -> T) -> Matrix<T> {
        debug_assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }
}

impl Matrix<f64> {
    /// Every entry is zero within tolerance
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&x| crate::traits::is_zero(x))
    }

    /// Square identity matrix within tolerance
    pub fn is_identity(&self) -> bool {
        self.rows == self.cols
            && (0..self.rows).all(|row| {
                (0..self.cols).all(|col| {
                    let expected = if row == col { 1.0 } else { 0.0 };
                    crate::traits::approx_eq(self.get(row, col), expected)
                })
            })
    }

    pub fn approx_eq(&self, other: &Matrix<f64>) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(&a, &b)| crate::traits::approx_eq(a, b))
    }
}

impl<T: fmt::Display + Copy> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            let entries: Vec<String> = (0..self.cols)
                .map(|col| self.get(row, col).to_string())
                .collect();
            writeln!(f, "[{}]", entries.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_major_layout() {
        let m = Matrix::from_fn(2, 3, |row, col| (row * 10 + col) as f64);
        assert_eq!(m.data(), &[0.0, 10.0, 1.0, 11.0, 2.0, 12.0]);
        assert_eq!(m.column(1), &[1.0, 11.0]);
        assert_eq!(m.row(1), vec![10.0, 11.0, 12.0]);
        assert_eq!(m.columns().count(), 3);
    }

    #[test]
    fn test_matmul() {
        let a = Matrix::from_fn(2, 2, |row, col| (row * 2 + col + 1) as f64);
        let b = Matrix::from_column(&[1.0, 1.0]);
        let c = a.matmul(&b);
        assert_eq!(c.column(0), &[3.0, 7.0]);
        assert!(Matrix::<f64>::identity(3).is_identity());
    }

    #[test]
    fn test_blocks() {
        let a = Matrix::from_column(&[1.0, 2.0, 3.0]);
        assert_eq!(a.row_block(1, 2).column(0), &[2.0, 3.0]);
        let b = Matrix::from_column(&[4.0]);
        assert_eq!(a.stacked(&b).column(0), &[1.0, 2.0, 3.0, 4.0]);
        assert!(Matrix::from_columns(2, &[vec![1.0, 2.0], vec![3.0]]).is_none());
    }
}
