use serde::{Serialize, Deserialize};

use crate::error::{check_dim, Error, Result};
use crate::math::vector::{self, Vector};

/// Row-major matrix. Row `i` is the weight vector feeding output unit `i`,
/// so the shape of a layer's table is `(outputs, inputs)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Builds a matrix from rows, rejecting ragged input.
    pub fn from_rows(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = data.first().map(|row| row.len()).unwrap_or(0);
        for row in &data {
            check_dim("matrix row", cols, row.len())?;
        }
        Ok(Matrix {
            rows: data.len(),
            cols,
            data
        })
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i]
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect()
        }
    }

    /// `W · v`
    pub fn mul_vec(&self, v: &[f64]) -> Result<Vector> {
        check_dim("matrix-vector product", self.cols, v.len())?;
        self.data.iter().map(|row| vector::dot(row, v)).collect()
    }

    /// `Wᵀ · v`, without materialising the transpose.
    pub fn transpose_mul_vec(&self, v: &[f64]) -> Result<Vector> {
        check_dim("transposed matrix-vector product", self.rows, v.len())?;
        let mut res = vec![0.0; self.cols];
        for (row, &s) in self.data.iter().zip(v) {
            for (r, w) in res.iter_mut().zip(row) {
                *r += w * s;
            }
        }
        Ok(res)
    }

    /// `W += s · (a ⊗ b)`
    pub fn add_outer(&mut self, a: &[f64], b: &[f64], s: f64) -> Result<()> {
        check_dim("outer product rows", self.rows, a.len())?;
        check_dim("outer product cols", self.cols, b.len())?;
        for (row, &ai) in self.data.iter_mut().zip(a) {
            for (w, &bj) in row.iter_mut().zip(b) {
                *w += s * ai * bj;
            }
        }
        Ok(())
    }

    pub fn add(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, |a, b| a - b)
    }

    pub fn scale(&self, s: f64) -> Matrix {
        self.map(|x| x * s)
    }

    /// Rounds every entry to `decimals` places; handy when comparing snapshots.
    pub fn round(&self, decimals: i32) -> Matrix {
        let factor = 10f64.powi(decimals);
        self.map(|x| (x * factor).round() / factor)
    }

    /// Fails unless the matrix has exactly the given shape, both as declared
    /// and in `data`.
    pub fn check_shape(&self, context: &'static str, rows: usize, cols: usize) -> Result<()> {
        check_dim(context, rows, self.rows)?;
        check_dim(context, rows, self.data.len())?;
        if self.rows > 0 {
            check_dim(context, cols, self.cols)?;
        }
        for row in &self.data {
            check_dim(context, cols, row.len())?;
        }
        Ok(())
    }

    fn zip_with<F>(&self, rhs: &Matrix, f: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            return Err(Error::DimensionMismatch {
                context: "matrix element-wise op",
                expected: self.rows * self.cols,
                got: rhs.rows * rhs.cols,
            });
        }

        let data = self.data.iter().zip(&rhs.data)
            .map(|(ra, rb)| ra.iter().zip(rb).map(|(&a, &b)| f(a, b)).collect())
            .collect();

        Ok(Matrix { rows: self.rows, cols: self.cols, data })
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}
