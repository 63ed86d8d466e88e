//! Row-major 3x3 matrices for covariance and rotation extraction.

use crate::float::Float;
use crate::vec::Vec3;
use core::ops::{Add, Mul, Sub};

/// A 3x3 matrix stored row-major: `m[row][col]`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Mat3<F: Float> {
    pub m: [[F; 3]; 3],
}

impl<F: Float> Mat3<F> {
    pub fn zero() -> Self {
        Mat3 { m: [[F::zero(); 3]; 3] }
    }

    pub fn identity() -> Self {
        Self::diagonal(F::one())
    }

    /// Matrix with `value` on the diagonal and zero elsewhere.
    pub fn diagonal(value: F) -> Self {
        let mut out = Self::zero();
        for i in 0..3 {
            out.m[i][i] = value;
        }
        out
    }

    pub fn from_rows(r0: Vec3<F>, r1: Vec3<F>, r2: Vec3<F>) -> Self {
        Mat3 {
            m: [
                [r0.x, r0.y, r0.z],
                [r1.x, r1.y, r1.z],
                [r2.x, r2.y, r2.z],
            ],
        }
    }

    /// Rotation of `angle` radians about the unit `axis` (Rodrigues).
    pub fn from_axis_angle(axis: Vec3<F>, angle: F) -> Self {
        let (s, c) = (angle.sin(), angle.cos());
        let t = F::one() - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        Mat3 {
            m: [
                [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
                [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
                [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
            ],
        }
    }

    /// Accumulate `weight * (a ⊗ b)` into this matrix.
    pub fn add_outer(&mut self, a: Vec3<F>, b: Vec3<F>, weight: F) {
        let a = [a.x * weight, a.y * weight, a.z * weight];
        let b = [b.x, b.y, b.z];
        for (row, ai) in self.m.iter_mut().zip(a) {
            for (cell, bj) in row.iter_mut().zip(b) {
                *cell = *cell + ai * bj;
            }
        }
    }

    /// Add `epsilon` to every diagonal entry.
    pub fn regularized(mut self, epsilon: F) -> Self {
        for i in 0..3 {
            self.m[i][i] = self.m[i][i] + epsilon;
        }
        self
    }

    pub fn transpose(self) -> Self {
        let mut out = Self::zero();
        for i in 0..3 {
            for j in 0..3 {
                out.m[i][j] = self.m[j][i];
            }
        }
        out
    }

    pub fn scale(mut self, s: F) -> Self {
        for row in self.m.iter_mut() {
            for cell in row.iter_mut() {
                *cell = *cell * s;
            }
        }
        self
    }

    pub fn determinant(&self) -> F {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Cofactor matrix; equals `det * inverse^T`.
    pub fn cofactor(&self) -> Self {
        let m = &self.m;
        Mat3 {
            m: [
                [
                    m[1][1] * m[2][2] - m[1][2] * m[2][1],
                    m[1][2] * m[2][0] - m[1][0] * m[2][2],
                    m[1][0] * m[2][1] - m[1][1] * m[2][0],
                ],
                [
                    m[0][2] * m[2][1] - m[0][1] * m[2][2],
                    m[0][0] * m[2][2] - m[0][2] * m[2][0],
                    m[0][1] * m[2][0] - m[0][0] * m[2][1],
                ],
                [
                    m[0][1] * m[1][2] - m[0][2] * m[1][1],
                    m[0][2] * m[1][0] - m[0][0] * m[1][2],
                    m[0][0] * m[1][1] - m[0][1] * m[1][0],
                ],
            ],
        }
    }

    /// Inverse, or `None` when `|det| <= epsilon`.
    pub fn inverse(&self, epsilon: F) -> Option<Self> {
        let det = self.determinant();
        if det.abs() <= epsilon {
            return None;
        }
        Some(self.cofactor().transpose().scale(F::one() / det))
    }

    /// Inverse transpose, or `None` when `|det| <= epsilon`.
    pub fn inverse_transpose(&self, epsilon: F) -> Option<Self> {
        let det = self.determinant();
        if det.abs() <= epsilon {
            return None;
        }
        Some(self.cofactor().scale(F::one() / det))
    }

    pub fn mul_vec(&self, v: Vec3<F>) -> Vec3<F> {
        let m = &self.m;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Frobenius norm of `self - other`.
    pub fn distance(&self, other: &Self) -> F {
        let mut sum = F::zero();
        for i in 0..3 {
            for j in 0..3 {
                let d = self.m[i][j] - other.m[i][j];
                sum = sum + d * d;
            }
        }
        sum.sqrt()
    }
}

impl<F: Float> Add for Mat3<F> {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        for i in 0..3 {
            for j in 0..3 {
                self.m[i][j] = self.m[i][j] + rhs.m[i][j];
            }
        }
        self
    }
}

impl<F: Float> Sub for Mat3<F> {
    type Output = Self;
    fn sub(mut self, rhs: Self) -> Self {
        for i in 0..3 {
            for j in 0..3 {
                self.m[i][j] = self.m[i][j] - rhs.m[i][j];
            }
        }
        self
    }
}

impl<F: Float> Mul for Mat3<F> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut out = Self::zero();
        for i in 0..3 {
            for j in 0..3 {
                let mut sum = F::zero();
                for k in 0..3 {
                    sum = sum + self.m[i][k] * rhs.m[k][j];
                }
                out.m[i][j] = sum;
            }
        }
        out
    }
}
