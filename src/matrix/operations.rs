//! Операции над матрицами

use super::types::{Matrix, MatrixInit, Vector};
use crate::compute::{ComputeError, ComputeResult};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

impl<const W: usize, const H: usize> Matrix<W, H> {
    /// Создаёт матрицу с заданным начальным заполнением
    pub fn new(init: MatrixInit) -> Self {
        match init {
            MatrixInit::Zeros | MatrixInit::Uninitialized => Self::zeros(),
            MatrixInit::Random => Self::random(),
        }
    }

    pub fn zeros() -> Self {
        Self::filled(0.0)
    }

    pub fn filled(value: f32) -> Self {
        Self::from_storage(vec![value; W * H].into_boxed_slice())
    }

    /// Случайная матрица на [0, 1).
    ///
    /// Каждый вызов создаёт новый генератор из энтропии ОС, поэтому
    /// последовательности между вызовами не воспроизводятся.
    pub fn random() -> Self {
        Self::random_with(&mut StdRng::from_entropy())
    }

    /// Случайная матрица на [0, 1) из переданного генератора
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let dist = Uniform::new(0.0f32, 1.0f32);
        let data: Vec<f32> = (0..W * H).map(|_| dist.sample(rng)).collect();
        Self::from_storage(data.into_boxed_slice())
    }

    /// Матрица из построчных данных длины `W * H`
    pub fn from_vec(data: Vec<f32>) -> ComputeResult<Self> {
        if data.len() != W * H {
            return Err(ComputeError::DimensionMismatch {
                expected: W * H,
                actual: data.len(),
            });
        }
        Ok(Self::from_storage(data.into_boxed_slice()))
    }

    pub fn from_rows(rows: [[f32; W]; H]) -> Self {
        let data: Vec<f32> = rows.iter().flatten().copied().collect();
        Self::from_storage(data.into_boxed_slice())
    }
}

impl<const N: usize> Matrix<N, N> {
    /// Единичная матрица
    pub fn identity() -> Self {
        let mut m = Self::zeros();
        for i in 0..N {
            m[(i, i)] = 1.0;
        }
        m
    }
}

impl<const N: usize> Matrix<N, 1> {
    pub fn from_array(values: [f32; N]) -> Self {
        Self::from_storage(Box::new(values))
    }
}

pub fn zero_vector<const N: usize>() -> Vector<N> {
    Vector::<N>::zeros()
}

pub fn random_vector<const N: usize>() -> Vector<N> {
    Vector::<N>::random()
}

fn shape_mismatch(expected: usize, actual: usize) -> ComputeError {
    ComputeError::DimensionMismatch { expected, actual }
}

/// CPU реализация матричного умножения для верификации
pub fn cpu_matrix_multiply<const K: usize, const M: usize, const P: usize>(
    a: &Matrix<K, M>,
    b: &Matrix<P, K>,
) -> ComputeResult<Matrix<P, M>> {
    let a_view = ArrayView2::from_shape((M, K), a.as_slice())
        .map_err(|_| shape_mismatch(M * K, a.size()))?;
    let b_view = ArrayView2::from_shape((K, P), b.as_slice())
        .map_err(|_| shape_mismatch(K * P, b.size()))?;

    let product = a_view.dot(&b_view);
    Matrix::from_vec(product.iter().copied().collect())
}

/// CPU реализация умножения матрицы на вектор
pub fn cpu_matrix_vector_multiply<const K: usize, const M: usize>(
    m: &Matrix<K, M>,
    v: &Vector<K>,
) -> ComputeResult<Vector<M>> {
    let m_view = ArrayView2::from_shape((M, K), m.as_slice())
        .map_err(|_| shape_mismatch(M * K, m.size()))?;
    let v_view = ArrayView1::from(v.as_slice());

    let product = m_view.dot(&v_view);
    Vector::from_vec(product.to_vec())
}

/// Сравнивает результаты GPU и CPU вычислений поэлементно
pub fn compare_results(gpu_result: &[f32], cpu_result: &[f32], epsilon: f32) -> bool {
    if gpu_result.len() != cpu_result.len() {
        log::warn!(
            "Размеры результатов различаются: {} и {}",
            gpu_result.len(),
            cpu_result.len()
        );
        return false;
    }

    let mut max_diff = 0.0f32;
    let mut diff_count = 0;

    for (gpu, cpu) in gpu_result.iter().zip(cpu_result) {
        let diff = (gpu - cpu).abs();
        if diff.is_nan() || diff > epsilon {
            diff_count += 1;
            max_diff = max_diff.max(diff);
        }
    }

    if diff_count > 0 {
        log::warn!(
            "Обнаружены расхождения: {} элементов, максимальная разница {}",
            diff_count,
            max_diff
        );
        false
    } else {
        true
    }
}
