//! Модуль для работы с матрицами
//!
//! Предоставляет:
//! - Тип матрицы фиксированного размера
//! - Конструкторы и CPU-операции для верификации
//! - Исходный код OpenCL ядер

mod types;
pub mod operations;
pub mod kernels;

pub use types::{Matrix, MatrixInit, Vector};
pub use operations::{
    compare_results, cpu_matrix_multiply, cpu_matrix_vector_multiply, random_vector, zero_vector,
};
pub use kernels::{KernelKind, MmulSignature, BLOCK_SIZE};
