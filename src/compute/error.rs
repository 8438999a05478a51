//! Ошибки вычислительного движка

use crate::opencl::types::cl_int;
use crate::opencl::utils::error_name;
use thiserror::Error;

/// Ошибки сборки программ, работы с устройством и размерностей.
///
/// `Clone` нужен, чтобы контекст, не прошедший сборку, возвращал
/// одну и ту же ошибку каждому последующему вызову.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("Program build failed for {program}:\n{log}")]
    BuildFailure { program: String, log: String },

    #[error("{operation} failed with OpenCL error {code} ({})", error_name(*.code))]
    DeviceOperation { operation: String, code: cl_int },

    #[error("Dimension mismatch: expected {expected} elements, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Kernel source {path} is unavailable: {message}")]
    KernelSourceUnavailable { path: String, message: String },
}

impl ComputeError {
    pub fn device(operation: impl Into<String>, code: cl_int) -> Self {
        Self::DeviceOperation {
            operation: operation.into(),
            code,
        }
    }

    /// Код ошибки устройства, если он есть
    pub fn code(&self) -> Option<cl_int> {
        match self {
            Self::DeviceOperation { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type ComputeResult<T> = std::result::Result<T, ComputeError>;
