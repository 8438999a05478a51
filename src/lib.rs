//! OpenCL-offloaded dense matrix multiplication
//!
//! Матрицы фиксированного размера на хосте, перенос в память устройства,
//! тайловое умножение матрица×матрица и умножение матрица×вектор.
//!
//! ```
//! use opencl_matrix::{ComputeConfig, ComputeEngine, HostDevice, Matrix};
//!
//! let engine = ComputeEngine::<HostDevice>::new(ComputeConfig::default());
//! let a = Matrix::from_rows([[1.0, 2.0], [3.0, 4.0]]);
//! let b = Matrix::from_rows([[5.0, 6.0], [7.0, 8.0]]);
//! let c = engine.multiply(&a, &b)?;
//! assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
//! # Ok::<(), opencl_matrix::ComputeError>(())
//! ```

pub mod compute;
pub mod config;
pub mod matrix;
pub mod opencl;
pub mod utils;

#[macro_use]
mod macros {
    /// Проверяет код возврата вызова OpenCL
    #[macro_export]
    macro_rules! cl_check {
        ($operation:expr, $expr:expr) => {{
            let code = unsafe { $expr };
            if code != $crate::opencl::types::CL_SUCCESS {
                Err($crate::compute::ComputeError::device($operation, code))
            } else {
                Ok(())
            }
        }};
    }

    /// Создаёт объект OpenCL. Последний аргумент (`errcode_ret`)
    /// подставляет сам макрос.
    #[macro_export]
    macro_rules! cl_create {
        ($func:ident($($arg:expr),* $(,)?)) => {{
            let mut errcode: $crate::opencl::types::cl_int = $crate::opencl::types::CL_SUCCESS;
            let obj = unsafe { $func($($arg,)* &mut errcode) };
            if obj.is_null() || errcode != $crate::opencl::types::CL_SUCCESS {
                let code = if errcode == $crate::opencl::types::CL_SUCCESS {
                    $crate::opencl::types::CL_OUT_OF_RESOURCES
                } else {
                    errcode
                };
                Err($crate::compute::ComputeError::device(stringify!($func), code))
            } else {
                Ok(obj)
            }
        }};
    }
}

pub use compute::{
    AccessMode, ComputeContext, ComputeDevice, ComputeEngine, ComputeError, ComputeResult,
    DefaultDevice, HostDevice,
};
pub use config::{ComputeConfig, DeviceKind};
pub use matrix::{Matrix, MatrixInit, Vector};
