//! Вычислительный движок
//!
//! Данные идут по цепочке: матрица на хосте → буфер устройства
//! (копия для входов, только выделение для результата) → запуск ядра →
//! блокирующее чтение → матрица на хосте.

pub mod buffer;
pub mod context;
pub mod device;
pub mod engine;
pub mod error;
pub mod host;

pub use buffer::{AccessMode, DeviceBuffer};
pub use context::ComputeContext;
pub use device::{ComputeDevice, KernelArg, NdRange};
pub use engine::ComputeEngine;
pub use error::{ComputeError, ComputeResult};
pub use host::HostDevice;

/// Устройство по умолчанию: OpenCL при включённой фиче `opencl`
#[cfg(feature = "opencl")]
pub type DefaultDevice = crate::opencl::OpenClDevice;

/// Устройство по умолчанию: OpenCL при включённой фиче `opencl`
#[cfg(not(feature = "opencl"))]
pub type DefaultDevice = HostDevice;
