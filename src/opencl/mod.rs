//! Модуль для работы с OpenCL
//!
//! Содержит низкоуровневые привязки и устройство `OpenClDevice`.
//! Привязки линкуются с системной библиотекой только при включённой
//! фиче `opencl`; типы и коды ошибок доступны всегда.

pub mod types;
pub mod utils;

#[cfg(feature = "opencl")]
pub mod bindings;
#[cfg(feature = "opencl")]
pub mod callbacks;
#[cfg(feature = "opencl")]
mod device;

#[cfg(feature = "opencl")]
pub use device::{ClBuffer, ClProgram, ClQueue, OpenClDevice};
