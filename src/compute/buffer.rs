//! Перенос матриц в память устройства

use super::device::{ComputeDevice, KernelArg};
use super::error::ComputeResult;
use crate::matrix::Matrix;
use crate::opencl::types::*;

/// Режим доступа ядра к буферу
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Ядро только читает; данные хоста копируются при создании
    ReadOnly,
    /// Ядро читает и пишет; данные хоста копируются при создании
    ReadWrite,
    /// Ядро только пишет; содержимое не определено до запуска ядра
    WriteOnly,
}

impl AccessMode {
    /// Флаги `clCreateBuffer` для режима
    pub fn flags(self) -> cl_mem_flags {
        match self {
            AccessMode::ReadOnly => CL_MEM_READ_ONLY | CL_MEM_COPY_HOST_PTR,
            AccessMode::ReadWrite => CL_MEM_READ_WRITE | CL_MEM_COPY_HOST_PTR,
            AccessMode::WriteOnly => CL_MEM_WRITE_ONLY,
        }
    }

    pub fn copies_host_data(self) -> bool {
        self != AccessMode::WriteOnly
    }

    pub fn kernel_readable(self) -> bool {
        self != AccessMode::WriteOnly
    }

    pub fn kernel_writable(self) -> bool {
        self != AccessMode::ReadOnly
    }
}

/// Буфер устройства, живущий в пределах одного вызова умножения
pub struct DeviceBuffer<D: ComputeDevice> {
    handle: D::Buffer,
    access: AccessMode,
    size_bytes: usize,
}

impl<D: ComputeDevice> DeviceBuffer<D> {
    pub fn handle(&self) -> &D::Buffer {
        &self.handle
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Буфер как аргумент ядра
    pub fn arg(&self) -> KernelArg<'_, D::Buffer> {
        KernelArg::Buffer(&self.handle)
    }
}

impl<const W: usize, const H: usize> Matrix<W, H> {
    /// Создаёт буфер устройства для матрицы.
    ///
    /// Для `ReadOnly`/`ReadWrite` текущее содержимое матрицы копируется
    /// на устройство; для `WriteOnly` выделяется только память.
    pub fn create_buffer<D: ComputeDevice>(
        &self,
        device: &D,
        access: AccessMode,
    ) -> ComputeResult<DeviceBuffer<D>> {
        let host = access.copies_host_data().then(|| self.as_slice());
        let size_bytes = self.size_bytes();
        let handle = device.create_buffer(access, size_bytes, host)?;
        Ok(DeviceBuffer {
            handle,
            access,
            size_bytes,
        })
    }
}
